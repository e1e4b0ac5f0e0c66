//! Errors surfaced to callers of the [`crate::library`] facade.
//!
//! Only the failures a caller can act on live here. Unreadable directories,
//! vanished entries and malformed record lines are recovered where they
//! happen and never reach this type.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LibraryError>;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("missing required parameter: {name}")]
    MissingParameter { name: &'static str },

    #[error("character not found: {character}")]
    CharacterNotFound { character: String },

    #[error("chat file not found: {file} (character: {character})")]
    ChatNotFound { character: String, file: String },

    #[error("image not found: {}", path.display())]
    ImageNotFound { path: PathBuf },

    #[error("image path is outside every archive root: {}", path.display())]
    ImageOutsideRoots { path: PathBuf },
}

impl LibraryError {
    /// Machine-readable code used by the HTTP boundary.
    pub fn code(&self) -> &'static str {
        match self {
            LibraryError::MissingParameter { .. } => "missing_parameter",
            LibraryError::CharacterNotFound { .. }
            | LibraryError::ChatNotFound { .. }
            | LibraryError::ImageNotFound { .. } => "not_found",
            LibraryError::ImageOutsideRoots { .. } => "forbidden",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == "not_found"
    }
}

/// Rejects an absent or blank identifying argument.
pub fn require<'a>(name: &'static str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LibraryError::MissingParameter { name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        let err = require("char", Some("  ")).unwrap_err();
        assert_eq!(err.code(), "missing_parameter");
        assert!(err.to_string().contains("char"));
        assert!(require("file", None).is_err());
        assert_eq!(require("file", Some("a.jsonl")).unwrap(), "a.jsonl");
    }

    #[test]
    fn test_not_found_messages_name_the_identity() {
        let err = LibraryError::ChatNotFound {
            character: "Alice".to_string(),
            file: "x.jsonl".to_string(),
        };
        assert!(err.is_not_found());
        let msg = err.to_string();
        assert!(msg.contains("Alice"));
        assert!(msg.contains("x.jsonl"));
    }
}
