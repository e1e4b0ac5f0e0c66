//! Filesystem predicates that never fail.
//!
//! Every check follows symbolic links: a mounted storage folder is usually
//! a symlink and must count as a directory. Any I/O error (permission denied,
//! vanished entry, broken mount) reads as "absent".

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A directory entry as seen by [`list_dir`].
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub is_file: bool,
}

pub fn exists(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

pub fn is_dir(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

pub fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Lists a directory, sorted by name.
///
/// Unreadable directories yield an empty list; entries whose metadata cannot
/// be read are dropped. Names that are not valid UTF-8 are converted lossily.
pub fn list_dir(dir: &Path) -> Vec<DirEntry> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) => {
            debug!("skipping unreadable directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for entry in read {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                debug!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Returns the first of `names` that is a directory under `root`.
pub fn find_subdir(root: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| root.join(name))
        .find(|candidate| is_dir(candidate))
}

/// Resolves symlinks where possible, falling back to the path as given.
pub fn canonicalize_best_effort(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Makes a path absolute against the current directory and drops `.` and
/// `..` components lexically. Symlinks are left alone.
pub fn absolutize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True when the path has a `..` component anywhere.
pub fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Case-insensitive extension check against a list of bare extensions.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
