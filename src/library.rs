//! Query facade over the archive.
//!
//! Roots are resolved once when a [`Library`] is built. Every query re-scans
//! those roots from disk, so results always reflect the current files and no
//! state outlives a call.
//!
//! Views take a `locate` function that turns a file path into the opaque
//! locator shown to clients (the CLI prints plain paths, the HTTP server
//! renders `/api/image?path=...` URLs).

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ArchiveConfig;
use crate::error::{require, LibraryError, Result};
use crate::models::{Catalog, Character, ImageRecord, Message, Root};
use crate::parser;
use crate::probe;
use crate::roots::{self, SearchLocations};
use crate::sanitize::sanitize;
use crate::scanner::{self, ScanOptions};

#[derive(Debug, Clone)]
pub struct Library {
    roots: Vec<Root>,
    options: ScanOptions,
}

/// Catalog summary: characters keyed by name in discovery order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub characters: CharacterMap,
    pub image_count: usize,
    pub roots: Vec<String>,
}

/// Ordered name → summary map; serializes as a JSON object in insertion order.
#[derive(Debug, Clone, Default)]
pub struct CharacterMap(pub Vec<CharacterSummary>);

impl Serialize for CharacterMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for summary in &self.0 {
            map.serialize_entry(&summary.name, summary)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSummary {
    #[serde(skip)]
    pub name: String,
    pub chat_count: usize,
    pub image_count: usize,
    pub avatar: Option<String>,
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub name: String,
    pub file: String,
    pub size: u64,
    pub modified: String,
}

/// A sanitized transcript.
#[derive(Debug, Clone, Serialize)]
pub struct ChatView {
    #[serde(rename = "char")]
    pub character: String,
    pub file: String,
    pub name: String,
    pub messages: Vec<Message>,
    pub avatar: Option<String>,
}

/// One gallery entry.
#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub name: String,
    pub dir: String,
    pub url: String,
}

impl Library {
    /// Resolves roots from configuration (explicit roots or discovery).
    pub fn from_config(config: &ArchiveConfig) -> Self {
        let locations = SearchLocations::for_home(&config.home_dir());
        let roots = roots::resolve_roots(&config.roots, &locations);
        Self::with_roots(roots, ScanOptions::from(config))
    }

    /// Relative roots are made absolute here so every catalog path, and
    /// every locator built from one, is absolute.
    pub fn with_roots(roots: Vec<Root>, options: ScanOptions) -> Self {
        let roots = roots
            .into_iter()
            .map(|root| Root {
                path: probe::absolutize(&root.path),
                priority: root.priority,
            })
            .collect();
        Self { roots, options }
    }

    /// Library over plain paths; position is priority.
    pub fn from_paths(paths: &[PathBuf], options: ScanOptions) -> Self {
        let roots = paths
            .iter()
            .enumerate()
            .map(|(priority, path)| Root {
                path: path.clone(),
                priority,
            })
            .collect();
        Self::with_roots(roots, options)
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    pub fn root_strings(&self) -> Vec<String> {
        self.roots
            .iter()
            .map(|r| r.path.to_string_lossy().into_owned())
            .collect()
    }

    /// Full catalog, rebuilt from disk.
    pub fn scan(&self) -> Catalog {
        scanner::scan(&self.roots, &self.options)
    }

    pub fn summary(&self, locate: impl Fn(&Path) -> String) -> ScanSummary {
        let catalog = self.scan();
        let characters = catalog
            .characters()
            .iter()
            .map(|c| summarize(c, &locate))
            .collect();
        ScanSummary {
            characters: CharacterMap(characters),
            image_count: catalog.all_images.len(),
            roots: self.root_strings(),
        }
    }

    /// Loads one transcript with sanitized bodies.
    pub fn get_chat(
        &self,
        character: Option<&str>,
        file: Option<&str>,
        locate: impl Fn(&Path) -> String,
    ) -> Result<ChatView> {
        let character = require("char", character)?;
        let file = require("file", file)?;

        let catalog = self.scan();
        let entry = find_character(&catalog, character)?;
        let chat = entry
            .find_chat(file)
            .ok_or_else(|| LibraryError::ChatNotFound {
                character: character.to_string(),
                file: file.to_string(),
            })?;

        let messages = parser::parse_file(&chat.path, character)
            .into_iter()
            .map(|mut m| {
                m.body = sanitize(&m.body);
                m
            })
            .collect();

        Ok(ChatView {
            character: character.to_string(),
            file: chat.file_name.clone(),
            name: chat.display_name.clone(),
            messages,
            avatar: entry.avatar.as_ref().map(|a| locate(&a.path)),
        })
    }

    /// Images found in the character's own image folders.
    pub fn images_for_character(&self, character: Option<&str>) -> Result<Vec<ImageRecord>> {
        let character = require("char", character)?;
        let catalog = self.scan();
        Ok(find_character(&catalog, character)?.images.clone())
    }

    /// Every indexed image, optionally filtered by a case-insensitive
    /// substring of its folder label or file name.
    pub fn gallery(&self, filter: Option<&str>) -> Vec<ImageRecord> {
        let images = self.scan().all_images;
        match filter.map(str::trim).filter(|f| !f.is_empty()) {
            None => images,
            Some(filter) => {
                let needle = filter.to_lowercase();
                images
                    .into_iter()
                    .filter(|img| {
                        img.dir_label.to_lowercase().contains(&needle)
                            || img.file_name.to_lowercase().contains(&needle)
                    })
                    .collect()
            }
        }
    }

    pub fn gallery_views(
        &self,
        filter: Option<&str>,
        locate: impl Fn(&Path) -> String,
    ) -> Vec<ImageView> {
        self.gallery(filter)
            .into_iter()
            .map(|img| ImageView {
                url: locate(&img.path),
                name: img.file_name,
                dir: img.dir_label,
            })
            .collect()
    }

    /// Checks that a client-supplied locator names an image inside a root.
    ///
    /// The path must be absolute, free of `..` and carry an image extension.
    /// An existing file must resolve, symlinks included, to a path under a
    /// resolved root; a missing one is checked as written.
    pub fn resolve_image(&self, raw: Option<&str>) -> Result<PathBuf> {
        let raw = require("path", raw)?;
        let path = PathBuf::from(raw);
        let outside = || LibraryError::ImageOutsideRoots { path: path.clone() };

        if !path.is_absolute()
            || probe::has_parent_component(&path)
            || !probe::has_extension(&path, &self.options.image_extensions)
        {
            return Err(outside());
        }
        if !self.is_within_roots(&path) {
            debug!("rejecting image outside roots: {}", path.display());
            return Err(outside());
        }
        if !probe::is_file(&path) {
            return Err(LibraryError::ImageNotFound { path });
        }
        Ok(path)
    }

    fn is_within_roots(&self, path: &Path) -> bool {
        match std::fs::canonicalize(path) {
            Ok(real) => self
                .roots
                .iter()
                .any(|r| real.starts_with(probe::canonicalize_best_effort(&r.path))),
            Err(_) => self.roots.iter().any(|r| path.starts_with(&r.path)),
        }
    }
}

fn find_character<'a>(catalog: &'a Catalog, name: &str) -> Result<&'a Character> {
    catalog
        .get(name)
        .ok_or_else(|| LibraryError::CharacterNotFound {
            character: name.to_string(),
        })
}

fn summarize(character: &Character, locate: &impl Fn(&Path) -> String) -> CharacterSummary {
    CharacterSummary {
        name: character.name.clone(),
        chat_count: character.chats.len(),
        image_count: character.images.len(),
        avatar: character.avatar.as_ref().map(|a| locate(&a.path)),
        chats: character
            .chats
            .iter()
            .map(|c| ChatSummary {
                name: c.display_name.clone(),
                file: c.file_name.clone(),
                size: c.size,
                modified: c.modified_iso(),
            })
            .collect(),
    }
}

/// Locator that is just the path.
pub fn plain_locator(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
