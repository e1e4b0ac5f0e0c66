//! Core data types produced by a scan and consumed by the query facade.
//!
//! Everything here is rebuilt from disk on each scan; nothing is cached.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

/// A directory believed to hold archive data. Position in the resolved
/// list is its priority: earlier roots win conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub path: PathBuf,
    pub priority: usize,
}

/// Metadata for one transcript file.
#[derive(Debug, Clone)]
pub struct ChatRecord {
    /// File name without the record-file extension.
    pub display_name: String,
    /// File name as found on disk; with the character name it forms the key.
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

impl ChatRecord {
    /// Last-modified time as ISO 8601 with millisecond precision.
    pub fn modified_iso(&self) -> String {
        let dt: DateTime<Utc> = self.modified.into();
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Metadata for one discovered image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub file_name: String,
    /// Character the image belongs to, when found in a character-named folder.
    pub owner: Option<String>,
    /// Folder label used for gallery grouping; empty at a tree's top level.
    pub dir_label: String,
}

/// A persona identified by its exact folder name.
#[derive(Debug, Clone, Default)]
pub struct Character {
    pub name: String,
    pub chats: Vec<ChatRecord>,
    pub images: Vec<ImageRecord>,
    pub avatar: Option<ImageRecord>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn find_chat(&self, file_name: &str) -> Option<&ChatRecord> {
        self.chats.iter().find(|c| c.file_name == file_name)
    }
}

/// Result of scanning every root: characters in discovery order plus a flat
/// image index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    characters: Vec<Character>,
    index: HashMap<String, usize>,
    pub all_images: Vec<ImageRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the character with this exact name, inserting it at the end
    /// if it has not been seen yet.
    pub fn entry(&mut self, name: &str) -> &mut Character {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.characters.push(Character::new(name));
                let idx = self.characters.len() - 1;
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.characters[idx]
    }

    pub fn get(&self, name: &str) -> Option<&Character> {
        self.index.get(name).map(|&idx| &self.characters[idx])
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn characters_mut(&mut self) -> &mut [Character] {
        &mut self.characters
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn chat_count(&self) -> usize {
        self.characters.iter().map(|c| c.chats.len()).sum()
    }
}

/// One decoded transcript line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub speaker: String,
    pub is_user: bool,
    pub body: String,
    pub timestamp: String,
    pub image: Option<String>,
    pub title: Option<String>,
    pub swipe_count: usize,
    pub selected_swipe: Option<u64>,
}
