//! Archive scanning and identity resolution.
//!
//! Each root is walked on its own (in parallel) into a [`RootInventory`];
//! inventories are then merged in root priority order, so the outcome does
//! not depend on which walk finishes first.
//!
//! Per root:
//!
//! - `chats/<Character>/*.jsonl` (or `chat/`) gives chat records. A root
//!   with neither folder is treated as its own chat folder, where each
//!   subfolder holding a chat file is a character.
//! - `images/<Character>/*` gives images owned by that character; loose
//!   files at the top of `images/` and anything nested deeper are indexed
//!   without an owner.
//! - `user/images`, `thumbnails` and `characters` are walked recursively
//!   and every image found is indexed without an owner.
//!
//! Merging rules: a `(character, file)` pair already seen in an earlier root
//! is dropped; a character's avatar is the first image in its own image
//! folder, else the first ownerless image whose file stem fuzzily matches
//! its name (see [`crate::identity`]).

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::config::ArchiveConfig;
use crate::identity;
use crate::models::{Catalog, ChatRecord, ImageRecord, Root};
use crate::probe;

/// Chat folder names, in lookup order.
pub const CHAT_DIRS: &[&str] = &["chats", "chat"];
/// Folder whose immediate subfolders are per-character image folders.
pub const CHARACTER_IMAGE_DIR: &str = "images";
/// Folders walked recursively for ownerless images and avatar candidates.
pub const LOOSE_IMAGE_DIRS: &[&str] = &["user/images", "thumbnails", "characters"];
/// Top-level folders never mistaken for character folders.
const NON_CHARACTER_DIRS: &[&str] = &["images", "thumbnails", "characters", "user"];

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub chat_extension: String,
    pub image_extensions: Vec<String>,
    pub max_depth: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&ArchiveConfig::default())
    }
}

impl From<&ArchiveConfig> for ScanOptions {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            chat_extension: config.chat_ext().to_string(),
            image_extensions: config.image_extensions.clone(),
            max_depth: config.max_depth,
        }
    }
}

impl ScanOptions {
    fn is_chat_file(&self, name: &str) -> bool {
        name.strip_suffix(self.chat_extension.as_str())
            .and_then(|stem| stem.strip_suffix('.'))
            .is_some()
    }

    fn is_image(&self, path: &Path) -> bool {
        probe::has_extension(path, &self.image_extensions)
    }
}

/// What a single root contributes, before merging.
#[derive(Debug, Default)]
pub struct RootInventory {
    /// Chat folders in discovery order, with their records.
    pub chat_folders: Vec<(String, Vec<ChatRecord>)>,
    /// Character names seen as `images/<name>` folders.
    pub image_folders: Vec<String>,
    /// Every image in discovery order.
    pub images: Vec<ImageRecord>,
}

/// Scans every root and builds the catalog.
pub fn scan(roots: &[Root], options: &ScanOptions) -> Catalog {
    let started = Instant::now();

    let mut ordered: Vec<&Root> = roots.iter().collect();
    ordered.sort_by_key(|r| r.priority);

    let inventories: Vec<RootInventory> = ordered
        .par_iter()
        .map(|root| scan_root(&root.path, options))
        .collect();

    let mut catalog = Catalog::new();
    for inventory in inventories {
        merge(&mut catalog, inventory);
    }
    resolve_fuzzy_avatars(&mut catalog);

    debug!(
        "scanned {} roots: {} characters, {} chats, {} images in {:.2}s",
        roots.len(),
        catalog.len(),
        catalog.chat_count(),
        catalog.all_images.len(),
        started.elapsed().as_secs_f64()
    );
    catalog
}

/// Walks one root. Unreadable entries are skipped.
pub fn scan_root(root: &Path, options: &ScanOptions) -> RootInventory {
    let mut inventory = RootInventory::default();

    match probe::find_subdir(root, CHAT_DIRS) {
        Some(chats_dir) => scan_chat_dir(&chats_dir, false, options, &mut inventory),
        None => {
            scan_chat_dir(root, true, options, &mut inventory);
            if !inventory.chat_folders.is_empty() {
                debug!("{} has no chats folder; using it directly", root.display());
            }
        }
    }

    let images_dir = root.join(CHARACTER_IMAGE_DIR);
    if probe::is_dir(&images_dir) {
        scan_character_images(&images_dir, options, &mut inventory);
    }

    for sub in LOOSE_IMAGE_DIRS {
        let dir = root.join(sub);
        if probe::is_dir(&dir) {
            walk_loose_images(&dir, &dir, options, &mut inventory.images);
        }
    }

    inventory
}

/// Collects `<dir>/<Character>/*.<ext>`. In `bare` mode `dir` is a root
/// used as its own chat folder: reserved folder names are skipped and only
/// folders holding at least one chat file count as characters.
fn scan_chat_dir(dir: &Path, bare: bool, options: &ScanOptions, inventory: &mut RootInventory) {
    for folder in probe::list_dir(dir) {
        if !folder.is_dir {
            continue;
        }
        if bare && NON_CHARACTER_DIRS.contains(&folder.name.as_str()) {
            continue;
        }
        let records: Vec<ChatRecord> = probe::list_dir(&folder.path)
            .into_iter()
            .filter(|file| file.is_file && options.is_chat_file(&file.name))
            .filter_map(|file| chat_record(&file.path, &file.name, &options.chat_extension))
            .collect();
        if bare && records.is_empty() {
            continue;
        }
        inventory.chat_folders.push((folder.name, records));
    }
}

fn chat_record(path: &Path, file_name: &str, extension: &str) -> Option<ChatRecord> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            debug!("skipping chat file {}: {}", path.display(), e);
            return None;
        }
    };
    let display_name = file_name
        .strip_suffix(extension)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(file_name)
        .to_string();
    Some(ChatRecord {
        display_name,
        file_name: file_name.to_string(),
        path: path.to_path_buf(),
        size: meta.len(),
        modified: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
    })
}

/// Indexes `images/`. A subfolder holding image files directly is a
/// character folder and owns those files; anything nested deeper, and any
/// subfolder without direct images (dates, albums), is walked for ownerless
/// images labelled by their path under `images/`.
fn scan_character_images(images_dir: &Path, options: &ScanOptions, inventory: &mut RootInventory) {
    for entry in probe::list_dir(images_dir) {
        if entry.is_file {
            if options.is_image(&entry.path) {
                inventory.images.push(ImageRecord {
                    path: entry.path,
                    file_name: entry.name,
                    owner: None,
                    dir_label: String::new(),
                });
            }
            continue;
        }
        if !entry.is_dir {
            continue;
        }

        let children = probe::list_dir(&entry.path);
        let owned: Vec<_> = children
            .iter()
            .filter(|file| file.is_file && options.is_image(&file.path))
            .collect();
        if owned.is_empty() {
            walk_loose_images(images_dir, &entry.path, options, &mut inventory.images);
            continue;
        }

        let owner = entry.name;
        for file in owned {
            inventory.images.push(ImageRecord {
                path: file.path.clone(),
                file_name: file.name.clone(),
                owner: Some(owner.clone()),
                dir_label: owner.clone(),
            });
        }
        for sub in children.iter().filter(|child| child.is_dir) {
            walk_loose_images(images_dir, &sub.path, options, &mut inventory.images);
        }
        inventory.image_folders.push(owner);
    }
}

/// Recursive walk of `dir` that follows symlinks; labels are relative to
/// `base`. Symlink loops surface as walk errors and are skipped, as is
/// anything deeper than `max_depth`.
fn walk_loose_images(base: &Path, dir: &Path, options: &ScanOptions, out: &mut Vec<ImageRecord>) {
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .max_depth(options.max_depth)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !options.is_image(entry.path()) {
            continue;
        }
        let path = entry.path().to_path_buf();
        trace!("loose image {}", path.display());
        out.push(ImageRecord {
            file_name: entry.file_name().to_string_lossy().into_owned(),
            dir_label: dir_label(base, &path),
            owner: None,
            path,
        });
    }
}

/// Parent folder of `path` relative to `base`, `/`-separated.
fn dir_label(base: &Path, path: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.strip_prefix(base).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

fn merge(catalog: &mut Catalog, inventory: RootInventory) {
    for (name, records) in inventory.chat_folders {
        let character = catalog.entry(&name);
        for record in records {
            if character.find_chat(&record.file_name).is_some() {
                debug!(
                    "ignoring {} for {}: already provided by a higher-priority root",
                    record.path.display(),
                    name
                );
                continue;
            }
            character.chats.push(record);
        }
    }

    for name in &inventory.image_folders {
        catalog.entry(name);
    }

    for image in inventory.images {
        if let Some(owner) = image.owner.as_deref() {
            let character = catalog.entry(owner);
            character.images.push(image.clone());
            if character.avatar.is_none() {
                character.avatar = Some(image.clone());
            }
        }
        catalog.all_images.push(image);
    }
}

fn resolve_fuzzy_avatars(catalog: &mut Catalog) {
    let candidates: Vec<(String, ImageRecord)> = catalog
        .all_images
        .iter()
        .filter(|img| img.owner.is_none())
        .filter_map(|img| {
            let stem = Path::new(&img.file_name).file_stem()?.to_string_lossy();
            let key = identity::normalize(&stem);
            (!key.is_empty()).then(|| (key, img.clone()))
        })
        .collect();

    for character in catalog.characters_mut() {
        if character.avatar.is_some() {
            continue;
        }
        let key = identity::normalize(&character.name);
        if key.is_empty() {
            continue;
        }
        if let Some((_, image)) = candidates
            .iter()
            .find(|(candidate, _)| identity::matches(&key, candidate))
        {
            trace!("avatar for {}: {}", character.name, image.path.display());
            character.avatar = Some(image.clone());
        }
    }
}

/// Convenience for callers holding plain paths; position is priority.
pub fn scan_paths(paths: &[PathBuf], options: &ScanOptions) -> Catalog {
    let roots: Vec<Root> = paths
        .iter()
        .enumerate()
        .map(|(priority, path)| Root {
            path: path.clone(),
            priority,
        })
        .collect();
    scan(&roots, options)
}
