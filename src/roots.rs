//! Archive root discovery.
//!
//! Explicit roots are trusted and returned as given. Otherwise a fixed set of
//! locations is probed in priority order:
//!
//! 1. well-known backup folders (a `Backup` child is preferred when present),
//! 2. every entry of the storage-mounts folder, followed through symlinks,
//!    contributing its `Backup`/`backup` child and, when the mount itself
//!    holds a chat tree, the mount root,
//! 3. live application data folders, only when 1 and 2 found nothing.
//!
//! Found directories are deduplicated by their canonical path. When nothing
//! is found a fresh empty archive is created at the default location, so the
//! result is never empty.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::Root;
use crate::probe;
use crate::scanner::CHAT_DIRS;

/// Child folder names that mark a backup inside a mount or backup folder.
pub const BACKUP_DIRS: &[&str] = &["Backup", "backup"];

/// Candidate locations probed when no explicit roots are configured.
#[derive(Debug, Clone)]
pub struct SearchLocations {
    pub well_known: Vec<PathBuf>,
    pub storage_mounts: Option<PathBuf>,
    pub live_data: Vec<PathBuf>,
    pub default_root: PathBuf,
}

impl SearchLocations {
    /// The standard candidate set for a home directory.
    pub fn for_home(home: &Path) -> Self {
        Self {
            well_known: vec![
                home.join("ST-backup"),
                home.join("st-backup"),
                PathBuf::from("/storage/emulated/0/ST-backup"),
                PathBuf::from("/storage/emulated/0/Download/ST-backup"),
                PathBuf::from("/sdcard/ST-backup"),
                home.join("storage/shared/ST-backup"),
            ],
            storage_mounts: Some(home.join("storage")),
            live_data: vec![
                home.join("SillyTavern/data/default-user"),
                home.join("sillytavern/data/default-user"),
            ],
            default_root: home.join("ST-backup"),
        }
    }
}

/// Resolves the ordered list of archive roots. Never empty.
pub fn resolve_roots(explicit: &[PathBuf], locations: &SearchLocations) -> Vec<Root> {
    if !explicit.is_empty() {
        return explicit
            .iter()
            .enumerate()
            .map(|(priority, path)| Root {
                path: path.clone(),
                priority,
            })
            .collect();
    }

    let mut found = Found::default();

    for candidate in &locations.well_known {
        if !probe::is_dir(candidate) {
            continue;
        }
        match probe::find_subdir(candidate, &BACKUP_DIRS[..1]) {
            Some(backup) => found.push(&backup),
            None => found.push(candidate),
        }
    }

    if let Some(mounts) = &locations.storage_mounts {
        for mount in probe::list_dir(mounts) {
            if !mount.is_dir {
                continue;
            }
            for name in BACKUP_DIRS {
                let backup = mount.path.join(name);
                if probe::is_dir(&backup) {
                    found.push(&backup);
                }
            }
            if probe::find_subdir(&mount.path, CHAT_DIRS).is_some() {
                found.push(&mount.path);
            }
        }
    }

    if found.paths.is_empty() {
        for candidate in &locations.live_data {
            if probe::is_dir(candidate) {
                found.push(candidate);
            }
        }
    }

    if found.paths.is_empty() {
        let root = create_default_root(&locations.default_root);
        found.paths.push(root);
    }

    found
        .paths
        .into_iter()
        .enumerate()
        .map(|(priority, path)| Root { path, priority })
        .collect()
}

#[derive(Default)]
struct Found {
    paths: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl Found {
    fn push(&mut self, path: &Path) {
        let resolved = probe::canonicalize_best_effort(path);
        if self.seen.insert(resolved.clone()) {
            info!("found archive root: {}", resolved.display());
            self.paths.push(resolved);
        } else {
            debug!("duplicate root {} (resolves to {})", path.display(), resolved.display());
        }
    }
}

fn create_default_root(root: &Path) -> PathBuf {
    for sub in ["chats", "images"] {
        if let Err(e) = fs::create_dir_all(root.join(sub)) {
            warn!("cannot create {}: {}", root.join(sub).display(), e);
        }
    }
    info!(
        "no archive found; created empty archive at {} (put character folders in chats/, images in images/)",
        root.display()
    );
    root.to_path_buf()
}
