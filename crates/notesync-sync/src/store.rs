//! Local store layout and file primitives
//!
//! ```text
//! <base_dir>/
//! ├── pdfs/<file_name>              single-file targets
//! ├── sources/<target-id>/<path>    folder mirrors
//! ├── tmp/                          staging for downloads
//! └── targets.json                  target catalog
//! ```
//!
//! Staging lives on the same filesystem as the mirrors so that moving a
//! downloaded file into place is a plain rename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use notesync_core::config::StorageConfig;
use notesync_core::domain::{ContentHash, SyncTarget};
use notesync_core::ports::StagedFile;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};
use walkdir::WalkDir;

const FILES_DIR: &str = "pdfs";
const SOURCES_DIR: &str = "sources";
const TEMP_DIR: &str = "tmp";
const CATALOG_FILE: &str = "targets.json";

/// Read buffer for hashing
const HASH_CHUNK: usize = 1024 * 1024;

// ============================================================================
// LocalStore
// ============================================================================

/// Paths of the local mirror
#[derive(Debug, Clone)]
pub struct LocalStore {
    base_dir: PathBuf,
}

impl LocalStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn files_dir(&self) -> PathBuf {
        self.base_dir.join(FILES_DIR)
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.base_dir.join(SOURCES_DIR)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.base_dir.join(TEMP_DIR)
    }

    /// Location of the JSON target catalog
    pub fn catalog_path(&self) -> PathBuf {
        self.base_dir.join(CATALOG_FILE)
    }

    /// Creates the store directories if absent
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [self.files_dir(), self.sources_dir(), self.temp_dir()] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Path of a file-mode target's single copy
    pub fn single_file_path(&self, target: &SyncTarget) -> PathBuf {
        self.files_dir().join(&target.file_name)
    }

    /// Mirror directory of a folder-mode target
    pub fn source_dir(&self, target: &SyncTarget) -> PathBuf {
        self.sources_dir().join(target.id.to_string())
    }

    /// Path of one mirrored file
    ///
    /// `local_relative_path` is already sanitized; it is joined segment by
    /// segment so the result uses native separators.
    pub fn source_file_path(&self, target: &SyncTarget, local_relative_path: &str) -> PathBuf {
        local_relative_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.source_dir(target), |path, segment| path.join(segment))
    }

    /// Deletes everything stored for a target
    #[instrument(skip(self, target), fields(target_id = %target.id))]
    pub async fn purge_target(&self, target: &SyncTarget) -> std::io::Result<()> {
        if !target.file_name.is_empty() {
            remove_file_if_exists(&self.single_file_path(target)).await?;
        }
        remove_dir_if_exists(&self.source_dir(target)).await?;
        debug!("Local mirror purged");
        Ok(())
    }
}

// ============================================================================
// File primitives
// ============================================================================

/// SHA-256 of a file's content, read in chunks
pub async fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(ContentHash::from_hasher(hasher))
}

/// Hash of the file at `path`, or `None` if there is no file
pub async fn hash_if_exists(path: &Path) -> std::io::Result<Option<ContentHash>> {
    match hash_file(path).await {
        Ok(hash) => Ok(Some(hash)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Moves a staged download to `destination`, replacing any existing file
pub async fn replace_file(staged: StagedFile, destination: &Path) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    remove_file_if_exists(destination).await?;
    staged.persist(destination)
}

/// Removes a file; returns whether one was there
pub async fn remove_file_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Recursively removes a directory if present
pub async fn remove_dir_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Removes every empty directory below `root`, deepest first
///
/// `root` itself is kept. Directories that cannot be removed are left
/// alone.
///
/// # Returns
/// Number of directories removed
pub fn prune_empty_dirs(root: &Path) -> usize {
    if !root.is_dir() {
        return 0;
    }

    let mut removed = 0;
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
    {
        let is_empty = std::fs::read_dir(entry.path())
            .map(|mut children| children.next().is_none())
            .unwrap_or(false);
        if is_empty && std::fs::remove_dir(entry.path()).is_ok() {
            removed += 1;
        }
    }
    removed
}
