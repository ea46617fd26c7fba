//! Remote source port (driven/secondary port)
//!
//! This module defines the interface the sync engine uses to pull content
//! from a public link. The adapter decides, per URL, whether the link names
//! a single file or a folder tree and hands back staged temp files; it never
//! touches the local store.
//!
//! ## Design Notes
//!
//! - Errors are the typed [`FetchError`] rather than `anyhow`, because the
//!   engine must tell a user-requested stop apart from a failure.
//! - Downloaded content is handed over as [`StagedFile`], which owns its temp
//!   path and deletes it on drop unless it was persisted. Every exit path
//!   of a sync therefore cleans up without explicit bookkeeping.
//! - Each folder entry carries a three-state [`EntryOutcome`] consumed
//!   uniformly by reconciliation.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempPath;
use tokio_util::sync::CancellationToken;

use crate::domain::{DownloadOptions, FetchError, FolderProgress};

/// Callback receiving folder download progress
pub type ProgressCallback = Arc<dyn Fn(FolderProgress) + Send + Sync>;

// ============================================================================
// StagedFile
// ============================================================================

/// Downloaded bytes staged in a private temp file
///
/// Removed from disk on drop unless moved into place with
/// [`StagedFile::persist`].
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    /// Takes ownership of a temp path
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    /// Current location of the staged content
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the staged file to `destination`
    ///
    /// Both paths must live on the same filesystem. The destination must not
    /// exist on platforms where rename refuses to overwrite.
    pub fn persist(self, destination: &Path) -> std::io::Result<()> {
        self.path.persist(destination).map_err(|e| e.error)
    }
}

// ============================================================================
// Fetch results
// ============================================================================

/// Why a folder entry was not downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// MIME type or extension identifies a video
    Video,
    /// Reported size exceeds the configured threshold
    TooLarge,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Video => write!(f, "video file"),
            SkipReason::TooLarge => write!(f, "file too large"),
        }
    }
}

/// Outcome of fetching one folder entry
#[derive(Debug)]
pub enum EntryOutcome {
    Downloaded(StagedFile),
    Skipped(SkipReason),
    /// Download error message; not fatal to the folder run
    Failed(String),
}

/// One file found in a remote folder listing
#[derive(Debug)]
pub struct FolderEntry {
    /// Provider path as returned by the listing
    pub remote_path: String,
    /// Sanitized path relative to the folder root
    pub local_relative_path: String,
    pub modified_at: Option<String>,
    pub size_bytes: Option<u64>,
    pub mime_type: Option<String>,
    pub outcome: EntryOutcome,
}

/// Content fetched for one source URL
#[derive(Debug)]
pub enum RemoteFetch {
    /// The link names a single file
    Single(StagedFile),
    /// The link names a folder; entries sorted by local path, case-insensitive
    Folder(Vec<FolderEntry>),
}

// ============================================================================
// IRemoteSource
// ============================================================================

/// Access to content published behind public links
#[async_trait]
pub trait IRemoteSource: Send + Sync {
    /// Fetches everything behind `source_url`
    ///
    /// # Arguments
    /// * `source_url` - Target URL or `ya-disk-public://` pseudo-URL
    /// * `options` - Skip policy for folder entries
    /// * `staging_dir` - Directory for temp files (same filesystem as the store)
    /// * `progress` - Receives folder download progress
    /// * `cancel` - Polled before every network call
    async fn fetch(
        &self,
        source_url: &str,
        options: &DownloadOptions,
        staging_dir: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<RemoteFetch, FetchError>;

    /// Fetches one file of a folder source by its provider path
    async fn fetch_file(
        &self,
        source_url: &str,
        remote_path: &str,
        staging_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<StagedFile, FetchError>;
}
