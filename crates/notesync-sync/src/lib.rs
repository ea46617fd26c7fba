//! NoteSync Sync - Local mirror maintenance and sync orchestration
//!
//! Provides:
//! - The on-disk layout of the local store
//! - Hash-based reconciliation of single files and folder listings
//! - A batch orchestrator reporting progress over an event channel
//! - A periodic auto-sync scheduler
//!
//! ## Modules
//!
//! - [`store`] - Local store layout, hashing and atomic file replacement
//! - [`reconcile`] - Applies fetched content to the store
//! - [`engine`] - Runs targets through fetch and reconciliation
//! - [`scheduler`] - Interval-based auto-sync trigger

pub mod engine;
pub mod reconcile;
pub mod scheduler;
pub mod store;

use notesync_core::domain::{DomainError, FetchError};
use thiserror::Error;

pub use engine::{RunSummary, SyncEvent, SyncOrchestrator, TargetSyncResult};
pub use reconcile::{FolderSummary, Reconciler};
pub use scheduler::AutoSyncScheduler;
pub use store::LocalStore;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fetching remote content failed or was cancelled
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An I/O error occurred while updating the local store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A domain-level error propagated from notesync-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Only one batch may run per process
    #[error("A sync run is already in progress")]
    AlreadyRunning,

    /// The same file is already being downloaded
    #[error("Download already in progress for {0}")]
    AlreadyInFlight(String),

    /// The requested file is not listed on the target
    #[error("File is not listed for this target: {0}")]
    UnknownFile(String),

    #[error("Groups cannot be synced")]
    NotSyncable,
}

impl SyncError {
    /// Whether the error is a user-requested stop
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Fetch(e) if e.is_cancelled())
    }
}
