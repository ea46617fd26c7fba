//! Domain entities and business logic
//!
//! This module contains the core domain types for NoteSync:
//! - Newtypes for target identifiers and content hashes
//! - Sync target records and the files mirrored for folder sources
//! - Download policy options and progress reporting types
//! - Path sanitization and local file name derivation
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod options;
pub mod paths;
pub mod synced_file;
pub mod target;

// Re-export commonly used types
pub use errors::{DomainError, FetchError};
pub use newtypes::*;
pub use options::{DownloadOptions, FilePreview, FolderProgress};
pub use paths::{derive_file_name, make_safe_relative_path};
pub use synced_file::{sorted_files, FileSortMode, SyncedFileItem};
pub use target::{
    SourceType, SyncTarget, STATUS_EDITED, STATUS_NEVER_SYNCED, STATUS_NO_CHANGES, STATUS_STOPPED,
    STATUS_UPDATED,
};
