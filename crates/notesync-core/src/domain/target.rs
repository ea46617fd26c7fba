//! SyncTarget - a remote source paired with its local mirror state
//!
//! A target is either a syncable source (URL + mirror state) or a group,
//! a label node with no URL that only organizes other targets in a tree.
//!
//! ## Invariants
//!
//! For non-group targets:
//! - `source_type == Folder` exactly when `synced_files` is non-empty
//! - `sha256` is set only when `source_type == File`
//!
//! The sync engine never mutates a target in place: it takes a snapshot,
//! returns a new record, and the caller writes it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::newtypes::{ContentHash, TargetId};
use super::paths::derive_file_name;
use super::synced_file::{lenient_hash, SyncedFileItem};

/// Status of a target that has never been synced
pub const STATUS_NEVER_SYNCED: &str = "Never synced";
/// Status after a user-requested stop
pub const STATUS_STOPPED: &str = "Stopped";
/// Status after a single-file sync replaced the local copy
pub const STATUS_UPDATED: &str = "Updated";
/// Status after a single-file sync found identical content
pub const STATUS_NO_CHANGES: &str = "No changes";
/// Status after the user edited title, URL or parent
pub const STATUS_EDITED: &str = "Edited. Sync recommended";

/// Shape of the remote content, learned on the first successful sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Unknown,
    File,
    Folder,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Unknown => write!(f, "unknown"),
            SourceType::File => write!(f, "file"),
            SourceType::Folder => write!(f, "folder"),
        }
    }
}

fn nullable_source_type<'de, D>(deserializer: D) -> Result<SourceType, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<SourceType>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_status() -> String {
    STATUS_NEVER_SYNCED.to_string()
}

/// One user-configured remote source and its mirror state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTarget {
    #[serde(default)]
    pub id: TargetId,
    #[serde(default = "default_title")]
    pub title: String,
    /// Source URL; empty for groups
    #[serde(default)]
    pub url: String,
    /// Name of the single-file copy under the store's file directory
    #[serde(default, alias = "file_name")]
    pub file_name: String,
    #[serde(default, alias = "is_group")]
    pub is_group: bool,
    #[serde(default, alias = "parent_id")]
    pub parent_id: Option<TargetId>,
    #[serde(default, deserialize_with = "lenient_hash")]
    pub sha256: Option<ContentHash>,
    #[serde(default, alias = "last_checked_at")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "last_updated_at")]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, alias = "last_error")]
    pub last_error: Option<String>,
    #[serde(
        default,
        alias = "source_type",
        deserialize_with = "nullable_source_type"
    )]
    pub source_type: SourceType,
    #[serde(default, alias = "folder_files", alias = "folderFiles", alias = "synced_files")]
    pub synced_files: Vec<SyncedFileItem>,
}

impl SyncTarget {
    /// Creates a new syncable target with a derived file name
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let id = TargetId::new();
        let title = title.into();
        let file_name = derive_file_name(&title, &id);
        Self {
            id,
            title,
            url: url.into(),
            file_name,
            is_group: false,
            parent_id: None,
            sha256: None,
            last_checked_at: None,
            last_updated_at: None,
            status: default_status(),
            last_error: None,
            source_type: SourceType::Unknown,
            synced_files: Vec::new(),
        }
    }

    /// Creates a group node (no URL, never synced)
    pub fn new_group(title: impl Into<String>) -> Self {
        let mut group = Self::new(title, String::new());
        group.is_group = true;
        group.status = "Group".to_string();
        group
    }

    /// Whether sync operations apply to this target
    pub fn is_syncable(&self) -> bool {
        !self.is_group
    }

    /// Replaces the source URL
    ///
    /// A different URL invalidates every piece of recorded sync state;
    /// the caller is responsible for purging the local mirror.
    ///
    /// # Returns
    /// `true` if the URL actually changed
    pub fn set_url(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if url == self.url {
            return false;
        }
        self.url = url;
        self.sha256 = None;
        self.source_type = SourceType::Unknown;
        self.synced_files.clear();
        true
    }

    /// Looks up a folder entry by its local relative path
    pub fn synced_file(&self, local_relative_path: &str) -> Option<&SyncedFileItem> {
        self.synced_files
            .iter()
            .find(|f| f.local_relative_path == local_relative_path)
    }

    /// Checks the source-type invariants for non-group targets
    ///
    /// Listed files imply folder mode. A folder target may list nothing
    /// when the remote folder is empty.
    pub fn is_consistent(&self) -> bool {
        if self.is_group {
            return true;
        }
        let folder_ok = self.synced_files.is_empty() || self.source_type == SourceType::Folder;
        let hash_ok = self.sha256.is_none() || self.source_type == SourceType::File;
        folder_ok && hash_ok
    }
}
