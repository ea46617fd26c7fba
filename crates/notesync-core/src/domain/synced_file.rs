//! SyncedFileItem - one file mirrored from a folder source

use std::str::FromStr;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::ContentHash;

/// One file inside a folder-mode target
///
/// `local_relative_path` is the item's identity within its target: it is
/// both the display key and the path under the target's mirror directory.
/// `sha256` is `None` when the file was never stored locally (skipped or
/// failed with no earlier copy). The remaining metadata is advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedFileItem {
    /// Provider path as returned by the listing
    #[serde(alias = "relative_path", alias = "relativePath")]
    pub remote_path: String,
    /// Sanitized forward-slash path under the mirror directory
    #[serde(alias = "local_relative_path")]
    pub local_relative_path: String,
    #[serde(default, deserialize_with = "lenient_hash")]
    pub sha256: Option<ContentHash>,
    #[serde(default, alias = "modified_at")]
    pub modified_at: Option<String>,
    #[serde(default, alias = "size_bytes")]
    pub size_bytes: Option<u64>,
    #[serde(default, alias = "mime_type")]
    pub mime_type: Option<String>,
}

/// Listing order for a folder target's files
///
/// Unknown values read from disk fall back to `Name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum FileSortMode {
    /// Case-insensitive local path
    #[default]
    Name,
    /// Newest `modified_at` first, then by name
    Date,
}

impl FromStr for FileSortMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "date" => Ok(Self::Date),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown sort mode '{other}', expected name or date"
            ))),
        }
    }
}

impl From<String> for FileSortMode {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

/// Returns `files` in display order
pub fn sorted_files(files: &[SyncedFileItem], mode: FileSortMode) -> Vec<&SyncedFileItem> {
    let mut sorted: Vec<&SyncedFileItem> = files.iter().collect();
    match mode {
        FileSortMode::Name => {
            sorted.sort_by_cached_key(|f| f.local_relative_path.to_lowercase());
        }
        FileSortMode::Date => {
            // Missing or unparseable timestamps sort last
            sorted.sort_by_cached_key(|f| {
                let stamp = f
                    .modified_at
                    .as_deref()
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|t| t.timestamp_millis());
                (std::cmp::Reverse(stamp), f.local_relative_path.to_lowercase())
            });
        }
    }
    sorted
}

/// Accepts the empty string older records used for "no hash"
pub(crate) fn lenient_hash<'de, D>(deserializer: D) -> Result<Option<ContentHash>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => ContentHash::new(s).map(Some).map_err(serde::de::Error::custom),
    }
}
