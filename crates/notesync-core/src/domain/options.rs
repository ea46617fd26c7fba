//! Per-run download policy and progress reporting types

use serde::{Deserialize, Serialize};

/// Default size threshold used when large-file skipping is enabled (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Policy applied to each folder entry before it is downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOptions {
    /// Skip entries that look like video files
    pub skip_video_files: bool,
    /// Skip entries whose reported size exceeds `max_file_size_bytes`
    pub skip_large_files: bool,
    /// Size threshold for `skip_large_files`
    pub max_file_size_bytes: u64,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            skip_video_files: false,
            skip_large_files: false,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

/// The entry most recently handled by a folder download
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePreview {
    pub remote_path: String,
    pub local_relative_path: String,
    pub modified_at: Option<String>,
    pub size_bytes: Option<u64>,
    pub mime_type: Option<String>,
}

/// Progress of a folder download
///
/// Emitted once with `processed_count == 0` before the first entry, then
/// after every entry with a preview of the file just handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderProgress {
    pub processed_count: usize,
    pub total_count: usize,
    pub latest_file: Option<FilePreview>,
}

impl FolderProgress {
    /// The initial report, before any entry is processed
    pub fn started(total_count: usize) -> Self {
        Self {
            processed_count: 0,
            total_count,
            latest_file: None,
        }
    }
}
