//! Skip rules applied to folder entries before they are downloaded

use notesync_core::domain::DownloadOptions;
use notesync_core::ports::SkipReason;

use crate::staging::extension_of;

/// File extensions treated as video regardless of the reported MIME type
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "3gp", "avi", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "mts", "ogv", "ts",
    "webm", "wmv",
];

/// Whether an entry is a video by MIME type or file name
pub fn is_video(name: &str, mime_type: Option<&str>) -> bool {
    if mime_type.is_some_and(|mime| mime.to_ascii_lowercase().starts_with("video/")) {
        return true;
    }
    extension_of(&name.to_ascii_lowercase()).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext))
}

/// Returns why an entry must not be fetched, if it must not
///
/// The size rule only applies when a positive threshold is configured and
/// the provider reported a size.
pub fn skip_reason(
    name: &str,
    mime_type: Option<&str>,
    size_bytes: Option<u64>,
    options: &DownloadOptions,
) -> Option<SkipReason> {
    if options.skip_video_files && is_video(name, mime_type) {
        return Some(SkipReason::Video);
    }
    if options.skip_large_files
        && options.max_file_size_bytes > 0
        && size_bytes.is_some_and(|size| size > options.max_file_size_bytes)
    {
        return Some(SkipReason::TooLarge);
    }
    None
}
