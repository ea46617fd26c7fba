//! Temp-file staging and response sniffing

use std::collections::HashMap;
use std::path::Path;

use notesync_core::domain::FetchError;
use notesync_core::ports::StagedFile;

const STAGING_PREFIX: &str = "notesync-";
const SNIFF_LEN: usize = 256;

/// Writes downloaded bytes to a fresh temp file inside `dir`
///
/// The file is named `notesync-XXXX.<extension>` and deleted when the
/// returned [`StagedFile`] is dropped without being persisted.
pub async fn stage_bytes(data: &[u8], dir: &Path, extension: &str) -> Result<StagedFile, FetchError> {
    tokio::fs::create_dir_all(dir).await?;

    let extension = extension.trim_start_matches('.');
    let extension = if extension.is_empty() { "bin" } else { extension };
    let suffix = format!(".{extension}");

    let temp = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(&suffix)
        .tempfile_in(dir)?;
    let path = temp.into_temp_path();

    tokio::fs::write(&path, data).await?;
    Ok(StagedFile::new(path))
}

/// Extension of the last segment of a name or path, without the dot
///
/// Hidden files such as `.profile` have no extension.
pub fn extension_of(name: &str) -> Option<&str> {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension)
}

/// Whether a response is an HTML page rather than file content
///
/// True when `content-type` mentions `text/html`, or when the first bytes
/// of the body contain an `<html` or `<!doctype html` marker.
pub fn looks_like_html(body: &[u8], headers: &HashMap<String, String>) -> bool {
    let html_content_type = headers
        .get("content-type")
        .is_some_and(|value| value.to_ascii_lowercase().contains("text/html"));
    if html_content_type {
        return true;
    }

    let prefix = String::from_utf8_lossy(&body[..body.len().min(SNIFF_LEN)]).to_ascii_lowercase();
    prefix.contains("<html") || prefix.contains("<!doctype html")
}
