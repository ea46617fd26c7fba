//! Local path derivation
//!
//! Remote listings are untrusted input: every provider path is reduced to
//! plain segments before it touches the local store, so a listing can never
//! address anything outside the target's mirror directory.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use super::newtypes::TargetId;

/// Maximum number of slug characters kept in a derived file name
const SLUG_MAX_CHARS: usize = 36;

/// Splits a provider path into segments, dropping empty, `.` and `..` parts
fn sanitized_parts(path: Option<&str>) -> Vec<&str> {
    path.map(|p| {
        p.split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .collect()
    })
    .unwrap_or_default()
}

/// Computes the local relative path of a folder entry
///
/// Strips the folder's root prefix from `remote_path` and rejoins the
/// remaining sanitized segments with `/`. When nothing remains the entry's
/// own file name is used, and when even that is empty a random identifier.
///
/// # Arguments
/// * `remote_path` - Path reported by the provider listing
/// * `root_path` - Path of the listed folder itself, if known
///
/// # Returns
/// A non-empty, traversal-free, forward-slash separated path
pub fn make_safe_relative_path(remote_path: &str, root_path: Option<&str>) -> String {
    let remote_parts = sanitized_parts(Some(remote_path));
    let root_parts = sanitized_parts(root_path);

    let mut relative: &[&str] = &remote_parts;
    if remote_parts.starts_with(&root_parts) {
        relative = &remote_parts[root_parts.len()..];
    }

    if relative.is_empty() {
        if let Some(last) = remote_parts.last() {
            return (*last).to_string();
        }
        return Uuid::new_v4().to_string();
    }

    relative.join("/")
}

/// Derives the single-file name for a target from its title and id
///
/// The title is folded to ASCII, lowercased and reduced to a dash-separated
/// slug (`note` when nothing survives), truncated, and suffixed with the
/// first eight characters of the id so two targets never collide.
pub fn derive_file_name(title: &str, id: &TargetId) -> String {
    let folded: String = title
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_ascii_lowercase();

    let mut slug = String::with_capacity(folded.len());
    let mut pending_dash = false;
    for c in folded.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("note");
    }

    let truncated: String = slug.chars().take(SLUG_MAX_CHARS).collect();
    format!("{}-{}.pdf", truncated, id.short())
}
