//! Source URL classification
//!
//! Turns the raw string stored on a sync target into a [`ResolvedSource`]:
//! a Yandex Disk public resource descriptor, a Google Workspace export, a
//! Google Drive file id, or a plain URL (with Dropbox and GitHub rewrites
//! already applied). Resolution is pure; no network access happens here.
//!
//! The `ya-disk-public://<key>[:/<path>]` pseudo-URL grammar is matched on
//! the raw string before any URL parsing, since public keys may contain
//! characters a URL parser would reject or rewrite.

use std::sync::LazyLock;

use notesync_core::domain::FetchError;
use regex::Regex;
use url::Url;

/// Scheme prefix of Yandex Disk public-key pseudo-URLs
pub const YANDEX_PSEUDO_PREFIX: &str = "ya-disk-public://";

/// Maximum nesting of `docs.yandex` viewer wrappers
const MAX_WRAPPER_DEPTH: usize = 5;

static WORKSPACE_DOCUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/document/d/([A-Za-z0-9_-]+)").expect("valid regex"));
static WORKSPACE_SPREADSHEET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("valid regex"));
static WORKSPACE_PRESENTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/presentation/d/([A-Za-z0-9_-]+)").expect("valid regex"));
static DRIVE_FILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/file/d/([a-zA-Z0-9_-]+)").expect("valid regex"));

// ============================================================================
// Types
// ============================================================================

/// A Yandex Disk public resource, independent of how its URL was spelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Value of the `public_key` API parameter
    pub public_key: String,
    /// Path inside the public resource, always starting with `/`
    pub path: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(public_key: impl Into<String>, path: Option<String>) -> Self {
        Self {
            public_key: public_key.into(),
            path,
        }
    }
}

/// Google Workspace document families with a PDF export endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceKind {
    Document,
    Spreadsheet,
    Presentation,
}

impl WorkspaceKind {
    /// Export path on `docs.google.com` for a document id
    pub fn export_path(&self, id: &str) -> String {
        match self {
            WorkspaceKind::Document => format!("/document/d/{id}/export?format=pdf"),
            WorkspaceKind::Spreadsheet => format!("/spreadsheets/d/{id}/export?format=pdf"),
            WorkspaceKind::Presentation => format!("/presentation/d/{id}/export/pdf"),
        }
    }
}

/// Provider selected for a source URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    /// Yandex Disk public resource (file or folder)
    Yandex(ResourceDescriptor),
    /// Google Docs/Sheets/Slides document fetched as PDF
    GoogleWorkspace { kind: WorkspaceKind, id: String },
    /// Google Drive file behind the `uc` download endpoint
    GoogleDrive { file_id: String },
    /// Anything else, fetched as-is after provider rewrites
    Direct(Url),
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves a raw source string into the provider that serves it
///
/// # Errors
/// [`FetchError::Download`] with `"Invalid URL"`, `"Unsupported Yandex link
/// format"` or `"Unsupported Google Drive URL format"`.
pub fn resolve_source(raw: &str) -> Result<ResolvedSource, FetchError> {
    if let Some(descriptor) = parse_yandex_pseudo_url(raw) {
        return Ok(ResolvedSource::Yandex(descriptor));
    }

    let url = parse_source_url(raw)?;
    let host = host_of(&url);

    if is_yandex(&url, &host) {
        return resolve_yandex(&url, 0)
            .map(ResolvedSource::Yandex)
            .ok_or_else(|| FetchError::download("Unsupported Yandex link format"));
    }

    if host.contains("drive.google.com") || host.contains("docs.google.com") {
        if let Some((kind, id)) = workspace_document(&url, &host) {
            return Ok(ResolvedSource::GoogleWorkspace { kind, id });
        }
        let file_id = drive_file_id(&url)
            .ok_or_else(|| FetchError::download("Unsupported Google Drive URL format"))?;
        return Ok(ResolvedSource::GoogleDrive { file_id });
    }

    Ok(ResolvedSource::Direct(rewrite_direct_url(url)))
}

/// Resolves a source string that must name a Yandex Disk resource
///
/// Returns `None` for any other provider or an unparseable string.
pub fn resolve_yandex_source(raw: &str) -> Option<ResourceDescriptor> {
    if let Some(descriptor) = parse_yandex_pseudo_url(raw) {
        return Some(descriptor);
    }
    let url = parse_source_url(raw).ok()?;
    resolve_yandex(&url, 0)
}

/// Parses a source string as a URL, defaulting the scheme to `https`
///
/// Only `http`, `https` and `ya-disk-public` are accepted, and `http(s)`
/// URLs must carry a host.
pub fn parse_source_url(raw: &str) -> Result<Url, FetchError> {
    let invalid = || FetchError::download("Invalid URL");
    let trimmed = raw.trim();

    let url = if trimmed.contains("://") {
        Url::parse(trimmed).map_err(|_| invalid())?
    } else {
        Url::parse(&format!("https://{trimmed}")).map_err(|_| invalid())?
    };

    match url.scheme() {
        "http" | "https" => {
            if url.host_str().map_or(true, str::is_empty) {
                return Err(invalid());
            }
        }
        "ya-disk-public" => {}
        _ => return Err(invalid()),
    }
    Ok(url)
}

/// Parses the `ya-disk-public://<key>[:/<path>]` grammar
///
/// Spaces in the key become `+`. The path is re-rooted at `/`; an empty
/// path is treated as absent. Returns `None` when the string does not use
/// the pseudo scheme or the key is empty.
pub fn parse_yandex_pseudo_url(raw: &str) -> Option<ResourceDescriptor> {
    let trimmed = raw.trim();
    let prefix_len = YANDEX_PSEUDO_PREFIX.len();
    if trimmed.len() < prefix_len
        || !trimmed.is_char_boundary(prefix_len)
        || !trimmed[..prefix_len].eq_ignore_ascii_case(YANDEX_PSEUDO_PREFIX)
    {
        return None;
    }

    let remainder = &trimmed[prefix_len..];
    if remainder.is_empty() {
        return None;
    }

    let (key_part, path) = match remainder.split_once(":/") {
        Some((key, path)) => {
            let cleaned = path.trim_matches('/');
            let path = (!cleaned.is_empty()).then(|| format!("/{cleaned}"));
            (key, path)
        }
        None => (remainder, None),
    };

    let key = key_part.trim().replace(' ', "+");
    if key.is_empty() {
        return None;
    }

    Some(ResourceDescriptor::new(
        format!("{YANDEX_PSEUDO_PREFIX}{key}"),
        path,
    ))
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_ascii_lowercase()
}

fn is_yandex(url: &Url, host: &str) -> bool {
    url.scheme() == "ya-disk-public"
        || host.contains("yadi.sk")
        || host.contains("disk.yandex")
        || host.contains("disk.360.yandex")
        || host.contains("docs.yandex")
}

/// Resolves a parsed Yandex URL, unwrapping `docs.yandex` viewer links
fn resolve_yandex(url: &Url, depth: usize) -> Option<ResourceDescriptor> {
    if depth > MAX_WRAPPER_DEPTH {
        return None;
    }

    if let Some(descriptor) = parse_yandex_pseudo_url(url.as_str()) {
        return Some(descriptor);
    }

    let host = host_of(url);
    if host.contains("docs.yandex") {
        let wrapped = url
            .query_pairs()
            .find(|(name, _)| name == "url")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        let Some(wrapped) = wrapped else {
            return Some(ResourceDescriptor::new(url.as_str(), None));
        };

        let decoded = urlencoding::decode(&wrapped)
            .map(|value| value.into_owned())
            .unwrap_or(wrapped);
        if let Some(descriptor) = parse_yandex_pseudo_url(&decoded) {
            return Some(descriptor);
        }
        let nested = parse_source_url(&decoded).ok()?;
        return resolve_yandex(&nested, depth + 1);
    }

    if host.contains("yadi.sk") || host.contains("disk.yandex") || host.contains("disk.360.yandex") {
        return Some(ResourceDescriptor::new(url.as_str(), None));
    }

    None
}

fn workspace_document(url: &Url, host: &str) -> Option<(WorkspaceKind, String)> {
    if !host.contains("docs.google.com") {
        return None;
    }
    let path = url.path();
    [
        (&*WORKSPACE_DOCUMENT, WorkspaceKind::Document),
        (&*WORKSPACE_SPREADSHEET, WorkspaceKind::Spreadsheet),
        (&*WORKSPACE_PRESENTATION, WorkspaceKind::Presentation),
    ]
    .into_iter()
    .find_map(|(pattern, kind)| {
        pattern
            .captures(path)
            .map(|caps| (kind, caps[1].to_string()))
    })
}

fn drive_file_id(url: &Url) -> Option<String> {
    if let Some(caps) = DRIVE_FILE_PATH.captures(url.as_str()) {
        return Some(caps[1].to_string());
    }
    url.query_pairs()
        .find(|(name, _)| name == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Applies provider rewrites to a generic download URL
///
/// - Dropbox: drops `dl`/`raw`, keeps the last value of every other
///   parameter, and forces `dl=1`.
/// - GitHub: `github.com/{owner}/{repo}/blob/{branch}/{path}` becomes the
///   matching `raw.githubusercontent.com` URL.
pub fn rewrite_direct_url(url: Url) -> Url {
    let host = host_of(&url);

    if host.contains("dropbox.com") {
        let mut params: Vec<(String, String)> = Vec::new();
        for (name, value) in url.query_pairs() {
            if name == "dl" || name == "raw" || value.is_empty() {
                continue;
            }
            match params.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = value.into_owned(),
                None => params.push((name.into_owned(), value.into_owned())),
            }
        }
        params.push(("dl".to_string(), "1".to_string()));

        let mut rewritten = url;
        rewritten.query_pairs_mut().clear().extend_pairs(params);
        return rewritten;
    }

    if host == "github.com" {
        let chunks: Vec<&str> = url.path().split('/').filter(|c| !c.is_empty()).collect();
        if chunks.len() >= 5 && chunks[2] == "blob" {
            let raw = format!(
                "https://raw.githubusercontent.com/{}/{}/{}/{}",
                chunks[0],
                chunks[1],
                chunks[3],
                chunks[4..].join("/")
            );
            if let Ok(rewritten) = Url::parse(&raw) {
                return rewritten;
            }
        }
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yandex(raw: &str) -> ResourceDescriptor {
        match resolve_source(raw).unwrap() {
            ResolvedSource::Yandex(descriptor) => descriptor,
            other => panic!("expected Yandex source, got {other:?}"),
        }
    }

    fn error_text(raw: &str) -> String {
        resolve_source(raw).unwrap_err().to_string()
    }

    #[test]
    fn test_pseudo_url_with_path() {
        for key in ["KEY", "abc123", "Zx9_q-w"] {
            let descriptor = yandex(&format!("ya-disk-public://{key}:/a/b/c.pdf"));
            assert_eq!(descriptor.public_key, format!("ya-disk-public://{key}"));
            assert_eq!(descriptor.path.as_deref(), Some("/a/b/c.pdf"));
        }
    }

    #[test]
    fn test_pseudo_url_without_path() {
        let descriptor = yandex("  ya-disk-public://some key  ");
        assert_eq!(descriptor.public_key, "ya-disk-public://some+key");
        assert_eq!(descriptor.path, None);

        let descriptor = yandex("YA-DISK-PUBLIC://abc:///");
        assert_eq!(descriptor.public_key, "ya-disk-public://abc");
        assert_eq!(descriptor.path, None);
    }

    #[test]
    fn test_pseudo_url_empty_key() {
        assert!(parse_yandex_pseudo_url("ya-disk-public://").is_none());
        assert!(parse_yandex_pseudo_url("ya-disk-public://  :/docs").is_none());
        assert!(parse_yandex_pseudo_url("https://yadi.sk/d/x").is_none());
    }

    #[test]
    fn test_pseudo_url_key_with_base64_padding() {
        let descriptor = yandex("ya-disk-public://r7Q/a+b=:/Lectures/week 1.pdf");
        assert_eq!(descriptor.public_key, "ya-disk-public://r7Q/a+b=");
        assert_eq!(descriptor.path.as_deref(), Some("/Lectures/week 1.pdf"));
    }

    #[test]
    fn test_docs_yandex_wrapper_matches_pseudo_url() {
        let inner = "ya-disk-public://KEY:/a/b/c.pdf";
        let wrapped = format!(
            "https://docs.yandex.ru/docs/view?url={}&name=c.pdf",
            urlencoding::encode(inner)
        );
        assert_eq!(yandex(&wrapped), yandex(inner));
    }

    #[test]
    fn test_docs_yandex_wrapping_disk_link() {
        let wrapped = format!(
            "https://docs.yandex.ru/docs/view?url={}",
            urlencoding::encode("https://disk.yandex.ru/d/abcdef")
        );
        let descriptor = yandex(&wrapped);
        assert_eq!(descriptor.public_key, "https://disk.yandex.ru/d/abcdef");
        assert_eq!(descriptor.path, None);
    }

    #[test]
    fn test_nested_docs_yandex_wrappers_are_bounded() {
        let wrap = |layers: usize| {
            (0..layers).fold("https://disk.yandex.ru/d/deep".to_string(), |inner, _| {
                format!(
                    "https://docs.yandex.ru/docs/view?url={}",
                    urlencoding::encode(&inner)
                )
            })
        };

        let descriptor = yandex(&wrap(MAX_WRAPPER_DEPTH));
        assert_eq!(descriptor.public_key, "https://disk.yandex.ru/d/deep");

        let too_deep = wrap(MAX_WRAPPER_DEPTH + 1);
        assert_eq!(error_text(&too_deep), "Unsupported Yandex link format");
        assert!(resolve_yandex_source(&too_deep).is_none());
    }

    #[test]
    fn test_docs_yandex_without_url_param() {
        let descriptor = yandex("https://docs.yandex.ru/docs/view?name=x.pdf");
        assert_eq!(
            descriptor.public_key,
            "https://docs.yandex.ru/docs/view?name=x.pdf"
        );
    }

    #[test]
    fn test_docs_yandex_wrapping_foreign_link() {
        let wrapped = format!(
            "https://docs.yandex.ru/docs/view?url={}",
            urlencoding::encode("https://example.com/file.pdf")
        );
        assert_eq!(error_text(&wrapped), "Unsupported Yandex link format");
    }

    #[test]
    fn test_disk_links_are_opaque_keys() {
        for raw in [
            "https://yadi.sk/d/abc",
            "https://disk.yandex.ru/d/abc",
            "https://disk.360.yandex.ru/d/abc",
        ] {
            let descriptor = yandex(raw);
            assert_eq!(descriptor.public_key, raw);
            assert_eq!(descriptor.path, None);
        }
        assert_eq!(yandex("disk.yandex.com/d/xyz").public_key, "https://disk.yandex.com/d/xyz");
    }

    #[test]
    fn test_invalid_urls() {
        assert_eq!(error_text("ftp://example.com/file"), "Invalid URL");
        assert_eq!(error_text("http://"), "Invalid URL");
        assert_eq!(error_text(""), "Invalid URL");
    }

    #[test]
    fn test_google_workspace_exports() {
        assert_eq!(
            resolve_source("https://docs.google.com/document/d/DOC_id-1/edit").unwrap(),
            ResolvedSource::GoogleWorkspace {
                kind: WorkspaceKind::Document,
                id: "DOC_id-1".to_string()
            }
        );
        assert_eq!(
            resolve_source("https://docs.google.com/spreadsheets/d/S1/edit#gid=0").unwrap(),
            ResolvedSource::GoogleWorkspace {
                kind: WorkspaceKind::Spreadsheet,
                id: "S1".to_string()
            }
        );
        assert_eq!(
            resolve_source("https://docs.google.com/presentation/d/P1/view").unwrap(),
            ResolvedSource::GoogleWorkspace {
                kind: WorkspaceKind::Presentation,
                id: "P1".to_string()
            }
        );
        assert_eq!(
            WorkspaceKind::Presentation.export_path("P1"),
            "/presentation/d/P1/export/pdf"
        );
    }

    #[test]
    fn test_google_drive_file_ids() {
        assert_eq!(
            resolve_source("https://drive.google.com/file/d/F1le_Id/view?usp=sharing").unwrap(),
            ResolvedSource::GoogleDrive {
                file_id: "F1le_Id".to_string()
            }
        );
        assert_eq!(
            resolve_source("https://drive.google.com/open?id=ABC").unwrap(),
            ResolvedSource::GoogleDrive {
                file_id: "ABC".to_string()
            }
        );
        assert_eq!(
            error_text("https://drive.google.com/drive/folders/xyz"),
            "Unsupported Google Drive URL format"
        );
    }

    #[test]
    fn test_dropbox_rewrite() {
        let resolved = resolve_source("https://www.dropbox.com/s/abc/file.pdf?dl=0&raw=1&rlkey=a&rlkey=b&e=")
            .unwrap();
        let ResolvedSource::Direct(url) = resolved else {
            panic!("expected direct source");
        };
        assert_eq!(url.path(), "/s/abc/file.pdf");
        assert_eq!(url.query(), Some("rlkey=b&dl=1"));
    }

    #[test]
    fn test_github_blob_rewrite() {
        let resolved =
            resolve_source("https://github.com/owner/repo/blob/main/docs/notes.pdf").unwrap();
        assert_eq!(
            resolved,
            ResolvedSource::Direct(
                Url::parse("https://raw.githubusercontent.com/owner/repo/main/docs/notes.pdf")
                    .unwrap()
            )
        );

        let tree = resolve_source("https://github.com/owner/repo/tree/main/docs").unwrap();
        assert_eq!(
            tree,
            ResolvedSource::Direct(Url::parse("https://github.com/owner/repo/tree/main/docs").unwrap())
        );
    }

    #[test]
    fn test_generic_url_defaults_to_https() {
        assert_eq!(
            resolve_source("example.com/notes.pdf").unwrap(),
            ResolvedSource::Direct(Url::parse("https://example.com/notes.pdf").unwrap())
        );
    }

    #[test]
    fn test_resolve_yandex_source_rejects_other_providers() {
        assert!(resolve_yandex_source("https://example.com/a.pdf").is_none());
        assert!(resolve_yandex_source("ya-disk-public://k:/x").is_some());
    }
}
