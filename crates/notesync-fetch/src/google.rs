//! Google Drive and Google Docs downloads
//!
//! Docs, Sheets and Slides documents are fetched straight from their PDF
//! export endpoint. Drive files go through `uc?export=download`, which
//! answers large or unscanned files with an HTML interstitial; the
//! confirmation token is scraped from it and the request is repeated once.

use std::sync::LazyLock;

use notesync_core::domain::FetchError;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::resolver::WorkspaceKind;
use crate::staging::looks_like_html;
use crate::transport::{check_cancel, HttpResponse, HttpTransport};

/// Production Drive host
pub const DRIVE_BASE_URL: &str = "https://drive.google.com";

/// Production Docs host
pub const DOCS_BASE_URL: &str = "https://docs.google.com";

static COOKIE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"download_warning[^=]*=([^;]+)").expect("valid regex"));
static QUERY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"confirm=([0-9A-Za-z_]+)&").expect("valid regex"));
static FORM_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="confirm" value="([0-9A-Za-z_]+)""#).expect("valid regex"));

/// Client for Google Drive file links and Docs exports
#[derive(Debug, Clone)]
pub struct GoogleDriveClient {
    transport: HttpTransport,
    drive_base: String,
    docs_base: String,
}

impl GoogleDriveClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self::with_base_urls(transport, DRIVE_BASE_URL, DOCS_BASE_URL)
    }

    /// Creates a client with custom Drive and Docs hosts (useful for testing)
    pub fn with_base_urls(
        transport: HttpTransport,
        drive_base: impl Into<String>,
        docs_base: impl Into<String>,
    ) -> Self {
        let drive_base: String = drive_base.into();
        let docs_base: String = docs_base.into();
        Self {
            transport,
            drive_base: drive_base.trim_end_matches('/').to_string(),
            docs_base: docs_base.trim_end_matches('/').to_string(),
        }
    }

    /// Downloads a Docs/Sheets/Slides document as PDF
    #[instrument(skip(self, cancel))]
    pub async fn export_workspace(
        &self,
        kind: WorkspaceKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let url = Url::parse(&format!("{}{}", self.docs_base, kind.export_path(id)))
            .map_err(|_| FetchError::download("Invalid URL"))?;
        self.transport.fetch_ok(&url, cancel).await
    }

    /// Downloads a Drive file, passing the virus-scan interstitial if shown
    #[instrument(skip(self, cancel))]
    pub async fn download_file(
        &self,
        file_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        check_cancel(cancel)?;

        let first = self.transport.get(&self.uc_url(file_id, None)?, cancel).await?;
        if !looks_like_html(&first.body, &first.headers) {
            return Ok(first.error_for_status()?.body);
        }

        let token = extract_confirm_token(&first)
            .ok_or_else(|| FetchError::download("Google Drive confirmation token not found"))?;
        debug!("Retrying Drive download with confirmation token");

        let second = self
            .transport
            .get(&self.uc_url(file_id, Some(&token))?, cancel)
            .await?;
        if looks_like_html(&second.body, &second.headers) {
            return Err(FetchError::download(
                "Google Drive returned HTML instead of file content",
            ));
        }
        Ok(second.error_for_status()?.body)
    }

    fn uc_url(&self, file_id: &str, confirm: Option<&str>) -> Result<Url, FetchError> {
        let mut params = vec![("export", "download"), ("id", file_id)];
        if let Some(token) = confirm {
            params.push(("confirm", token));
        }
        Url::parse_with_params(&format!("{}/uc", self.drive_base), &params)
            .map_err(|_| FetchError::download("Invalid URL"))
    }
}

/// Finds the download confirmation token in an interstitial response
///
/// Looked up in order: a `download_warning*` cookie, a `confirm=` link in
/// the page, a hidden `confirm` form field.
pub fn extract_confirm_token(response: &HttpResponse) -> Option<String> {
    if let Some(cookie) = response.header("set-cookie") {
        if let Some(caps) = COOKIE_TOKEN.captures(cookie) {
            return Some(caps[1].to_string());
        }
    }

    let text = String::from_utf8_lossy(&response.body);
    [&*QUERY_TOKEN, &*FORM_TOKEN]
        .into_iter()
        .find_map(|pattern| pattern.captures(&text))
        .map(|caps| html_unescape(&caps[1]))
}

/// Decodes the handful of HTML entities a token can carry
fn html_unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
