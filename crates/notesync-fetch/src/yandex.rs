//! Yandex Disk public API client
//!
//! Read-only, unauthenticated access to resources published with a public
//! key. Two endpoints are used:
//!
//! - `GET /v1/disk/public/resources` for metadata and folder listings
//! - `GET /v1/disk/public/resources/download` for a short-lived `href`
//!   that serves the file bytes
//!
//! A `404` from either endpoint is "not found at this path" and returned as
//! `None`, since callers retry at the resource root.
//!
//! ## Design Notes
//!
//! - Listings are capped at [`LISTING_LIMIT`] items per folder; no paging.
//! - Folder trees are walked with an explicit stack, bounded by
//!   [`MAX_FOLDER_DEPTH`], and emit files in the same depth-first order
//!   the listing returns them.

use std::path::Path;

use notesync_core::domain::{
    make_safe_relative_path, DownloadOptions, FetchError, FilePreview, FolderProgress,
};
use notesync_core::ports::{EntryOutcome, FolderEntry, ProgressCallback, StagedFile};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::policy::skip_reason;
use crate::staging::{extension_of, stage_bytes};
use crate::transport::{check_cancel, HttpTransport};

/// Production API host
pub const YANDEX_API_BASE_URL: &str = "https://cloud-api.yandex.net";

/// Items requested per metadata call
pub const LISTING_LIMIT: u32 = 200;

/// Deepest folder level descended into below the root
pub const MAX_FOLDER_DEPTH: usize = 8;

// ============================================================================
// API response types
// ============================================================================

/// Resource type reported by the metadata endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Dir,
    #[default]
    #[serde(other)]
    Other,
}

/// Metadata of one public resource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicResource {
    #[serde(rename = "type", default)]
    pub kind: ResourceKind,
    pub path: Option<String>,
    pub name: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub modified: Option<String>,
    #[serde(rename = "_embedded")]
    pub embedded: Option<EmbeddedItems>,
}

/// Children of a folder resource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddedItems {
    #[serde(default)]
    pub items: Vec<PublicResource>,
}

impl PublicResource {
    pub fn is_dir(&self) -> bool {
        self.kind == ResourceKind::Dir
    }

    /// Non-empty path, if any
    fn known_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct DownloadLink {
    href: Option<String>,
}

enum Pending {
    Listing { path: Option<String>, depth: usize },
    File(PublicResource),
}

// ============================================================================
// YandexDiskClient
// ============================================================================

/// Client for the Yandex Disk public resources API
#[derive(Debug, Clone)]
pub struct YandexDiskClient {
    transport: HttpTransport,
    base_url: String,
}

impl YandexDiskClient {
    /// Creates a client against the production API
    pub fn new(transport: HttpTransport) -> Self {
        Self::with_base_url(transport, YANDEX_API_BASE_URL)
    }

    /// Creates a client with a custom API base URL (useful for testing)
    pub fn with_base_url(transport: HttpTransport, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, suffix: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
        Url::parse_with_params(&format!("{}{suffix}", self.base_url), params)
            .map_err(|_| FetchError::download("Invalid URL"))
    }

    /// Fetches metadata of a resource, `None` on 404
    ///
    /// # Arguments
    /// * `public_key` - Public key or public URL of the shared resource
    /// * `path` - Path inside the resource; `None` for its root
    pub async fn get_resource(
        &self,
        public_key: &str,
        path: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<PublicResource>, FetchError> {
        check_cancel(cancel)?;
        let limit = LISTING_LIMIT.to_string();
        let mut params = vec![("public_key", public_key), ("limit", limit.as_str())];
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            params.push(("path", path));
        }
        let url = self.endpoint("/v1/disk/public/resources", &params)?;

        let response = self.transport.get(&url, cancel).await?;
        if response.status == 404 {
            debug!(?path, "Yandex resource not found");
            return Ok(None);
        }
        let response = response.error_for_status()?;

        serde_json::from_slice(&response.body)
            .map(Some)
            .map_err(|_| FetchError::download("Yandex Disk returned invalid response"))
    }

    /// Lists every file below `path`, descending into sub-folders
    ///
    /// A missing root yields an empty list; a file root yields itself.
    #[tracing::instrument(skip_all, fields(public_key = %public_key, path = ?path))]
    pub async fn collect_files(
        &self,
        public_key: &str,
        path: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<PublicResource>, FetchError> {
        let mut files = Vec::new();
        let mut stack = vec![Pending::Listing {
            path: path.map(str::to_string),
            depth: 0,
        }];

        while let Some(next) = stack.pop() {
            let (path, depth) = match next {
                Pending::File(resource) => {
                    files.push(resource);
                    continue;
                }
                Pending::Listing { path, depth } => (path, depth),
            };

            check_cancel(cancel)?;
            if depth > MAX_FOLDER_DEPTH {
                warn!(?path, "Folder nesting too deep, not descending");
                continue;
            }

            let Some(resource) = self.get_resource(public_key, path.as_deref(), cancel).await?
            else {
                continue;
            };

            match resource.kind {
                ResourceKind::File => files.push(resource),
                ResourceKind::Dir => {
                    let items = resource.embedded.map(|e| e.items).unwrap_or_default();
                    for item in items.into_iter().rev() {
                        match item.kind {
                            ResourceKind::File => stack.push(Pending::File(item)),
                            ResourceKind::Dir => {
                                if let Some(child) = item.known_path() {
                                    stack.push(Pending::Listing {
                                        path: Some(child.to_string()),
                                        depth: depth + 1,
                                    });
                                }
                            }
                            ResourceKind::Other => {}
                        }
                    }
                }
                ResourceKind::Other => {}
            }
        }

        debug!(count = files.len(), "Collected Yandex folder files");
        Ok(files)
    }

    /// One request for a download `href`; `None` on 404 or a missing `href`
    async fn download_href(
        &self,
        public_key: &str,
        path: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, FetchError> {
        check_cancel(cancel)?;
        let mut params = vec![("public_key", public_key)];
        if let Some(path) = path {
            params.push(("path", path));
        }
        let url = self.endpoint("/v1/disk/public/resources/download", &params)?;

        let response = self.transport.get(&url, cancel).await?;
        if response.status == 404 {
            return Ok(None);
        }
        let response = response.error_for_status()?;

        let link: DownloadLink = serde_json::from_slice(&response.body)
            .map_err(|_| FetchError::download("Yandex Disk returned invalid response"))?;
        Ok(link.href.filter(|href| !href.is_empty()))
    }

    /// Downloads the bytes of a public resource
    ///
    /// When no link is offered for `path`, the request is repeated at the
    /// resource root.
    pub async fn download(
        &self,
        public_key: &str,
        path: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let path = path.filter(|p| !p.is_empty());

        let mut href = self.download_href(public_key, path, cancel).await?;
        if href.is_none() && path.is_some() {
            debug!(?path, "No download link at path, retrying at root");
            href = self.download_href(public_key, None, cancel).await?;
        }
        let href =
            href.ok_or_else(|| FetchError::download("Yandex Disk did not provide direct download URL"))?;

        let url = Url::parse(&href).map_err(|_| FetchError::download("Invalid URL"))?;
        self.transport.fetch_ok(&url, cancel).await
    }

    /// Downloads every file of a public folder into `staging_dir`
    ///
    /// Entries are fetched one at a time in listing order and returned
    /// sorted by local path, case-insensitive. A failed entry is recorded
    /// and the walk continues; cancellation aborts it and drops everything
    /// staged so far.
    ///
    /// # Arguments
    /// * `root_path` - Folder path used to derive local relative paths
    #[tracing::instrument(skip_all, fields(public_key = %public_key, root = ?root_path))]
    pub async fn download_folder(
        &self,
        public_key: &str,
        root_path: Option<&str>,
        options: &DownloadOptions,
        staging_dir: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FolderEntry>, FetchError> {
        let listed = self.collect_files(public_key, root_path, cancel).await?;
        let files: Vec<PublicResource> = listed
            .into_iter()
            .filter(|r| r.kind == ResourceKind::File && r.known_path().is_some())
            .collect();
        let total = files.len();
        info!(total, "Downloading Yandex folder");

        if let Some(report) = &progress {
            report(FolderProgress::started(total));
        }

        let mut entries = Vec::with_capacity(total);
        for (index, file) in files.into_iter().enumerate() {
            check_cancel(cancel)?;

            let remote_path = file.path.clone().unwrap_or_default();
            let local_relative_path = make_safe_relative_path(&remote_path, root_path);
            let name = file.name.clone().unwrap_or_default();
            let modified_at = file.modified.clone().filter(|m| !m.is_empty());

            let outcome = match skip_reason(&name, file.mime_type.as_deref(), file.size, options) {
                Some(reason) => {
                    debug!(path = %remote_path, %reason, "Skipping folder entry");
                    EntryOutcome::Skipped(reason)
                }
                None => match self
                    .stage_entry(public_key, &remote_path, &name, staging_dir, cancel)
                    .await
                {
                    Ok(staged) => EntryOutcome::Downloaded(staged),
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => {
                        warn!(path = %remote_path, error = %e, "Folder entry download failed");
                        EntryOutcome::Failed(e.to_string())
                    }
                },
            };

            if let Some(report) = &progress {
                report(FolderProgress {
                    processed_count: index + 1,
                    total_count: total,
                    latest_file: Some(FilePreview {
                        remote_path: remote_path.clone(),
                        local_relative_path: local_relative_path.clone(),
                        modified_at: modified_at.clone(),
                        size_bytes: file.size,
                        mime_type: file.mime_type.clone(),
                    }),
                });
            }

            entries.push(FolderEntry {
                remote_path,
                local_relative_path,
                modified_at,
                size_bytes: file.size,
                mime_type: file.mime_type,
                outcome,
            });
        }

        entries.sort_by_key(|entry| entry.local_relative_path.to_lowercase());
        Ok(entries)
    }

    async fn stage_entry(
        &self,
        public_key: &str,
        remote_path: &str,
        name: &str,
        staging_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<StagedFile, FetchError> {
        let data = self.download(public_key, Some(remote_path), cancel).await?;
        stage_bytes(&data, staging_dir, extension_of(name).unwrap_or("bin")).await
    }
}
