//! Public link source
//!
//! [`PublicLinkSource`] is the [`IRemoteSource`] implementation used by the
//! sync engine. It resolves each URL once, then hands off to the fetcher
//! for that provider.
//!
//! ## Yandex single file or folder
//!
//! A Yandex link does not say whether it names a file or a folder, so the
//! metadata at the resolved path decides. When it is not a folder the file
//! is downloaded directly; if that fails, the resource root is inspected
//! once more and synced as a folder when it turns out to be one. Only when
//! both fail is the original download error reported.

use std::path::Path;

use async_trait::async_trait;
use notesync_core::config::NetworkConfig;
use notesync_core::domain::{DownloadOptions, FetchError};
use notesync_core::ports::{IRemoteSource, ProgressCallback, RemoteFetch, StagedFile};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::google::GoogleDriveClient;
use crate::resolver::{resolve_source, resolve_yandex_source, ResolvedSource, ResourceDescriptor};
use crate::staging::{extension_of, stage_bytes};
use crate::transport::{check_cancel, HttpTransport};
use crate::yandex::{PublicResource, YandexDiskClient};

/// Extension for single files when the provider gives no better hint
const SINGLE_FILE_EXTENSION: &str = "pdf";

/// Extension for on-demand folder files without one
const FALLBACK_EXTENSION: &str = "bin";

/// Fetches content behind public Yandex Disk, Google, Dropbox, GitHub and
/// plain HTTP links
#[derive(Debug, Clone)]
pub struct PublicLinkSource {
    transport: HttpTransport,
    yandex: YandexDiskClient,
    google: GoogleDriveClient,
}

impl PublicLinkSource {
    /// Creates a source talking to the production endpoints
    pub fn new(config: &NetworkConfig) -> Result<Self, FetchError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self {
            yandex: YandexDiskClient::new(transport.clone()),
            google: GoogleDriveClient::new(transport.clone()),
            transport,
        })
    }

    /// Assembles a source from pre-built clients (useful for testing)
    pub fn with_clients(
        transport: HttpTransport,
        yandex: YandexDiskClient,
        google: GoogleDriveClient,
    ) -> Self {
        Self {
            transport,
            yandex,
            google,
        }
    }

    async fn fetch_yandex(
        &self,
        resource: &ResourceDescriptor,
        options: &DownloadOptions,
        staging_dir: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<RemoteFetch, FetchError> {
        let key = resource.public_key.as_str();
        let path = resource.path.as_deref();

        let metadata = self.yandex.get_resource(key, path, cancel).await?;
        if let Some(folder) = metadata.filter(PublicResource::is_dir) {
            let root = folder.path.or_else(|| resource.path.clone());
            let entries = self
                .yandex
                .download_folder(key, root.as_deref(), options, staging_dir, progress, cancel)
                .await?;
            return Ok(RemoteFetch::Folder(entries));
        }

        let single = async {
            let data = self.yandex.download(key, path, cancel).await?;
            let extension = path
                .and_then(extension_of)
                .unwrap_or(SINGLE_FILE_EXTENSION);
            stage_bytes(&data, staging_dir, extension).await
        }
        .await;

        match single {
            Ok(staged) => Ok(RemoteFetch::Single(staged)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                debug!(error = %e, "Single download failed, checking resource root");
                let root = self.yandex.get_resource(key, None, cancel).await?;
                match root.filter(PublicResource::is_dir) {
                    Some(folder) => {
                        let entries = self
                            .yandex
                            .download_folder(
                                key,
                                folder.path.as_deref(),
                                options,
                                staging_dir,
                                progress,
                                cancel,
                            )
                            .await?;
                        Ok(RemoteFetch::Folder(entries))
                    }
                    None => Err(e),
                }
            }
        }
    }
}

#[async_trait]
impl IRemoteSource for PublicLinkSource {
    #[instrument(skip(self, options, staging_dir, progress, cancel))]
    async fn fetch(
        &self,
        source_url: &str,
        options: &DownloadOptions,
        staging_dir: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<RemoteFetch, FetchError> {
        check_cancel(cancel)?;

        let data = match resolve_source(source_url)? {
            ResolvedSource::Yandex(resource) => {
                return self
                    .fetch_yandex(&resource, options, staging_dir, progress, cancel)
                    .await;
            }
            ResolvedSource::GoogleWorkspace { kind, id } => {
                self.google.export_workspace(kind, &id, cancel).await?
            }
            ResolvedSource::GoogleDrive { file_id } => {
                self.google.download_file(&file_id, cancel).await?
            }
            ResolvedSource::Direct(url) => self.transport.fetch_ok(&url, cancel).await?,
        };

        info!(bytes = data.len(), "Fetched single file");
        let staged = stage_bytes(&data, staging_dir, SINGLE_FILE_EXTENSION).await?;
        Ok(RemoteFetch::Single(staged))
    }

    #[instrument(skip(self, staging_dir, cancel))]
    async fn fetch_file(
        &self,
        source_url: &str,
        remote_path: &str,
        staging_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<StagedFile, FetchError> {
        check_cancel(cancel)?;

        let Some(resource) = resolve_yandex_source(source_url) else {
            warn!("On-demand download requested for a non-Yandex source");
            return Err(FetchError::download(
                "Single-file on-demand download is currently supported only for Yandex folder sources",
            ));
        };

        let data = self
            .yandex
            .download(&resource.public_key, Some(remote_path), cancel)
            .await?;
        let extension = extension_of(remote_path).unwrap_or(FALLBACK_EXTENSION);
        stage_bytes(&data, staging_dir, extension).await
    }
}
