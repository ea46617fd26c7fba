//! Shared test helpers for fetch integration tests
//!
//! Every provider client is pointed at one mock server, so a test mounts
//! only the endpoints it exercises.

use std::sync::{Arc, Mutex};

use notesync_core::domain::{DownloadOptions, FolderProgress};
use notesync_core::ports::{ProgressCallback, RemoteFetch};
use notesync_fetch::google::GoogleDriveClient;
use notesync_fetch::yandex::YandexDiskClient;
use notesync_fetch::{HttpTransport, PublicLinkSource};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Public key used by the Yandex helpers
pub const PUBLIC_KEY: &str = "ya-disk-public://TESTKEY";

/// Starts a mock server and returns a source whose every endpoint targets it,
/// plus a staging directory.
pub async fn setup_source() -> (MockServer, PublicLinkSource, TempDir) {
    let server = MockServer::start().await;
    let transport = HttpTransport::with_defaults().expect("transport");
    let source = PublicLinkSource::with_clients(
        transport.clone(),
        YandexDiskClient::with_base_url(transport.clone(), server.uri()),
        GoogleDriveClient::with_base_urls(transport, server.uri(), server.uri()),
    );
    let staging = TempDir::new().expect("staging dir");
    (server, source, staging)
}

/// Mounts a metadata response for `path` (`None` = root request)
pub async fn mount_metadata(server: &MockServer, resource_path: Option<&str>, body: serde_json::Value) {
    let mut mock = Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources"))
        .and(query_param("public_key", PUBLIC_KEY));
    mock = match resource_path {
        Some(p) => mock.and(query_param("path", p)),
        None => mock.and(query_param_is_missing("path")),
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a root folder listing, answered both without a `path` and with
/// `path=/` (the path the listing itself reports for the root)
pub async fn mount_root_listing(server: &MockServer, items: Vec<serde_json::Value>) {
    let body = dir_listing("/", items);
    mount_metadata(server, None, body.clone()).await;
    mount_metadata(server, Some("/"), body).await;
}

/// Mounts a download-link response for `path` pointing at `/files{path}`,
/// and the file content behind it.
pub async fn mount_file(server: &MockServer, resource_path: &str, content: &[u8]) {
    let href = format!("{}/files{}", server.uri(), resource_path);
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .and(query_param("path", resource_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "href": href })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/files{resource_path}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// File item as listed inside `_embedded.items`
pub fn file_item(path: &str, size: u64, mime: &str) -> serde_json::Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    serde_json::json!({
        "type": "file",
        "path": path,
        "name": name,
        "size": size,
        "mime_type": mime,
        "modified": "2024-03-01T10:00:00+00:00"
    })
}

/// Folder item as listed inside `_embedded.items`
pub fn dir_item(path: &str) -> serde_json::Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    serde_json::json!({ "type": "dir", "path": path, "name": name })
}

/// Folder metadata with the given children
pub fn dir_listing(path: &str, items: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "type": "dir",
        "path": path,
        "_embedded": { "items": items }
    })
}

/// Progress callback recording every report
pub fn recording_progress() -> (ProgressCallback, Arc<Mutex<Vec<FolderProgress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));
    (callback, seen)
}

pub fn default_options() -> DownloadOptions {
    DownloadOptions::default()
}

/// Reads the staged bytes of a single-file fetch
pub fn single_bytes(fetch: &RemoteFetch) -> Vec<u8> {
    match fetch {
        RemoteFetch::Single(staged) => std::fs::read(staged.path()).expect("staged file"),
        RemoteFetch::Folder(_) => panic!("expected a single file"),
    }
}
