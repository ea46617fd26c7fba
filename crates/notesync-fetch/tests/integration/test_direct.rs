//! Plain HTTP downloads

use notesync_core::ports::{IRemoteSource, RemoteFetch};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_direct_download_staged_as_pdf() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/notes/latest"))
        .and(header("user-agent", "NotesSyncLinux/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let fetch = source
        .fetch(
            &format!("{}/notes/latest", server.uri()),
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("direct download");

    assert_eq!(common::single_bytes(&fetch), b"%PDF-1.4");
    let RemoteFetch::Single(staged) = fetch else {
        unreachable!()
    };
    assert_eq!(
        staged.path().extension().and_then(|e| e.to_str()),
        Some("pdf")
    );
}

#[tokio::test]
async fn test_direct_download_requires_success_status() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/missing.pdf"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let err = source
        .fetch(
            &format!("{}/missing.pdf", server.uri()),
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "HTTP error 404");
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unreachable_host_is_download_error() {
    let (_server, source, staging) = common::setup_source().await;

    let err = source
        .fetch(
            "http://127.0.0.1:9/never.pdf",
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(!err.is_cancelled());
    assert!(matches!(
        err,
        notesync_core::domain::FetchError::Download(_)
    ));
}

#[tokio::test]
async fn test_unsupported_scheme() {
    let (_server, source, staging) = common::setup_source().await;

    let err = source
        .fetch(
            "ftp://example.com/a.pdf",
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid URL");
}
