//! Google Docs export and Google Drive download with confirmation

use notesync_core::ports::IRemoteSource;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

const DRIVE_LINK: &str = "https://drive.google.com/file/d/F1le/view?usp=sharing";

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn pdf(bytes: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/pdf")
        .set_body_bytes(bytes.to_vec())
}

#[tokio::test]
async fn test_docs_exported_as_pdf() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/d/Sheet_1/export"))
        .and(query_param("format", "pdf"))
        .respond_with(pdf(b"%PDF sheet"))
        .expect(1)
        .mount(&server)
        .await;

    let fetch = source
        .fetch(
            "https://docs.google.com/spreadsheets/d/Sheet_1/edit#gid=0",
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("export");

    assert_eq!(common::single_bytes(&fetch), b"%PDF sheet");
}

#[tokio::test]
async fn test_slides_export_path() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/presentation/d/P1/export/pdf"))
        .respond_with(pdf(b"%PDF slides"))
        .mount(&server)
        .await;

    let fetch = source
        .fetch(
            "https://docs.google.com/presentation/d/P1/edit",
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("export");

    assert_eq!(common::single_bytes(&fetch), b"%PDF slides");
}

#[tokio::test]
async fn test_drive_file_without_interstitial() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("export", "download"))
        .and(query_param("id", "F1le"))
        .respond_with(pdf(b"%PDF direct"))
        .expect(1)
        .mount(&server)
        .await;

    let fetch = source
        .fetch(
            DRIVE_LINK,
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("drive download");

    assert_eq!(common::single_bytes(&fetch), b"%PDF direct");
}

#[tokio::test]
async fn test_drive_confirmation_from_cookie() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param_is_missing("confirm"))
        .respond_with(
            html("<html><body>Virus scan warning</body></html>")
                .insert_header("set-cookie", "download_warning_123_F1le=Tok3n; Path=/uc"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "F1le"))
        .and(query_param("confirm", "Tok3n"))
        .respond_with(pdf(b"%PDF big"))
        .expect(1)
        .mount(&server)
        .await;

    let fetch = source
        .fetch(
            DRIVE_LINK,
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("drive download");

    assert_eq!(common::single_bytes(&fetch), b"%PDF big");
}

#[tokio::test]
async fn test_drive_confirmation_from_form() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param_is_missing("confirm"))
        .respond_with(html(
            r#"<!DOCTYPE html><form><input type="hidden" name="confirm" value="t_9"></form>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("confirm", "t_9"))
        .respond_with(pdf(b"%PDF form"))
        .mount(&server)
        .await;

    let fetch = source
        .fetch(
            "https://drive.google.com/open?id=F1le",
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("drive download");

    assert_eq!(common::single_bytes(&fetch), b"%PDF form");
}

#[tokio::test]
async fn test_drive_without_token() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .respond_with(html("<html>Sign in to continue</html>"))
        .mount(&server)
        .await;

    let err = source
        .fetch(
            DRIVE_LINK,
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Google Drive confirmation token not found");
}

#[tokio::test]
async fn test_drive_html_after_confirmation() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/uc"))
        .respond_with(html(r#"<html><a href="/uc?export=download&confirm=abc&id=F1le">"#))
        .mount(&server)
        .await;

    let err = source
        .fetch(
            DRIVE_LINK,
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Google Drive returned HTML instead of file content"
    );
}

#[tokio::test]
async fn test_drive_folder_link_is_unsupported() {
    let (_server, source, staging) = common::setup_source().await;

    let err = source
        .fetch(
            "https://drive.google.com/drive/folders/abc",
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Unsupported Google Drive URL format");
}
