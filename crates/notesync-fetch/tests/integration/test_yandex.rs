//! Yandex Disk public resources: single files, folder trees, fallbacks,
//! skip policy and cancellation

use notesync_core::domain::{DownloadOptions, FetchError};
use notesync_core::ports::{EntryOutcome, IRemoteSource, RemoteFetch, SkipReason};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, PUBLIC_KEY};

fn folder(fetch: RemoteFetch) -> Vec<notesync_core::ports::FolderEntry> {
    match fetch {
        RemoteFetch::Folder(entries) => entries,
        RemoteFetch::Single(_) => panic!("expected a folder"),
    }
}

#[tokio::test]
async fn test_folder_tree_is_collected_and_sorted() {
    let (server, source, staging) = common::setup_source().await;

    common::mount_metadata(
        &server,
        Some("/Course"),
        common::dir_listing(
            "/Course",
            vec![
                common::file_item("/Course/b.pdf", 3, "application/pdf"),
                common::dir_item("/Course/Week1"),
                common::file_item("/Course/A.pdf", 3, "application/pdf"),
            ],
        ),
    )
    .await;
    common::mount_metadata(
        &server,
        Some("/Course/Week1"),
        common::dir_listing(
            "/Course/Week1",
            vec![common::file_item("/Course/Week1/notes.pdf", 5, "application/pdf")],
        ),
    )
    .await;
    common::mount_file(&server, "/Course/b.pdf", b"bbb").await;
    common::mount_file(&server, "/Course/A.pdf", b"aaa").await;
    common::mount_file(&server, "/Course/Week1/notes.pdf", b"notes").await;

    let (progress, seen) = common::recording_progress();
    let fetch = source
        .fetch(
            &format!("{PUBLIC_KEY}:/Course"),
            &common::default_options(),
            staging.path(),
            Some(progress),
            &CancellationToken::new(),
        )
        .await
        .expect("folder fetch");

    let entries = folder(fetch);
    let paths: Vec<&str> = entries.iter().map(|e| e.local_relative_path.as_str()).collect();
    assert_eq!(paths, vec!["A.pdf", "b.pdf", "Week1/notes.pdf"]);
    assert_eq!(entries[2].remote_path, "/Course/Week1/notes.pdf");
    assert_eq!(entries[2].size_bytes, Some(5));
    assert_eq!(entries[2].mime_type.as_deref(), Some("application/pdf"));
    assert_eq!(
        entries[2].modified_at.as_deref(),
        Some("2024-03-01T10:00:00+00:00")
    );

    match &entries[2].outcome {
        EntryOutcome::Downloaded(staged) => {
            assert_eq!(std::fs::read(staged.path()).unwrap(), b"notes");
            assert_eq!(
                staged.path().extension().and_then(|e| e.to_str()),
                Some("pdf")
            );
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0].processed_count, 0);
    assert_eq!(seen[0].total_count, 3);
    assert!(seen[0].latest_file.is_none());
    // progress follows listing order, not the sorted result
    let first = seen[1].latest_file.as_ref().unwrap();
    assert_eq!(first.remote_path, "/Course/b.pdf");
    assert_eq!(seen[3].processed_count, 3);
}

#[tokio::test]
async fn test_single_file_uses_path_extension() {
    let (server, source, staging) = common::setup_source().await;

    common::mount_metadata(
        &server,
        Some("/report.docx"),
        serde_json::json!({ "type": "file", "path": "/report.docx" }),
    )
    .await;
    common::mount_file(&server, "/report.docx", b"docx-bytes").await;

    let fetch = source
        .fetch(
            &format!("{PUBLIC_KEY}:/report.docx"),
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("single fetch");

    assert_eq!(common::single_bytes(&fetch), b"docx-bytes");
    let RemoteFetch::Single(staged) = fetch else {
        unreachable!()
    };
    assert_eq!(
        staged.path().extension().and_then(|e| e.to_str()),
        Some("docx")
    );
}

#[tokio::test]
async fn test_download_link_retried_at_root() {
    let (server, source, staging) = common::setup_source().await;

    common::mount_metadata(
        &server,
        Some("/only-root.pdf"),
        serde_json::json!({ "type": "file", "path": "/only-root.pdf" }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .and(query_param("path", "/only-root.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .and(query_param_is_missing("path"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "href": format!("{}/files/root", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/root"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"root-bytes".to_vec()))
        .mount(&server)
        .await;

    let fetch = source
        .fetch(
            &format!("{PUBLIC_KEY}:/only-root.pdf"),
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("single fetch");

    assert_eq!(common::single_bytes(&fetch), b"root-bytes");
}

#[tokio::test]
async fn test_failed_single_download_falls_back_to_root_folder() {
    let (server, source, staging) = common::setup_source().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources"))
        .and(query_param("path", "/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .and(query_param("path", "/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .and(query_param_is_missing("path"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    common::mount_root_listing(&server, vec![common::file_item("/kept.pdf", 4, "application/pdf")])
        .await;
    common::mount_file(&server, "/kept.pdf", b"kept").await;

    let fetch = source
        .fetch(
            &format!("{PUBLIC_KEY}:/gone.pdf"),
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("fallback fetch");

    let entries = folder(fetch);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].local_relative_path, "kept.pdf");
    assert!(matches!(entries[0].outcome, EntryOutcome::Downloaded(_)));
}

#[tokio::test]
async fn test_failed_single_download_reports_original_error() {
    let (server, source, staging) = common::setup_source().await;

    common::mount_metadata(
        &server,
        Some("/a.pdf"),
        serde_json::json!({ "type": "file", "path": "/a.pdf" }),
    )
    .await;
    common::mount_metadata(&server, None, serde_json::json!({ "type": "file", "path": "/a.pdf" }))
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = source
        .fetch(
            &format!("{PUBLIC_KEY}:/a.pdf"),
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "HTTP error 500");
}

#[tokio::test]
async fn test_invalid_download_payload() {
    let (server, source, staging) = common::setup_source().await;

    common::mount_metadata(&server, None, serde_json::json!({ "type": "file" })).await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = source
        .fetch(
            PUBLIC_KEY,
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Yandex Disk returned invalid response");
}

#[tokio::test]
async fn test_missing_href_is_an_error() {
    let (server, source, staging) = common::setup_source().await;

    common::mount_metadata(&server, None, serde_json::json!({ "type": "file" })).await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "href": "" })))
        .mount(&server)
        .await;

    let err = source
        .fetch(
            PUBLIC_KEY,
            &common::default_options(),
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Yandex Disk did not provide direct download URL");
}

#[tokio::test]
async fn test_skip_policy_and_failed_entries() {
    let (server, source, staging) = common::setup_source().await;

    common::mount_root_listing(
        &server,
        vec![
            common::file_item("/big.pdf", 1_000, "application/pdf"),
            common::file_item("/lecture.mkv", 10, "application/octet-stream"),
            common::file_item("/broken.pdf", 10, "application/pdf"),
            common::file_item("/ok.txt", 2, "text/plain"),
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .and(query_param("path", "/big.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .and(query_param("path", "/lecture.mkv"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .and(query_param("path", "/broken.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    common::mount_file(&server, "/ok.txt", b"ok").await;

    let options = DownloadOptions {
        skip_video_files: true,
        skip_large_files: true,
        max_file_size_bytes: 100,
    };
    let fetch = source
        .fetch(
            PUBLIC_KEY,
            &options,
            staging.path(),
            None,
            &CancellationToken::new(),
        )
        .await
        .expect("folder fetch");

    let entries = folder(fetch);
    let by_path = |p: &str| entries.iter().find(|e| e.local_relative_path == p).unwrap();

    assert!(matches!(
        by_path("big.pdf").outcome,
        EntryOutcome::Skipped(SkipReason::TooLarge)
    ));
    assert!(matches!(
        by_path("lecture.mkv").outcome,
        EntryOutcome::Skipped(SkipReason::Video)
    ));
    match &by_path("broken.pdf").outcome {
        EntryOutcome::Failed(message) => assert_eq!(message, "HTTP error 503"),
        other => panic!("unexpected outcome {other:?}"),
    }
    match &by_path("ok.txt").outcome {
        EntryOutcome::Downloaded(staged) => assert_eq!(
            staged.path().extension().and_then(|e| e.to_str()),
            Some("txt")
        ),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_during_folder_stops_requests() {
    let (server, source, staging) = common::setup_source().await;

    common::mount_root_listing(
        &server,
        vec![
            common::file_item("/1.pdf", 1, "application/pdf"),
            common::file_item("/2.pdf", 1, "application/pdf"),
        ],
    )
    .await;
    common::mount_file(&server, "/1.pdf", b"1").await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/public/resources/download"))
        .and(query_param("path", "/2.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let progress: notesync_core::ports::ProgressCallback = std::sync::Arc::new(move |p| {
        if p.processed_count == 1 {
            trigger.cancel();
        }
    });

    let err = source
        .fetch(
            PUBLIC_KEY,
            &common::default_options(),
            staging.path(),
            Some(progress),
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    // the staged copy of the first file is dropped with the aborted fetch
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_already_cancelled_makes_no_requests() {
    let (server, source, staging) = common::setup_source().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = source
        .fetch(PUBLIC_KEY, &common::default_options(), staging.path(), None, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Cancelled));
}

#[tokio::test]
async fn test_listing_depth_is_bounded() {
    let (server, _source, _staging) = common::setup_source().await;

    // /d0 contains /d0/d1 ... down to /d0/.../d9
    let mut dir = String::from("/d0");
    for depth in 0..=9 {
        let child = format!("{dir}/d{}", depth + 1);
        let items = vec![
            common::file_item(&format!("{dir}/f{depth}.pdf"), 1, "application/pdf"),
            common::dir_item(&child),
        ];
        let mut mock = Mock::given(method("GET"))
            .and(path("/v1/disk/public/resources"))
            .and(query_param("path", dir.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(common::dir_listing(&dir, items)));
        if depth == 9 {
            mock = mock.expect(0);
        }
        mock.mount(&server).await;
        dir = child;
    }

    let client = notesync_fetch::yandex::YandexDiskClient::with_base_url(
        notesync_fetch::HttpTransport::with_defaults().unwrap(),
        server.uri(),
    );
    let files = client
        .collect_files(PUBLIC_KEY, Some("/d0"), &CancellationToken::new())
        .await
        .expect("listing");

    // depths 0 through 8 are listed
    assert_eq!(files.len(), 9);
    assert_eq!(files[0].path.as_deref(), Some("/d0/f0.pdf"));
}

#[tokio::test]
async fn test_fetch_file_on_demand() {
    let (server, source, staging) = common::setup_source().await;
    common::mount_file(&server, "/Course/Week1/slides.key", b"slides").await;

    let staged = source
        .fetch_file(
            &format!("{PUBLIC_KEY}:/Course"),
            "/Course/Week1/slides.key",
            staging.path(),
            &CancellationToken::new(),
        )
        .await
        .expect("on-demand fetch");

    assert_eq!(std::fs::read(staged.path()).unwrap(), b"slides");
    assert_eq!(
        staged.path().extension().and_then(|e| e.to_str()),
        Some("key")
    );
}

#[tokio::test]
async fn test_fetch_file_rejects_other_providers() {
    let (_server, source, staging) = common::setup_source().await;

    let err = source
        .fetch_file(
            "https://example.com/a.pdf",
            "/a.pdf",
            staging.path(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Single-file on-demand download is currently supported only for Yandex folder sources"
    );
}
