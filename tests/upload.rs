//! Integration tests for media uploads: validation before the network,
//! multipart shape, progress and embed markup.

mod common;

use common::{app_state, capture_logs, dylan};
use parking_lot::Mutex;
use std::sync::Arc;
use userdesk::constants::MAX_UPLOAD_SIZE_BYTES;
use userdesk::http::{ErrorClass, ProgressCallback};
use userdesk::upload::{upload_file, MediaKind, UploadError, UploadFile};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn upload_response(url: &str, filename: &str, size: usize, mime: &str) -> serde_json::Value {
    serde_json::json!({
        "url": url,
        "filename": filename,
        "size": size,
        "type": mime,
    })
}

#[tokio::test]
async fn test_text_file_rejected_without_request() {
    let mock_server = MockServer::start().await;
    let state = app_state(&mock_server.uri());
    let (logs, _guard) = capture_logs();

    let err = upload_file(
        &state.gateway,
        UploadFile::new("notes.txt", "text/plain", "hello"),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, UploadError::UnsupportedType { .. }));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
    assert!(logs.contents().contains("only images and videos"));
}

#[tokio::test]
async fn test_oversized_file_rejected_without_request() {
    let mock_server = MockServer::start().await;
    let state = app_state(&mock_server.uri());

    let oversized = vec![0u8; (MAX_UPLOAD_SIZE_BYTES + 1024 * 1024) as usize];
    let err = upload_file(
        &state.gateway,
        UploadFile::new("huge.mp4", "video/mp4", oversized),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, UploadError::TooLarge { .. }));
    assert!(err.to_string().contains("100MB"));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_image_upload_sends_multipart_with_token() {
    let mock_server = MockServer::start().await;
    let state = app_state(&mock_server.uri());
    state.session.login(dylan(), "mock-token-12345").unwrap();

    let data = vec![7u8; 200 * 1024];
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("authorization", "Bearer mock-token-12345"))
        .and(body_string_contains(r#"name="file""#))
        .and(body_string_contains(r#"filename="cat.png""#))
        .and(body_string_contains("image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upload_response(
            "https://cdn.example.com/cat.png",
            "cat.png",
            data.len(),
            "image/png",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: ProgressCallback = Arc::new(move |percent| sink.lock().push(percent));

    let media = state
        .uploader
        .handle_file(UploadFile::new("cat.png", "image/png", data), Some(progress))
        .await
        .unwrap();

    assert_eq!(media.kind, MediaKind::Image);
    assert_eq!(
        media.markup,
        r#"<img src="https://cdn.example.com/cat.png" alt="cat.png" />"#
    );
    assert_eq!(media.response.size, 200 * 1024);
    assert!(!state.uploader.is_uploading());

    let seen = seen.lock();
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_video_upload_markup() {
    let mock_server = MockServer::start().await;
    let state = app_state(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upload_response(
            "https://cdn.example.com/clip.webm",
            "clip.webm",
            3,
            "video/webm",
        )))
        .mount(&mock_server)
        .await;

    let media = state
        .uploader
        .handle_file(UploadFile::new("clip.webm", "video/webm", vec![1u8, 2, 3]), None)
        .await
        .unwrap();

    assert_eq!(media.kind, MediaKind::Video);
    assert_eq!(
        media.markup,
        r#"<video controls width="100%"><source src="https://cdn.example.com/clip.webm" type="video/webm"></video>"#
    );
}

#[tokio::test]
async fn test_server_failure_is_classified() {
    let mock_server = MockServer::start().await;
    let state = app_state(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = state
        .uploader
        .handle_file(UploadFile::new("a.gif", "image/gif", vec![0u8; 16]), None)
        .await
        .unwrap_err();

    match err {
        UploadError::Gateway(e) => assert_eq!(e.class(), ErrorClass::ServerError),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!state.uploader.is_uploading());
}

#[tokio::test]
async fn test_drop_uploads_each_file_in_order() {
    let mock_server = MockServer::start().await;
    let state = app_state(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains(r#"filename="cat.png""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(upload_response(
            "https://cdn.example.com/cat.png",
            "cat.png",
            4,
            "image/png",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains(r#"filename="clip.webm""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(upload_response(
            "https://cdn.example.com/clip.webm",
            "clip.webm",
            3,
            "video/webm",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let results = state
        .uploader
        .handle_drop(
            vec![
                UploadFile::new("cat.png", "image/png", vec![1u8, 2, 3, 4]),
                UploadFile::new("notes.txt", "text/plain", "hello"),
                UploadFile::new("clip.webm", "video/webm", vec![1u8, 2, 3]),
            ],
            None,
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().kind, MediaKind::Image);
    assert!(matches!(results[1], Err(UploadError::UnsupportedType { .. })));
    assert_eq!(results[2].as_ref().unwrap().kind, MediaKind::Video);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    assert!(!state.uploader.is_uploading());
}
