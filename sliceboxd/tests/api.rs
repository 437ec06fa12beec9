//! Integration tests for the HTTP endpoints.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use slicebox_core::config::ServiceConfig;
use slicebox_core::testing::{MemoryRemote, RemoteOp, ScriptedMediaTool};
use slicebox_core::MemoryCursorStore;
use sliceboxd::{create_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestServer {
    router: axum::Router,
    remote: Arc<MemoryRemote>,
    scratch: TempDir,
}

impl TestServer {
    fn new(duration: f64) -> Self {
        let remote = Arc::new(MemoryRemote::new());
        let state = AppState::new(
            ServiceConfig::default(),
            remote.clone(),
            Arc::new(MemoryCursorStore::new()),
            Arc::new(ScriptedMediaTool::new(duration)),
        )
        .unwrap();
        Self {
            router: create_router(state),
            remote,
            scratch: TempDir::new().unwrap(),
        }
    }

    fn source_url(&self) -> String {
        let path = self.scratch.path().join("meeting.wav");
        std::fs::write(&path, b"RIFF....WAVE").unwrap();
        format!("file://{}", path.display())
    }
}

/// Helper to make JSON requests.
async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn liveness_endpoints() {
    let server = TestServer::new(10.0);

    let (status, body) = json_request(&server.router, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = json_request(&server.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, body) = json_request(&server.router, "GET", "/diag", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    for key in ["DBX_REFRESH_TOKEN", "DBX_APP_KEY", "DBX_APP_SECRET", "DBX_APP_FOLDER_NAME"] {
        assert!(body["env_present"][key].is_boolean(), "missing {key}");
    }
}

#[tokio::test]
async fn cursor_round_trip_and_removal() {
    let server = TestServer::new(10.0);

    let (status, body) = json_request(&server.router, "POST", "/cursor/get", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"cursor": null}));

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/cursor/set",
        Some(json!({"cursor": "AAA"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, body) = json_request(
        &server.router,
        "POST",
        "/cursor/get",
        Some(json!({"key": "default"})),
    )
    .await;
    assert_eq!(body, json!({"cursor": "AAA"}));

    json_request(
        &server.router,
        "POST",
        "/cursor/set",
        Some(json!({"key": "default", "cursor": null})),
    )
    .await;
    let (_, body) = json_request(&server.router, "POST", "/cursor/get", Some(json!({}))).await;
    assert_eq!(body, json!({"cursor": null}));
}

#[tokio::test]
async fn cursor_set_accepts_non_string_values() {
    let server = TestServer::new(10.0);

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/cursor/set",
        Some(json!({"key": "page", "cursor": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = json_request(
        &server.router,
        "POST",
        "/cursor/get",
        Some(json!({"key": "page"})),
    )
    .await;
    assert_eq!(body, json!({"cursor": "42"}));
}

#[tokio::test]
async fn shared_link_requires_path() {
    let server = TestServer::new(10.0);

    let (status, body) = json_request(&server.router, "POST", "/shared-link", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_path");
}

#[tokio::test]
async fn shared_link_falls_back_to_existing_link() {
    let server = TestServer::new(10.0);
    server.remote.add_file("/rec/a.wav", b"audio").await;
    server
        .remote
        .fail(RemoteOp::TemporaryLink, 401, "expired_access_token/..")
        .await;
    server
        .remote
        .add_shared_link("/rec/a.wav", "https://x/y?dl=0")
        .await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/shared-link",
        Some(json!({"path": "/rec/a.wav"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"url": "https://x/y?dl=1", "kind": "shared_existing"}));
}

#[tokio::test]
async fn shared_link_failure_is_bad_gateway() {
    let server = TestServer::new(10.0);

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/shared-link",
        Some(json!({"path": "/rec/missing.wav"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "shared_link_failed");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn list_changes_and_failure() {
    let server = TestServer::new(10.0);
    server.remote.fill_folder("/inbox", "rec", 2).await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/list-changes",
        Some(json!({"path": "/inbox"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    assert_eq!(body["entries"][0][".tag"], "file");
    assert_eq!(body["has_more"], false);
    assert_eq!(body["mode"], "app_folder");
    assert_eq!(body["normalized_path"], "/inbox");
    assert!(body["cursor"].is_string());

    server
        .remote
        .fail(RemoteOp::ListFolder, 500, "internal_error")
        .await;
    let (status, body) = json_request(&server.router, "POST", "/list-changes", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "list_changes_failed");
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let server = TestServer::new(10.0);
    let request = Request::builder()
        .method("POST")
        .uri("/cursor/set")
        .body(Body::from("{cursor:"))
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn split_audio_upload_distributes_pieces() {
    let server = TestServer::new(1000.0);
    let url = server.source_url();

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/split-audio-upload",
        Some(json!({"url": url, "max_files_per_dir": 2, "group_prefix": "standup"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "uploaded": [
                "/音檔/01/standup-001.wav",
                "/音檔/01/standup-002.wav",
                "/音檔/02/standup-003.wav"
            ],
            "count": 3
        })
    );
}

#[tokio::test]
async fn split_requires_a_source() {
    let server = TestServer::new(10.0);

    let (status, body) =
        json_request(&server.router, "POST", "/split-audio-upload", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_source");
}

#[tokio::test]
async fn split_rejects_invalid_shard_bounds() {
    let server = TestServer::new(10.0);
    let url = server.source_url();

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/split-audio-upload",
        Some(json!({"url": url, "max_dirs": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn unresolvable_path_is_bad_gateway() {
    let server = TestServer::new(10.0);

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/ensure-slices",
        Some(json!({"path": "/rec/missing.wav"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "cannot_get_temporary_link");
}

#[tokio::test]
async fn partial_upload_failure_reports_uploaded_pieces() {
    let server = TestServer::new(1000.0);
    server.remote.fail_uploads_after(2).await;
    let url = server.source_url();

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/split-audio-upload",
        Some(json!({"url": url})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "split_audio_upload_failed");
    assert_eq!(body["count"], 2);
    assert_eq!(
        body["uploaded"],
        json!(["/音檔/01/meeting-001.wav", "/音檔/01/meeting-002.wav"])
    );
}

#[tokio::test]
async fn ensure_slices_skips_then_uploads() {
    let server = TestServer::new(100.0);
    let url = server.source_url();

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/ensure-slices",
        Some(json!({"url": url})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"uploaded": ["/音檔/01/meeting-001.wav"], "count": 1}));

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/ensure-slices",
        Some(json!({"url": url})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"skipped": true, "reason": "group_exists"}));
    assert_eq!(server.remote.calls(RemoteOp::Upload).await, 1);
}
