//! HTTP API integration tests (router driven with `oneshot`)

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use helpers::{wait_for_terminal, GatedBuilder, TestEnv, SINGLE_PHOTO, TWO_YEARS};
use http_body_util::BodyExt;
use photomgr_admin::services::CatalogBuilder;
use photomgr_admin::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(env: &TestEnv) -> (AppState, Arc<GatedBuilder>) {
    let builder = Arc::new(GatedBuilder::default());
    let state = env.app_state(builder.clone() as Arc<dyn CatalogBuilder>);
    (state, builder)
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_get_photos_returns_manifest_bytes() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, _) = app(&env);

    let response = build_router(state).oneshot(get("/api/photos")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), SINGLE_PHOTO.as_bytes());
}

#[tokio::test]
async fn test_get_photos_without_manifest_is_server_error() {
    let env = TestEnv::empty();
    let (state, _) = app(&env);

    let (status, body) = send(&state, get("/api/photos")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["code"], "IO_ERROR");
}

#[tokio::test]
async fn test_put_photo_updates_record() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, _) = app(&env);

    let (status, body) = send(
        &state,
        json_request("PUT", "/api/photos/DSC_0001.jpg", json!({"is_hidden": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()["status"], "success");
    let catalog = env.catalog();
    let record = catalog.find("DSC_0001.jpg").unwrap();
    assert!(record.is_hidden());
    assert_eq!(record.alt(), Some("sunset"));
}

#[tokio::test]
async fn test_put_unknown_photo_is_404() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, _) = app(&env);

    let (status, body) = send(
        &state,
        json_request("PUT", "/api/photos/nope.jpg", json!({"alt": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(body["error"]["message"].as_str().unwrap().contains("nope.jpg"));
    assert_eq!(env.manifest_text(), SINGLE_PHOTO);
}

#[tokio::test]
async fn test_put_on_corrupt_manifest_is_server_error() {
    let env = TestEnv::new("[{");
    let (state, _) = app(&env);

    let (status, body) = send(
        &state,
        json_request("PUT", "/api/photos/a.jpg", json!({"alt": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["code"], "MANIFEST_PARSE_ERROR");
}

#[tokio::test]
async fn test_delete_photo() {
    let env = TestEnv::new(TWO_YEARS);
    env.add_image("2024", "b.jpg", b"jpeg");
    let (state, _) = app(&env);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/photos/b.jpg")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(env.catalog().find("b.jpg").is_none());
    assert!(!env.images_root.join("2024").join("b.jpg").exists());

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/photos/b.jpg")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&state, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_update_reports_success_with_partial_failures() {
    let env = TestEnv::new(TWO_YEARS);
    let (state, _) = app(&env);

    let (status, body) = send(
        &state,
        json_request(
            "POST",
            "/api/photos/batch",
            json!({"filenames": ["a.jpg", "ghost.jpg"], "updates": {"alt": "batch"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["updated"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(env.catalog().find("a.jpg").unwrap().alt(), Some("batch"));
}

#[tokio::test]
async fn test_rebuild_start_then_conflict_then_completion() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, builder) = app(&env);

    let (status, body) = send(&state, json_request("POST", "/api/rebuild", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "started");

    let (status, body) = send(&state, get("/api/rebuild/status")).await;
    assert_eq!(status, StatusCode::OK);
    let running: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(running["status"], "running");
    assert!(running["start_time"].is_string());
    assert!(running.get("end_time").is_none());

    let (status, body) = send(&state, json_request("POST", "/api/rebuild", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, body) = send(&state, get("/api/rebuild/status")).await;
    let after_conflict: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(after_conflict["start_time"], running["start_time"]);
    assert_eq!(after_conflict["logs"], running["logs"]);

    builder.release();
    wait_for_terminal(&state.rebuild).await;

    let (_, body) = send(&state, get("/api/rebuild/status")).await;
    let done: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(done["status"], "completed");
    assert_eq!(done["progress"], 100);
    assert!(done["end_time"].is_string());
}

#[tokio::test]
async fn test_rebuild_status_when_idle() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, _) = app(&env);

    let (status, body) = send(&state, get("/api/rebuild/status")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "idle");
    assert_eq!(body["progress"], 0);
    assert_eq!(body["logs"], json!([]));
}

#[tokio::test]
async fn test_rebuild_events_stream_is_sse() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, _) = app(&env);

    let response = build_router(state)
        .oneshot(get("/api/rebuild/events"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/event-stream"));
}

#[tokio::test]
async fn test_images_are_served_with_cache_header() {
    let env = TestEnv::new(SINGLE_PHOTO);
    env.add_image("2024", "DSC_0001.jpg", b"jpeg-bytes");
    let (state, _) = app(&env);

    let response = build_router(state)
        .oneshot(get("/api/images/2024/DSC_0001.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=86400"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"jpeg-bytes");
}

#[tokio::test]
async fn test_upload_stores_file_under_inferred_year() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, _) = app(&env);

    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"DSC_2019_0042.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nraw-image\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/photos/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["year"], "2019");
    assert_eq!(body["filename"], "DSC_2019_0042.jpg");

    let stored = std::fs::read(env.images_root.join("2019").join("DSC_2019_0042.jpg")).unwrap();
    assert_eq!(stored, b"raw-image");
}

#[tokio::test]
async fn test_upload_accepts_camera_sized_file() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, _) = app(&env);

    let image = vec![0xAB_u8; 3 * 1024 * 1024];
    let boundary = "XBOUNDARYX";
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"DSC_2019_big.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
        b = boundary
    )
    .into_bytes();
    body.extend_from_slice(&image);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/photos/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::OK, "body: {}", String::from_utf8_lossy(&body));

    let stored = std::fs::read(env.images_root.join("2019").join("DSC_2019_big.jpg")).unwrap();
    assert_eq!(stored.len(), image.len());
}

#[tokio::test]
async fn test_upload_without_photo_field_is_bad_request() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, _) = app(&env);

    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/photos/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, _) = send(&state, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let env = TestEnv::new(SINGLE_PHOTO);
    let (state, _) = app(&env);

    let (status, body) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "photomgr-admin");
    assert_eq!(body["rebuild"], "idle");
}
