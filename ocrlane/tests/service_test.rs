mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use ocrlane::api::create_router;

use common::{test_state, FixedOcr, RecordingSink};

async fn get(uri: &str, ocr: std::sync::Arc<FixedOcr>) -> axum::response::Response {
    let app = create_router(test_state(ocr, RecordingSink::new()));
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ocr_backend() {
    let response = get("/health", FixedOcr::new(&[])).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["ocr"]["status"], "available");
    assert_eq!(json["ocr"]["backend"], "test/fixed");
    assert_eq!(json["database"]["status"], "ok");
}

#[tokio::test]
async fn health_still_200_when_ocr_unavailable() {
    let response = get("/health", FixedOcr::unavailable()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ocr"]["status"], "unavailable");
}

#[tokio::test]
async fn openapi_lists_process_image() {
    let response = get("/openapi.json", FixedOcr::new(&[])).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let version = json["openapi"].as_str().unwrap();
    assert!(version.starts_with('3'), "got {version}");
    assert!(json["paths"]["/process-image"]["post"].is_object());
    assert!(json["paths"]["/health"]["get"].is_object());
}

#[tokio::test]
async fn landing_page_is_served() {
    let response = get("/", FixedOcr::new(&[])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
}
