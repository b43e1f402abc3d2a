//! Health and readiness probe tests.

use axum::http::StatusCode;

use super::common::TestApp;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert!(response.body["version"].is_string());
}

#[tokio::test]
async fn test_ready_with_memory_store() {
    let app = TestApp::new();
    let response = app.get("/ready", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ready");
}

#[tokio::test]
async fn test_landing_page() {
    let app = TestApp::new();
    let response = app.get("/", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.as_str().unwrap().contains("MindWell"));
}
