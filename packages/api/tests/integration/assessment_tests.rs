//! Self-assessment scoring and ownership tests.

use axum::http::StatusCode;
use serde_json::json;

use super::common::TestApp;

#[tokio::test]
async fn test_instruments_are_public() {
    let app = TestApp::new();
    let response = app.get("/api/assessments/instruments", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let instruments = response.body.as_array().unwrap();
    assert_eq!(instruments.len(), 3);
    assert_eq!(instruments[0]["id"], "phq9");
    assert_eq!(instruments[0]["items"], 9);
    assert_eq!(instruments[2]["max_answer"], 5);
}

#[tokio::test]
async fn test_phq9_is_scored_and_flagged() {
    let app = TestApp::new();
    let cookie = app.register("ada@example.org").await;

    let response = app
        .post(
            "/api/assessments",
            json!({"instrument": "phq9", "answers": [2, 2, 2, 1, 1, 1, 1, 1, 1], "notes": "rough week"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["score"], 12);
    assert_eq!(response.body["severity"], "moderate");
    assert_eq!(response.body["crisis_flag"], true);
    assert_eq!(response.body["notes"], "rough week");
}

#[tokio::test]
async fn test_invalid_submissions_are_rejected() {
    let app = TestApp::new();
    let cookie = app.register("ada@example.org").await;

    let unknown = app
        .post(
            "/api/assessments",
            json!({"instrument": "bdi", "answers": [0, 1]}),
            Some(&cookie),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNPROCESSABLE_ENTITY);

    let short = app
        .post(
            "/api/assessments",
            json!({"instrument": "gad7", "answers": [0, 1, 2]}),
            Some(&cookie),
        )
        .await;
    assert_eq!(short.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(short.body["code"], "VALIDATION_ERROR");

    let out_of_range = app
        .post(
            "/api/assessments",
            json!({"instrument": "gad7", "answers": [0, 1, 2, 3, 4, 0, 0]}),
            Some(&cookie),
        )
        .await;
    assert_eq!(out_of_range.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_results_are_private() {
    let app = TestApp::new();
    let ada = app.register("ada@example.org").await;
    let bob = app.register("bob@example.org").await;

    let first = app
        .post(
            "/api/assessments",
            json!({"instrument": "wellbeing5", "answers": [5, 5, 4, 4, 3]}),
            Some(&ada),
        )
        .await;
    assert_eq!(first.body["score"], 84);
    assert_eq!(first.body["severity"], "good");
    app.post(
        "/api/assessments",
        json!({"instrument": "gad7", "answers": [0, 0, 0, 0, 0, 0, 0]}),
        Some(&ada),
    )
    .await;

    let listed = app.get("/api/assessments", Some(&ada)).await;
    let results = listed.body.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["instrument"], "gad7");

    assert!(app
        .get("/api/assessments", Some(&bob))
        .await
        .body
        .as_array()
        .unwrap()
        .is_empty());

    let uri = format!("/api/assessments/{}", first.body["id"].as_str().unwrap());
    assert_eq!(app.get(&uri, Some(&bob)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, Some(&bob)).await.status, StatusCode::NOT_FOUND);

    assert_eq!(app.get(&uri, Some(&ada)).await.status, StatusCode::OK);
    assert_eq!(app.delete(&uri, Some(&ada)).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, Some(&ada)).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mistyped_body_uses_error_envelope() {
    let app = TestApp::new();
    let ada = app.register("ada@example.org").await;

    let negative = app
        .post(
            "/api/assessments",
            json!({"instrument": "gad7", "answers": [-1, 0, 0, 0, 0, 0, 0]}),
            Some(&ada),
        )
        .await;
    assert_eq!(negative.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(negative.body["code"], "VALIDATION_ERROR");
    assert!(negative.body["details"]["body"].is_array());

    let missing = app
        .post("/api/auth/register", json!({"email": "bob@example.org"}), None)
        .await;
    assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(missing.body["code"], "VALIDATION_ERROR");
    assert!(missing.body["message"].as_str().unwrap().contains("password"));
}
