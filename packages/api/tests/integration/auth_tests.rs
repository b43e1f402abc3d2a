//! Registration, login, logout and OAuth flow tests.

use api::config::Settings;
use axum::http::StatusCode;
use serde_json::json;

use super::common::TestApp;

fn github_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.github_client_id = Some("client-id".into());
    settings.auth.github_client_secret = Some("client-secret".into());
    settings
}

#[tokio::test]
async fn test_register_starts_session() {
    let app = TestApp::new();
    let cookie = app.register("Ada@Example.org").await;

    let me = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "ada@example.org");
    assert_eq!(me.body["provider"], "local");
    assert!(me.body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.register("ada@example.org").await;

    let response = app
        .post(
            "/api/auth/register",
            json!({"email": "ada@example.org", "password": "another password", "name": "Ada"}),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validates_fields() {
    let app = TestApp::new();

    let short = app
        .post(
            "/api/auth/register",
            json!({"email": "ada@example.org", "password": "short", "name": "Ada"}),
            None,
        )
        .await;
    assert_eq!(short.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(short.body["code"], "VALIDATION_ERROR");
    assert!(short.body["details"]["password"].is_array());

    let bad_email = app
        .post(
            "/api/auth/register",
            json!({"email": "not-an-email", "password": "long enough", "name": "Ada"}),
            None,
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_rejected() {
    let app = TestApp::new();
    app.register("ada@example.org").await;

    let response = app
        .post(
            "/api/auth/login",
            json!({"email": "ada@example.org", "password": "wrong password"}),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["code"], "INVALID_CREDENTIALS");

    let unknown = app
        .post(
            "/api/auth/login",
            json!({"email": "nobody@example.org", "password": "whatever123"}),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_then_logout() {
    let app = TestApp::new();
    app.register("ada@example.org").await;

    let login = app
        .post(
            "/api/auth/login",
            json!({"email": "ada@example.org", "password": "correct horse battery"}),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let cookie = login.cookie.unwrap();

    let logout = app
        .request(axum::http::Method::POST, "/api/auth/logout", None, Some(&cookie))
        .await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);

    let me = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert!(me.body.is_null());
}

#[tokio::test]
async fn test_protected_route_requires_session() {
    let app = TestApp::new();
    let response = app.get("/api/assessments", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_login_url_for_unknown_and_unconfigured_providers() {
    let app = TestApp::new();

    let unknown = app.get("/api/auth/login/myspace", None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let unconfigured = app.get("/api/auth/login/github", None).await;
    assert_eq!(unconfigured.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_url_points_at_provider() {
    let app = TestApp::with_settings(github_settings());

    let response = app.get("/api/auth/login/github", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let url = response.body["url"].as_str().unwrap();
    assert!(url.starts_with("https://github.com/login/oauth/authorize"));
    assert!(url.contains("code_challenge="));
    assert!(response.cookie.is_some());
}

#[tokio::test]
async fn test_callback_failures_redirect_with_reason() {
    let app = TestApp::with_settings(github_settings());

    let unknown = app.get("/auth/myspace/callback?code=c&state=s", None).await;
    assert_eq!(unknown.status, StatusCode::SEE_OTHER);
    assert_eq!(unknown.location.as_deref(), Some("/?error=unknown_provider"));

    let no_code = app.get("/auth/github/callback?state=s", None).await;
    assert_eq!(no_code.location.as_deref(), Some("/?error=missing_code"));

    let no_state = app.get("/auth/github/callback?code=c", None).await;
    assert_eq!(no_state.location.as_deref(), Some("/?error=missing_state"));

    let started = app.get("/api/auth/login/github", None).await;
    let cookie = started.cookie.unwrap();
    let forged = app
        .get("/auth/github/callback?code=c&state=forged", Some(&cookie))
        .await;
    assert_eq!(forged.location.as_deref(), Some("/?error=invalid_state"));
}
