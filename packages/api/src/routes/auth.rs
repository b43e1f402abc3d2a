//! Authentication endpoints.
//!
//! - `POST /api/auth/register`, `POST /api/auth/login`, `POST /api/auth/logout`,
//!   `GET /api/auth/me`: local email + password accounts.
//! - `GET /api/auth/login/{provider}`: start an OAuth login; returns the URL to send
//!   the browser to.
//! - `GET /auth/{provider}/callback`: where the provider sends the browser back.
//!   Always answers with a redirect; failures land on `/?error=<reason>`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::auth::{
    hash_password, session_user_id, start_session, verify_password, OAuthClient,
    PendingLogin, Provider, MIN_PASSWORD_LEN, SESSION_PENDING_LOGIN_KEY,
};
use crate::error::ApiError;
use crate::models::{NewUser, UserInfo, LOCAL_PROVIDER};
use crate::state::AppState;
use super::JsonBody;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login_password))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(current_user))
        .route("/api/auth/login/{provider}", get(login_url))
        .route("/auth/{provider}/callback", get(oauth_callback))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginUrlResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

/// Register a new user with email and password.
async fn register(
    State(state): State<AppState>,
    session: Session,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserInfo>), ApiError> {
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::invalid("email", "Invalid email address"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    if name.is_empty() {
        return Err(ApiError::invalid("name", "Name is required"));
    }

    if state
        .store
        .find_user_by_identity(LOCAL_PROVIDER, &email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::Internal)?;
    let user = state
        .store
        .create_user(NewUser::local(&email, &name, password_hash))
        .await?;

    start_session(&session, user.id).await?;
    tracing::info!(user_id = %user.id, "Registered local account");

    Ok((StatusCode::CREATED, Json(user.to_info())))
}

/// Log in with email and password.
async fn login_password(
    State(state): State<AppState>,
    session: Session,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<UserInfo>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let Some(user) = state
        .store
        .find_user_by_identity(LOCAL_PROVIDER, &email)
        .await?
    else {
        return Err(ApiError::InvalidCredentials);
    };

    let Some(ref hash) = user.password_hash else {
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&req.password, hash).map_err(ApiError::Internal)? {
        return Err(ApiError::InvalidCredentials);
    }

    start_session(&session, user.id).await?;
    Ok(Json(user.to_info()))
}

/// Log out the current user by clearing the session.
async fn logout(session: Session) -> Result<StatusCode, ApiError> {
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the current authenticated user from the session.
async fn current_user(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Option<UserInfo>>, ApiError> {
    let Some(user_id) = session_user_id(&session).await? else {
        return Ok(Json(None));
    };
    let user = state.store.get_user(user_id).await?;
    Ok(Json(user.map(|u| u.to_info())))
}

/// Get the OAuth login URL for a provider.
async fn login_url(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
) -> Result<Json<LoginUrlResponse>, ApiError> {
    let provider: Provider = provider.parse().map_err(ApiError::NotFound)?;
    let client = OAuthClient::new(provider, &state.settings.auth).map_err(ApiError::BadRequest)?;

    let pending = client.authorize();
    session.insert(SESSION_PENDING_LOGIN_KEY, &pending).await?;

    Ok(Json(LoginUrlResponse { url: pending.url }))
}

async fn oauth_callback(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    match complete_oauth_login(&state, &session, &provider, params).await {
        Ok(()) => Redirect::to("/"),
        Err(reason) => Redirect::to(&format!("/?error={}", reason)),
    }
}

/// Finish an OAuth login. The error is the short reason put in the redirect.
async fn complete_oauth_login(
    state: &AppState,
    session: &Session,
    provider: &str,
    params: CallbackParams,
) -> Result<(), &'static str> {
    let Ok(provider) = provider.parse::<Provider>() else {
        return Err("unknown_provider");
    };
    let Some(code) = params.code else {
        tracing::error!(%provider, "OAuth callback missing code");
        return Err("missing_code");
    };
    let Some(csrf_state) = params.state else {
        tracing::error!(%provider, "OAuth callback missing state");
        return Err("missing_state");
    };

    let pending: Option<PendingLogin> = session
        .remove(SESSION_PENDING_LOGIN_KEY)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read session");
            "session_error"
        })?;
    let Some(pending) = pending.filter(|p| p.provider == provider && p.state == csrf_state) else {
        tracing::warn!(%provider, "OAuth callback with unknown or mismatched state");
        return Err("invalid_state");
    };

    let client = OAuthClient::new(provider, &state.settings.auth).map_err(|e| {
        tracing::error!(%provider, error = %e, "Failed to create OAuth client");
        "config_error"
    })?;

    let profile = client
        .exchange_code(&code, &pending.verifier)
        .await
        .map_err(|e| {
            tracing::error!(%provider, error = %e, "OAuth exchange error");
            "oauth_error"
        })?;

    let user = state.store.upsert_oauth_user(profile).await.map_err(|e| {
        tracing::error!(%provider, error = %e, "Failed to store OAuth user");
        "database_error"
    })?;

    start_session(session, user.id).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to set session");
        "session_error"
    })?;

    tracing::info!(%provider, user_id = %user.id, "OAuth login complete");
    Ok(())
}
