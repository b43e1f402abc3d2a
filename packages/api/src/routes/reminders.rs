//! Device registration and medication reminder endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::models::{NewReminder, Reminder};
use crate::push::is_valid_token;
use crate::reminders::{dispatch_reminder, DispatchError, ReminderForm};
use crate::state::AppState;
use super::JsonBody;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/devices", post(register_device).delete(unregister_device))
        .route("/api/reminders", get(list_reminders).post(create_reminder))
        .route("/api/reminders/{id}", delete(delete_reminder))
        .route("/api/reminders/{id}/send", post(send_reminder))
}

#[derive(Debug, Deserialize)]
struct DeviceRequest {
    token: String,
}

/// Missing fields deserialize as empty so they hit the form's own message.
#[derive(Debug, Deserialize)]
struct CreateReminderRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    medicine: String,
    #[serde(default)]
    time: String,
}

async fn register_device(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<DeviceRequest>,
) -> Result<StatusCode, ApiError> {
    let token = req.token.trim();
    if !is_valid_token(token) {
        return Err(ApiError::invalid("token", "Invalid push token"));
    }
    state.store.add_push_token(user.id, token).await?;
    tracing::info!(user_id = %user.id, "Registered push token");
    Ok(StatusCode::NO_CONTENT)
}

async fn unregister_device(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<DeviceRequest>,
) -> Result<StatusCode, ApiError> {
    state.store.remove_push_token(user.id, req.token.trim()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_reminder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateReminderRequest>,
) -> Result<(StatusCode, Json<Reminder>), ApiError> {
    let form = ReminderForm::validate(&req.name, &req.medicine, &req.time, Utc::now())?;

    let reminder = state
        .store
        .create_reminder(NewReminder {
            user_id: user.id,
            name: form.name,
            medicine: form.medicine,
            remind_at: form.remind_at,
        })
        .await?;

    tracing::info!(reminder_id = %reminder.id, remind_at = %reminder.remind_at, "Scheduled reminder");
    Ok((StatusCode::CREATED, Json(reminder)))
}

async fn list_reminders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Reminder>>, ApiError> {
    Ok(Json(state.store.list_reminders(user.id).await?))
}

/// Check that `id` exists and belongs to `user_id`. Other users' reminders
/// look missing.
async fn ensure_owned(state: &AppState, id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    match state.store.get_reminder(id).await? {
        Some(reminder) if reminder.user_id == user_id => Ok(()),
        _ => Err(DispatchError::NotFound.into()),
    }
}

async fn delete_reminder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ensure_owned(&state, id, user.id).await?;
    state.store.delete_reminder(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deliver a reminder now instead of waiting for the scheduler.
async fn send_reminder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Reminder>, ApiError> {
    ensure_owned(&state, id, user.id).await?;
    Ok(Json(dispatch_reminder(&state, id).await?))
}
