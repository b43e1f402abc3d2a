//! Resource library endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::{session_user_id, CurrentUser};
use crate::error::ApiError;
use crate::models::{NewResource, Resource, ResourceFilter, ResourceKind, ResourceUpdate};
use crate::state::AppState;
use super::{validate_title, JsonBody};

const MAX_DURATION_MINUTES: i32 = 180;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/resources", get(list_resources).post(create_resource))
        .route(
            "/api/resources/{id}",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    kind: Option<String>,
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateResourceRequest {
    kind: ResourceKind,
    title: String,
    #[serde(default)]
    summary: String,
    body: String,
    duration_minutes: Option<i32>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_published")]
    published: bool,
}

fn default_published() -> bool {
    true
}

fn validate_body(body: &str) -> Result<(), ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::invalid("body", "Body is required"));
    }
    Ok(())
}

fn validate_duration(duration: Option<i32>) -> Result<(), ApiError> {
    match duration {
        Some(minutes) if !(1..=MAX_DURATION_MINUTES).contains(&minutes) => Err(ApiError::invalid(
            "duration_minutes",
            format!("Duration must be between 1 and {} minutes", MAX_DURATION_MINUTES),
        )),
        _ => Ok(()),
    }
}

/// Published resources, newest first.
async fn list_resources(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Resource>>, ApiError> {
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<ResourceKind>)
        .transpose()
        .map_err(|e| ApiError::invalid("kind", e))?;

    let filter = ResourceFilter {
        kind,
        tag: query.tag,
        published_only: true,
    };
    Ok(Json(state.store.list_resources(&filter).await?))
}

/// A single resource. Drafts are only visible to their author.
async fn get_resource(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Resource>, ApiError> {
    let not_found = || ApiError::NotFound(format!("Resource {} not found", id));
    let resource = state.store.get_resource(id).await?.ok_or_else(not_found)?;

    if !resource.published {
        let viewer = session_user_id(&session).await?;
        if viewer != Some(resource.author_id) {
            return Err(not_found());
        }
    }
    Ok(Json(resource))
}

async fn create_resource(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    let title = req.title.trim().to_string();
    validate_title(&title)?;
    validate_body(&req.body)?;
    validate_duration(req.duration_minutes)?;

    let resource = state
        .store
        .create_resource(NewResource {
            kind: req.kind,
            title,
            summary: req.summary.trim().to_string(),
            body: req.body,
            duration_minutes: req.duration_minutes,
            tags: req.tags,
            author_id: user.id,
            published: req.published,
        })
        .await?;

    tracing::info!(resource_id = %resource.id, kind = %resource.kind, "Created resource");
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn load_owned(state: &AppState, id: Uuid, user_id: Uuid) -> Result<Resource, ApiError> {
    let resource = state
        .store
        .get_resource(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Resource {} not found", id)))?;
    if resource.author_id != user_id {
        return Err(ApiError::Forbidden(
            "Only the author can change this resource".to_string(),
        ));
    }
    Ok(resource)
}

async fn update_resource(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(mut update): JsonBody<ResourceUpdate>,
) -> Result<Json<Resource>, ApiError> {
    load_owned(&state, id, user.id).await?;

    if let Some(ref mut title) = update.title {
        *title = title.trim().to_string();
        validate_title(title)?;
    }
    if let Some(ref body) = update.body {
        validate_body(body)?;
    }
    validate_duration(update.duration_minutes)?;

    Ok(Json(state.store.update_resource(id, update).await?))
}

async fn delete_resource(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    load_owned(&state, id, user.id).await?;
    state.store.delete_resource(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
