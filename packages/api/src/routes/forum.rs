//! Community forum endpoints and the live event stream.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::models::{ForumPost, NewForumPost, Thread};
use crate::realtime::ForumEvent;
use crate::state::AppState;
use super::{validate_title, JsonBody};

const MAX_BODY_LEN: usize = 10_000;
const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/forum/threads", get(list_threads).post(create_thread))
        .route("/api/forum/threads/{id}", get(get_thread))
        .route("/api/forum/threads/{id}/replies", post(create_reply))
        .route("/api/forum/posts/{id}", put(update_post).delete(delete_post))
        .route("/api/forum/stream", get(stream))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

impl PageQuery {
    /// `(page, per_page)` with defaults applied and `per_page` clamped.
    fn resolve(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }
}

#[derive(Debug, Serialize)]
struct ThreadPage {
    page: u32,
    per_page: u32,
    threads: Vec<ForumPost>,
}

#[derive(Debug, Deserialize)]
struct CreateThreadRequest {
    title: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct CreateReplyRequest {
    body: String,
}

#[derive(Debug, Deserialize)]
struct UpdatePostRequest {
    title: Option<String>,
    body: String,
}

fn validate_body(body: &str) -> Result<(), ApiError> {
    if body.trim().is_empty() || body.chars().count() > MAX_BODY_LEN {
        return Err(ApiError::invalid(
            "body",
            format!("Body must be between 1 and {} characters", MAX_BODY_LEN),
        ));
    }
    Ok(())
}

fn post_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Post {} not found", id))
}

/// Thread roots, newest first.
async fn list_threads(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ThreadPage>, ApiError> {
    let (page, per_page) = query.resolve();
    let offset = i64::from(page - 1) * i64::from(per_page);
    let threads = state
        .store
        .list_threads(i64::from(per_page), offset)
        .await?;
    Ok(Json(ThreadPage {
        page,
        per_page,
        threads,
    }))
}

async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Thread>, ApiError> {
    let root = state
        .store
        .get_post(id)
        .await?
        .filter(ForumPost::is_thread_root)
        .ok_or_else(|| ApiError::NotFound(format!("Thread {} not found", id)))?;
    let replies = state.store.list_replies(id).await?;
    Ok(Json(Thread { root, replies }))
}

async fn create_thread(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateThreadRequest>,
) -> Result<(StatusCode, Json<ForumPost>), ApiError> {
    let title = req.title.trim().to_string();
    validate_title(&title)?;
    validate_body(&req.body)?;

    let post = state
        .store
        .create_post(NewForumPost {
            author_id: user.id,
            parent_id: None,
            title: Some(title),
            body: req.body,
        })
        .await?;

    state.forum.publish(ForumEvent::PostCreated { post: post.clone() });
    Ok((StatusCode::CREATED, Json(post)))
}

async fn create_reply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<CreateReplyRequest>,
) -> Result<(StatusCode, Json<ForumPost>), ApiError> {
    validate_body(&req.body)?;

    // Threads are one level deep: replying to a reply answers its root.
    let target = state
        .store
        .get_post(id)
        .await?
        .ok_or_else(|| post_not_found(id))?;

    let post = state
        .store
        .create_post(NewForumPost {
            author_id: user.id,
            parent_id: Some(target.thread_id()),
            title: None,
            body: req.body,
        })
        .await?;

    state.forum.publish(ForumEvent::PostCreated { post: post.clone() });
    Ok((StatusCode::CREATED, Json(post)))
}

async fn load_own_post(state: &AppState, id: Uuid, user_id: Uuid) -> Result<ForumPost, ApiError> {
    let post = state
        .store
        .get_post(id)
        .await?
        .ok_or_else(|| post_not_found(id))?;
    if post.author_id != user_id {
        return Err(ApiError::Forbidden(
            "Only the author can change this post".to_string(),
        ));
    }
    Ok(post)
}

async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdatePostRequest>,
) -> Result<Json<ForumPost>, ApiError> {
    let existing = load_own_post(&state, id, user.id).await?;
    validate_body(&req.body)?;

    let title = match req.title {
        Some(title) if existing.is_thread_root() => {
            let title = title.trim().to_string();
            validate_title(&title)?;
            Some(title)
        }
        _ => None,
    };

    let post = state.store.update_post(id, title, req.body).await?;
    state.forum.publish(ForumEvent::PostUpdated { post: post.clone() });
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let post = load_own_post(&state, id, user.id).await?;
    state.store.delete_post(id).await?;

    state.forum.publish(ForumEvent::PostDeleted {
        id,
        thread_id: post.thread_id(),
    });
    Ok(StatusCode::NO_CONTENT)
}

/// Server-sent forum events. Events missed by a slow client are skipped.
async fn stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = BroadcastStream::new(state.forum.subscribe()).filter_map(|received| {
        let event = match received {
            Ok(event) => event,
            Err(lagged) => {
                tracing::warn!(error = %lagged, "Forum stream subscriber lagged");
                return None;
            }
        };
        match Event::default().event(event.name()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode forum event");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
