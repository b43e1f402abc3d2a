//! # API crate: the MindWell HTTP API
//!
//! Everything the `mindwell` binary serves lives here. The binary only wires
//! together configuration, storage, sessions and the push sender, then mounts
//! [`router`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`assessment`] | PHQ-9, GAD-7 and WHO-5 instruments and their scoring |
//! | [`auth`] | OAuth (GitHub, Google) and local password authentication, session handling, password hashing |
//! | [`config`] | Layered [`Settings`] from defaults, `config.toml` and `MINDWELL__*` environment variables |
//! | [`db`] | The [`Store`](db::Store) trait with PostgreSQL and in-memory implementations |
//! | [`error`] | [`ApiError`] and its JSON error body |
//! | [`models`] | Users, resources, forum posts, assessment results and reminders |
//! | [`push`] | Push notification senders (FCM over HTTP, or log only) |
//! | [`realtime`] | Broadcast hub behind the forum event stream |
//! | [`reminders`] | Reminder validation, dispatch and the background scheduler |
//!
//! ## Routes
//!
//! - **Auth**: `/api/auth/register`, `/api/auth/login`, `/api/auth/logout`, `/api/auth/me`,
//!   `/api/auth/login/{provider}`, `/auth/{provider}/callback`
//! - **Resources**: `/api/resources`, `/api/resources/{id}`
//! - **Forum**: `/api/forum/threads`, `/api/forum/threads/{id}`,
//!   `/api/forum/threads/{id}/replies`, `/api/forum/posts/{id}`, `/api/forum/stream`
//! - **Assessments**: `/api/assessments/instruments`, `/api/assessments`, `/api/assessments/{id}`
//! - **Reminders**: `/api/devices`, `/api/reminders`, `/api/reminders/{id}`,
//!   `/api/reminders/{id}/send`
//! - **Health**: `/health`, `/ready`
//!
//! The router expects a `tower_sessions::SessionManagerLayer` to be layered on
//! top by the caller; handlers read the signed-in user from the session.

use axum::Router;

pub mod assessment;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod push;
pub mod realtime;
pub mod reminders;
mod routes;
pub mod state;

pub use config::Settings;
pub use error::ApiError;
pub use models::UserInfo;
pub use state::AppState;

/// Build the application router with its state applied.
pub fn router(state: AppState) -> Router {
    routes::routes().with_state(state)
}
