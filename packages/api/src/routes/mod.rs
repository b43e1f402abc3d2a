//! HTTP routes, one module per resource.

mod assessments;
mod auth;
mod forum;
mod health;
mod reminders;
mod resources;

use axum::extract::{FromRequest, Request};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 200;

/// JSON request body whose rejection is an [`ApiError::Validation`], so
/// malformed or mistyped bodies get the same error envelope as every other
/// validation failure.
pub(crate) struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::invalid("body", rejection.body_text())),
        }
    }
}

/// Titles of resources and forum threads: 1 to 200 characters.
pub(crate) fn validate_title(title: &str) -> Result<(), ApiError> {
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(ApiError::invalid(
            "title",
            format!("Title must be between 1 and {} characters", MAX_TITLE_LEN),
        ));
    }
    Ok(())
}

const LANDING_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>MindWell</title></head>
<body>
<h1>MindWell</h1>
<p>Guided meditations, self-assessments, community support and medication reminders.</p>
<p>The JSON API lives under <code>/api</code>.</p>
</body>
</html>
"#;

async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// All routes, still expecting [`AppState`].
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .merge(health::routes())
        .merge(auth::routes())
        .merge(resources::routes())
        .merge(forum::routes())
        .merge(assessments::routes())
        .merge(reminders::routes())
}
