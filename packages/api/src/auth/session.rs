//! Session keys and the authenticated-user extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Key for storing the user ID in the session.
pub const SESSION_USER_ID_KEY: &str = "user_id";

/// Key for the OAuth login in progress.
pub const SESSION_PENDING_LOGIN_KEY: &str = "oauth_pending";

/// Bind `user_id` to the session, rotating its id first to prevent fixation.
pub async fn start_session(session: &Session, user_id: Uuid) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_ID_KEY, user_id).await?;
    Ok(())
}

/// The user id bound to the session, if any.
pub async fn session_user_id(session: &Session) -> Result<Option<Uuid>, ApiError> {
    Ok(session.get::<Uuid>(SESSION_USER_ID_KEY).await?)
}

/// The signed-in user. Rejects with 401 when the session carries no user, or a
/// user that no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::Internal(msg.to_string()))?;

        let Some(user_id) = session_user_id(&session).await? else {
            return Err(ApiError::not_authenticated());
        };

        match state.store.get_user(user_id).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                tracing::warn!(%user_id, "Session refers to a missing user");
                session.flush().await?;
                Err(ApiError::not_authenticated())
            }
        }
    }
}
