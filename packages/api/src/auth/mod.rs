//! Authentication: local passwords, OAuth providers and session handling.

mod config;
mod oauth;
mod password;
mod session;

pub use config::{OAuthConfig, Provider};
pub use oauth::{OAuthClient, PendingLogin};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};
pub use session::{
    session_user_id, start_session, CurrentUser, SESSION_PENDING_LOGIN_KEY, SESSION_USER_ID_KEY,
};
