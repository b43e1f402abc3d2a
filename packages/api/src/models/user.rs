//! # User model for authenticated users
//!
//! Defines the two representations of a MindWell user:
//!
//! ## [`User`]
//!
//! The complete stored record:
//!
//! - `id`: primary key (`UUID v4`).
//! - `email`, `name`, `avatar_url`: profile fields populated during OAuth or registration.
//! - `provider` / `provider_id`: identify the auth provider (`"github"`, `"google"`, or
//!   `"local"` for email+password accounts where `provider_id` equals the email).
//! - `password_hash`: Argon2 hash, present only for `"local"` accounts.
//! - `push_tokens`: device tokens registered for reminder notifications, without duplicates.
//! - `created_at` / `updated_at`: audit timestamps.
//!
//! ## [`UserInfo`]
//!
//! A client-safe subset. It omits the password hash, push tokens and timestamps.
//! The helper [`UserInfo::display_name`] returns the user's name or falls back to their
//! email address.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider name used for email + password accounts.
pub const LOCAL_PROVIDER: &str = "local";

/// Full user record.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: String,
    pub provider_id: String,
    pub password_hash: Option<String>,
    pub push_tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Convert to UserInfo for client consumption.
    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id.to_string(),
            email: self.email.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            provider: self.provider.clone(),
        }
    }
}

/// Fields needed to create or upsert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: String,
    pub provider_id: String,
    pub password_hash: Option<String>,
}

impl NewUser {
    /// A local account keyed on its (already normalised) email.
    pub fn local(email: &str, name: &str, password_hash: String) -> Self {
        Self {
            email: email.to_string(),
            name: Some(name.to_string()),
            avatar_url: None,
            provider: LOCAL_PROVIDER.to_string(),
            provider_id: email.to_string(),
            password_hash: Some(password_hash),
        }
    }

    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            email: self.email,
            name: self.name,
            avatar_url: self.avatar_url,
            provider: self.provider,
            provider_id: self.provider_id,
            password_hash: self.password_hash,
            push_tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// User information safe to send to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: String,
}

impl UserInfo {
    /// Get display name, falling back to email if name is not set.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}
