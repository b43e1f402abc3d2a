//! # Push notification delivery
//!
//! [`PushSender`] is the seam between reminder dispatch and the push provider.
//!
//! - [`FcmSender`] posts to the Firebase Cloud Messaging HTTP v1 `messages:send`
//!   endpoint with a bearer token and returns the message name FCM assigns.
//! - [`LogSender`] only logs the message; the server falls back to it when no push
//!   endpoint is configured.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PushSettings;

/// Push tokens shorter than this are not real device registrations.
pub const MIN_TOKEN_LEN: usize = 50;

/// Whether `token` is long enough to be a device token. Counts characters, not bytes.
pub fn is_valid_token(token: &str) -> bool {
    token.chars().count() >= MIN_TOKEN_LEN
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// Deliver one message, returning the provider's message id.
    async fn send(&self, message: &PushMessage) -> Result<String, PushError>;
}

#[derive(Serialize)]
struct FcmRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct FcmResponse {
    name: String,
}

pub struct FcmSender {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl FcmSender {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            access_token: access_token.into(),
        }
    }

    /// Build a sender when both the endpoint and the token are configured.
    pub fn from_settings(settings: &PushSettings) -> Option<Self> {
        match (&settings.endpoint, &settings.access_token) {
            (Some(endpoint), Some(token)) if !endpoint.is_empty() && !token.is_empty() => {
                Some(Self::new(endpoint.clone(), token.clone()))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl PushSender for FcmSender {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let request = FcmRequest {
            message: FcmMessage {
                token: &message.token,
                notification: FcmNotification {
                    title: &message.title,
                    body: &message.body,
                },
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sent: FcmResponse = response.json().await?;
        Ok(sent.name)
    }
}

/// Logs messages instead of delivering them.
#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait]
impl PushSender for LogSender {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        tracing::info!(
            title = %message.title,
            body = %message.body,
            "Push delivery not configured, logging notification"
        );
        Ok("logged".to_string())
    }
}
