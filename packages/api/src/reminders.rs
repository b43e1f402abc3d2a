//! # Reminder scheduling and dispatch
//!
//! A reminder is stored as `scheduled` and delivered once its time has come,
//! either by the background [`spawn_scheduler`] loop or by an explicit
//! `POST /api/reminders/{id}/send`. Both paths go through [`dispatch_reminder`]:
//!
//! 1. the reminder must exist and still be `scheduled`. It is claimed by moving
//!    it to `sending` in one store operation, so concurrent dispatchers (the
//!    scheduler, a manual send, another server instance) deliver it once;
//! 2. its owner must have at least one push token, and the first one must look
//!    like a real device token ([`MIN_TOKEN_LEN`](crate::push::MIN_TOKEN_LEN));
//! 3. the notification is sent through the configured [`PushSender`](crate::push::PushSender).
//!
//! Success marks the reminder `sent` without touching `attempts`. Every failure
//! after step 1 counts as an attempt and releases the claim, so a reminder that
//! can never be delivered ends up `failed` after `reminders.max_attempts` tries
//! instead of being retried forever.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::ApiError;
use crate::models::{Reminder, ReminderStatus};
use crate::push::{is_valid_token, PushError, PushMessage};
use crate::state::AppState;

pub const NOTIFICATION_TITLE: &str = "Medication Reminder";

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Document not found")]
    NotFound,

    #[error("Reminder is already {0}")]
    NotScheduled(ReminderStatus),

    #[error("Invalid user configuration")]
    NoTokens,

    #[error("Invalid push token")]
    InvalidToken,

    #[error("Push delivery failed: {0}")]
    Push(#[from] PushError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound => ApiError::NotFound(err.to_string()),
            DispatchError::NotScheduled(_) => ApiError::Conflict(err.to_string()),
            DispatchError::NoTokens | DispatchError::InvalidToken => {
                ApiError::BadRequest(err.to_string())
            }
            DispatchError::Push(_) => ApiError::BadGateway(err.to_string()),
            DispatchError::Store(err) => err.into(),
        }
    }
}

/// Parse a reminder time: RFC 3339, or `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
pub fn parse_reminder_time(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// A validated reminder request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderForm {
    pub name: String,
    pub medicine: String,
    pub remind_at: DateTime<Utc>,
}

impl ReminderForm {
    pub fn validate(
        name: &str,
        medicine: &str,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ApiError> {
        let (name, medicine, time) = (name.trim(), medicine.trim(), time.trim());
        if name.is_empty() || medicine.is_empty() || time.is_empty() {
            return Err(ApiError::invalid("form", "All fields are required"));
        }
        let remind_at = parse_reminder_time(time)
            .ok_or_else(|| ApiError::invalid("time", "Invalid time format! Use YYYY-MM-DDTHH:MM"))?;
        if remind_at < now {
            return Err(ApiError::invalid("time", "Reminder time must be in the future"));
        }
        Ok(Self {
            name: name.to_string(),
            medicine: medicine.to_string(),
            remind_at,
        })
    }
}

fn notification_body(reminder: &Reminder) -> String {
    format!(
        "Hi {}, it's time to take your {}.",
        reminder.name, reminder.medicine
    )
}

/// Deliver one reminder. See the module docs for the rules.
pub async fn dispatch_reminder(state: &AppState, id: Uuid) -> Result<Reminder, DispatchError> {
    let Some(reminder) = state.store.claim_reminder(id).await? else {
        let current = state
            .store
            .get_reminder(id)
            .await?
            .ok_or(DispatchError::NotFound)?;
        return Err(DispatchError::NotScheduled(current.status));
    };

    match deliver(state, &reminder).await {
        Ok(message_id) => {
            tracing::info!(reminder_id = %id, %message_id, "Reminder sent");
            Ok(state.store.mark_reminder_sent(id).await?)
        }
        Err(err) => {
            let max_attempts = state.settings.reminders.max_attempts;
            let updated = state
                .store
                .record_reminder_failure(id, &err.to_string(), max_attempts)
                .await?;
            tracing::warn!(
                reminder_id = %id,
                attempts = updated.attempts,
                status = %updated.status,
                error = %err,
                "Reminder delivery failed"
            );
            Err(err)
        }
    }
}

async fn deliver(state: &AppState, reminder: &Reminder) -> Result<String, DispatchError> {
    let user = state.store.get_user(reminder.user_id).await?;
    let token = user
        .and_then(|u| u.push_tokens.into_iter().next())
        .ok_or(DispatchError::NoTokens)?;

    if !is_valid_token(&token) {
        return Err(DispatchError::InvalidToken);
    }

    let message = PushMessage {
        token,
        title: NOTIFICATION_TITLE.to_string(),
        body: notification_body(reminder),
    };
    Ok(state.push.send(&message).await?)
}

/// Dispatch every due reminder once. Returns how many were sent.
pub async fn run_due_reminders(state: &AppState) -> Result<usize, StoreError> {
    let due = state
        .store
        .list_due_reminders(Utc::now(), state.settings.reminders.max_attempts)
        .await?;

    let mut sent = 0;
    for reminder in due {
        if dispatch_reminder(state, reminder.id).await.is_ok() {
            sent += 1;
        }
    }
    Ok(sent)
}

/// Run [`run_due_reminders`] every `reminders.poll_interval_secs` until `shutdown`
/// flips to `true` or its sender is dropped.
pub fn spawn_scheduler(state: AppState, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.settings.reminders.poll_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(interval_secs = period.as_secs(), "Reminder scheduler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match run_due_reminders(&state).await {
                        Ok(0) => {}
                        Ok(sent) => tracing::info!(sent, "Dispatched due reminders"),
                        Err(e) => tracing::error!(error = %e, "Failed to load due reminders"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Reminder scheduler stopped");
    })
}
