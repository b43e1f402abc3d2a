//! Medication reminders delivered as push notifications.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Scheduled,
    /// Claimed by a dispatcher; delivery is in flight.
    Sending,
    Sent,
    Failed,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Scheduled => "scheduled",
            ReminderStatus::Sending => "sending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ReminderStatus::Scheduled),
            "sending" => Ok(ReminderStatus::Sending),
            "sent" => Ok(ReminderStatus::Sent),
            "failed" => Ok(ReminderStatus::Failed),
            other => Err(format!("Unknown reminder status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Who the medicine is for.
    pub name: String,
    pub medicine: String,
    pub remind_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn is_due(&self, now: DateTime<Utc>, max_attempts: i32) -> bool {
        self.status == ReminderStatus::Scheduled
            && self.remind_at <= now
            && self.attempts < max_attempts
    }
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub user_id: Uuid,
    pub name: String,
    pub medicine: String,
    pub remind_at: DateTime<Utc>,
}

impl NewReminder {
    pub fn into_reminder(self, now: DateTime<Utc>) -> Reminder {
        Reminder {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            name: self.name,
            medicine: self.medicine,
            remind_at: self.remind_at,
            status: ReminderStatus::Scheduled,
            attempts: 0,
            last_error: None,
            created_at: now,
        }
    }
}
