//! Stored self-assessment results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::{Instrument, Score};

/// A scored questionnaire submission, owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub instrument: Instrument,
    pub answers: Vec<u8>,
    pub score: i32,
    pub severity: String,
    /// Set when an answer indicates risk of self-harm.
    pub crisis_flag: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAssessmentResult {
    pub user_id: Uuid,
    pub instrument: Instrument,
    pub answers: Vec<u8>,
    pub score: Score,
    pub notes: Option<String>,
}

impl NewAssessmentResult {
    pub fn into_result(self, now: DateTime<Utc>) -> AssessmentResult {
        AssessmentResult {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            instrument: self.instrument,
            answers: self.answers,
            score: self.score.total,
            severity: self.score.severity.to_string(),
            crisis_flag: self.score.crisis_flag,
            notes: self.notes,
            created_at: now,
        }
    }
}
