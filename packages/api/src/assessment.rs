//! # Self-assessment instruments and scoring
//!
//! | Instrument | Items | Answer range | Total | Bands |
//! |------------|-------|--------------|-------|-------|
//! | [`Instrument::Phq9`] | 9 | 0..=3 | 0..=27 | minimal, mild, moderate, moderately_severe, severe |
//! | [`Instrument::Gad7`] | 7 | 0..=3 | 0..=21 | minimal, mild, moderate, severe |
//! | [`Instrument::Wellbeing5`] | 5 | 0..=5 | 0..=100 (raw × 4) | low (≤ 50), good |
//!
//! PHQ-9 item 9 asks about thoughts of self-harm. Any non-zero answer sets
//! [`Score::crisis_flag`] regardless of the total.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Phq9,
    Gad7,
    Wellbeing5,
}

/// Instrument metadata for clients rendering the questionnaire.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentInfo {
    pub id: Instrument,
    pub name: &'static str,
    pub items: usize,
    pub min_answer: u8,
    pub max_answer: u8,
}

/// Result of scoring one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub total: i32,
    pub severity: &'static str,
    pub crisis_flag: bool,
}

#[derive(Error, Debug, PartialEq)]
pub enum ScoreError {
    #[error("{instrument} expects {expected} answers, got {got}")]
    WrongCount {
        instrument: Instrument,
        expected: usize,
        got: usize,
    },
    #[error("answer {index} is {value}, must be between 0 and {max}")]
    OutOfRange { index: usize, value: u8, max: u8 },
}

impl Instrument {
    pub const ALL: [Instrument; 3] = [Instrument::Phq9, Instrument::Gad7, Instrument::Wellbeing5];

    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::Phq9 => "phq9",
            Instrument::Gad7 => "gad7",
            Instrument::Wellbeing5 => "wellbeing5",
        }
    }

    pub fn item_count(&self) -> usize {
        match self {
            Instrument::Phq9 => 9,
            Instrument::Gad7 => 7,
            Instrument::Wellbeing5 => 5,
        }
    }

    pub fn max_answer(&self) -> u8 {
        match self {
            Instrument::Phq9 | Instrument::Gad7 => 3,
            Instrument::Wellbeing5 => 5,
        }
    }

    pub fn info(&self) -> InstrumentInfo {
        let name = match self {
            Instrument::Phq9 => "Patient Health Questionnaire (PHQ-9)",
            Instrument::Gad7 => "Generalized Anxiety Disorder scale (GAD-7)",
            Instrument::Wellbeing5 => "WHO-5 Well-Being Index",
        };
        InstrumentInfo {
            id: *self,
            name,
            items: self.item_count(),
            min_answer: 0,
            max_answer: self.max_answer(),
        }
    }

    /// Validate and score a set of answers.
    pub fn score(&self, answers: &[u8]) -> Result<Score, ScoreError> {
        if answers.len() != self.item_count() {
            return Err(ScoreError::WrongCount {
                instrument: *self,
                expected: self.item_count(),
                got: answers.len(),
            });
        }
        let max = self.max_answer();
        if let Some((index, &value)) = answers.iter().enumerate().find(|&(_, &a)| a > max) {
            return Err(ScoreError::OutOfRange { index, value, max });
        }

        let raw: i32 = answers.iter().map(|&a| i32::from(a)).sum();

        let score = match self {
            Instrument::Phq9 => Score {
                total: raw,
                severity: phq9_severity(raw),
                crisis_flag: answers[8] > 0,
            },
            Instrument::Gad7 => Score {
                total: raw,
                severity: gad7_severity(raw),
                crisis_flag: false,
            },
            Instrument::Wellbeing5 => {
                let percent = raw * 4;
                Score {
                    total: percent,
                    severity: if percent <= 50 { "low" } else { "good" },
                    crisis_flag: false,
                }
            }
        };
        Ok(score)
    }
}

fn phq9_severity(total: i32) -> &'static str {
    match total {
        0..=4 => "minimal",
        5..=9 => "mild",
        10..=14 => "moderate",
        15..=19 => "moderately_severe",
        _ => "severe",
    }
}

fn gad7_severity(total: i32) -> &'static str {
    match total {
        0..=4 => "minimal",
        5..=9 => "mild",
        10..=14 => "moderate",
        _ => "severe",
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phq9" => Ok(Instrument::Phq9),
            "gad7" => Ok(Instrument::Gad7),
            "wellbeing5" => Ok(Instrument::Wellbeing5),
            other => Err(format!("Unknown instrument: {}", other)),
        }
    }
}
