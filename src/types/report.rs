//! Prediction output structures

use crate::types::patient::FieldViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Binary CKD verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Positive,
    Negative,
}

impl Verdict {
    /// Class 1 is positive; anything else is negative.
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            Verdict::Positive
        } else {
            Verdict::Negative
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Positive => "Prediction: Positive (CKD)",
            Self::Negative => "Prediction: Negative (No CKD)",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "Positive"),
            Self::Negative => write!(f, "Negative"),
        }
    }
}

/// Successful prediction for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Correlation id for logs; not tied to the patient
    pub submission_id: Uuid,

    /// Probability of the positive (CKD) class, 0.0 - 1.0
    pub probability: f64,

    /// Predicted class, 0 or 1
    pub class: u8,

    pub verdict: Verdict,

    pub evaluated_at: DateTime<Utc>,
}

impl PredictionReport {
    pub fn new(submission_id: Uuid, probability: f64, class: u8) -> Self {
        Self {
            submission_id,
            probability,
            class,
            verdict: Verdict::from_class(class),
            evaluated_at: Utc::now(),
        }
    }

    /// Probability rendered as a percentage metric, e.g. `37.52%`.
    pub fn probability_percent(&self) -> String {
        format!("{:.2}%", self.probability * 100.0)
    }
}

/// What the adapter hands back to the front end for one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayResult {
    Prediction(PredictionReport),
    /// Input outside its declared domain; the predictor was not called
    Rejected(Vec<FieldViolation>),
    /// User-facing description of a failed prediction
    Failed(String),
}

impl DisplayResult {
    pub fn report(&self) -> Option<&PredictionReport> {
        match self {
            Self::Prediction(report) => Some(report),
            _ => None,
        }
    }
}
