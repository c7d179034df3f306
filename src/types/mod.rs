//! Type definitions for the CKD predictor

pub mod patient;
pub mod record;
pub mod report;

pub use patient::{FieldViolation, PatientForm};
pub use record::{FeatureValue, PatientRecord};
pub use report::{DisplayResult, PredictionReport, Verdict};
