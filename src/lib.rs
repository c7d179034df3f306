//! CKD Risk Predictor Library
//!
//! Collects bounded clinical measurements through a form, assembles them into
//! the fixed feature schema of a pre-trained chronic kidney disease
//! classifier, and reports the predicted class with its probability.

pub mod adapter;
pub mod config;
pub mod error;
pub mod feature_encoder;
pub mod metrics;
pub mod models;
pub mod types;
pub mod web;

pub use adapter::SubmissionHandler;
pub use config::AppConfig;
pub use error::{ModelError, PredictionError};
pub use feature_encoder::FeatureEncoder;
pub use models::{Predictor, PredictorCache};
pub use types::{DisplayResult, PatientForm, PatientRecord, PredictionReport};
