//! Predictor capability shared by all model backends

use crate::error::PredictionError;
use crate::types::record::PatientRecord;

/// A trained binary classifier over patient records.
///
/// Implementations are loaded once and shared read-only across submissions,
/// so both operations take `&self`.
pub trait Predictor: Send + Sync {
    /// Human-readable model name for logs.
    fn name(&self) -> &str;

    /// Class probabilities `[p_negative, p_positive]` for one record.
    fn predict_proba(&self, record: &PatientRecord) -> Result<[f64; 2], PredictionError>;

    /// Predicted class (0 or 1) for one record.
    fn predict_class(&self, record: &PatientRecord) -> Result<u8, PredictionError>;
}
