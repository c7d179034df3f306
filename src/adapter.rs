//! Form-to-prediction adapter.
//!
//! Validates a submitted form, assembles the patient record, calls the
//! predictor and turns the outcome into a [`DisplayResult`]. Every failure is
//! contained here: a submission never takes the process or the predictor down
//! with it.

use crate::error::PredictionError;
use crate::metrics::SubmissionMetrics;
use crate::models::predictor::Predictor;
use crate::types::patient::PatientForm;
use crate::types::record::PatientRecord;
use crate::types::report::{DisplayResult, PredictionReport};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Handles one form submission at a time against a shared predictor.
#[derive(Clone)]
pub struct SubmissionHandler {
    predictor: Arc<dyn Predictor>,
    metrics: Arc<SubmissionMetrics>,
}

impl SubmissionHandler {
    pub fn new(predictor: Arc<dyn Predictor>, metrics: Arc<SubmissionMetrics>) -> Self {
        Self { predictor, metrics }
    }

    pub fn predictor(&self) -> &Arc<dyn Predictor> {
        &self.predictor
    }

    /// Run one submission end to end.
    pub fn handle_submission(&self, form: &PatientForm) -> DisplayResult {
        let submission_id = Uuid::new_v4();
        let start_time = Instant::now();

        if let Err(violations) = form.validate() {
            self.metrics.record_rejected();
            warn!(
                submission_id = %submission_id,
                violations = violations.len(),
                "Submission rejected"
            );
            return DisplayResult::Rejected(violations);
        }

        let record = PatientRecord::from_form(form);
        debug!(submission_id = %submission_id, record = ?record, "Patient record assembled");

        match self.predict(&record) {
            Ok((probability, class)) => {
                let latency = start_time.elapsed();
                self.metrics.record_prediction(latency, probability, class);

                let report = PredictionReport::new(submission_id, probability, class);
                info!(
                    submission_id = %submission_id,
                    probability = probability,
                    class = class,
                    latency_us = latency.as_micros() as u64,
                    "Prediction complete"
                );
                DisplayResult::Prediction(report)
            }
            Err(e) => {
                self.metrics.record_failure();
                error!(
                    submission_id = %submission_id,
                    model = %self.predictor.name(),
                    error = %e,
                    "Prediction failed"
                );
                DisplayResult::Failed(format!("Error making prediction: {e}"))
            }
        }
    }

    /// Call both predictor operations, converting panics into errors and
    /// checking the outputs are a probability and a binary class.
    fn predict(&self, record: &PatientRecord) -> Result<(f64, u8), PredictionError> {
        let predictor = &self.predictor;

        let (proba, class) = panic::catch_unwind(AssertUnwindSafe(|| {
            let proba = predictor.predict_proba(record)?;
            let class = predictor.predict_class(record)?;
            Ok::<_, PredictionError>((proba, class))
        }))
        .map_err(|payload| PredictionError::Panicked(panic_message(&*payload)))??;

        let probability = proba[1];
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(PredictionError::InvalidOutput(format!(
                "probability {probability} outside [0, 1]"
            )));
        }
        if class > 1 {
            return Err(PredictionError::InvalidOutput(format!(
                "class {class} is not 0 or 1"
            )));
        }

        Ok((probability, class))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::linear::{LinearModelArtifact, LinearPredictor};
    use crate::types::patient::{Gender, Presence, PusCell, YesNo};
    use crate::types::record::{FeatureValue, MISSING_LAB_COLUMNS};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns fixed outputs and remembers the records it saw.
    struct FixedPredictor {
        proba: [f64; 2],
        class: u8,
        calls: AtomicUsize,
        seen: Mutex<Vec<PatientRecord>>,
    }

    impl FixedPredictor {
        fn new(positive: f64, class: u8) -> Self {
            Self {
                proba: [1.0 - positive, positive],
                class,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Predictor for FixedPredictor {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict_proba(&self, record: &PatientRecord) -> Result<[f64; 2], PredictionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(record.clone());
            Ok(self.proba)
        }

        fn predict_class(&self, _record: &PatientRecord) -> Result<u8, PredictionError> {
            Ok(self.class)
        }
    }

    struct FailingPredictor;

    impl Predictor for FailingPredictor {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict_proba(&self, _record: &PatientRecord) -> Result<[f64; 2], PredictionError> {
            Err(PredictionError::Inference("feature names mismatch".to_string()))
        }

        fn predict_class(&self, _record: &PatientRecord) -> Result<u8, PredictionError> {
            Ok(0)
        }
    }

    /// Panics on the first call only.
    struct PanicOncePredictor {
        calls: AtomicUsize,
    }

    impl Predictor for PanicOncePredictor {
        fn name(&self) -> &str {
            "panic-once"
        }

        fn predict_proba(&self, _record: &PatientRecord) -> Result<[f64; 2], PredictionError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("model exploded");
            }
            Ok([0.6, 0.4])
        }

        fn predict_class(&self, _record: &PatientRecord) -> Result<u8, PredictionError> {
            Ok(0)
        }
    }

    fn handler(predictor: Arc<dyn Predictor>) -> (SubmissionHandler, Arc<SubmissionMetrics>) {
        let metrics = Arc::new(SubmissionMetrics::new());
        (SubmissionHandler::new(predictor, metrics.clone()), metrics)
    }

    fn demo_handler() -> SubmissionHandler {
        let predictor =
            LinearPredictor::from_artifact(LinearModelArtifact::demonstration()).unwrap();
        handler(Arc::new(predictor)).0
    }

    fn boundary_form() -> PatientForm {
        PatientForm {
            age: 0,
            gender: Gender::Male,
            blood_pressure: 0,
            specific_gravity: 1.000,
            albumin: 0,
            sugar: 0,
            pus_cell: PusCell::Normal,
            pus_cell_clumps: Presence::Absent,
            bacteria: Presence::Absent,
            blood_glucose_random: 0,
            blood_urea: 0,
            serum_creatinine: 0.0,
            sodium: 0,
            potassium: 0.0,
            hemoglobin: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_form_renders_prediction() {
        let (handler, metrics) = handler(Arc::new(FixedPredictor::new(0.82, 1)));

        let result = handler.handle_submission(&PatientForm::default());

        let report = result.report().expect("prediction expected");
        assert_eq!(report.probability, 0.82);
        assert_eq!(report.class, 1);
        assert_eq!(report.verdict.to_string(), "Positive");
        assert_eq!(report.probability_percent(), "82.00%");
        assert_eq!(metrics.snapshot().positives, 1);
    }

    #[test]
    fn test_record_passed_to_predictor_has_missing_labs() {
        let predictor = Arc::new(FixedPredictor::new(0.1, 0));
        let (handler, _) = handler(predictor.clone());

        handler.handle_submission(&boundary_form());

        let seen = predictor.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 24);
        for column in MISSING_LAB_COLUMNS {
            assert_eq!(seen[0].get(column), Some(&FeatureValue::Missing));
        }
    }

    #[test]
    fn test_boundary_scenario_is_well_formed() {
        let result = demo_handler().handle_submission(&boundary_form());
        let report = result.report().expect("prediction expected");
        assert!((0.0..=1.0).contains(&report.probability));
        assert!(report.class <= 1);
    }

    #[test]
    fn test_identical_submissions_are_idempotent() {
        let handler = demo_handler();
        let form = PatientForm {
            age: 72,
            hypertension: YesNo::Yes,
            serum_creatinine: 3.2,
            ..Default::default()
        };

        let first = handler.handle_submission(&form);
        let second = handler.handle_submission(&form);
        let (a, b) = (first.report().unwrap(), second.report().unwrap());

        assert_eq!(a.probability, b.probability);
        assert_eq!(a.class, b.class);
        assert_ne!(a.submission_id, b.submission_id);
    }

    #[test]
    fn test_valid_grid_always_yields_probability_and_class() {
        let handler = demo_handler();
        for age in [0, 45, 120] {
            for creatinine in [0.0, 1.2, 50.0] {
                for hemoglobin in [0.0, 13.5, 30.0] {
                    for flag in [YesNo::No, YesNo::Yes] {
                        let form = PatientForm {
                            age,
                            serum_creatinine: creatinine,
                            hemoglobin,
                            diabetes_mellitus: flag,
                            anemia: flag,
                            ..Default::default()
                        };
                        let result = handler.handle_submission(&form);
                        let report = result.report().expect("prediction expected");
                        assert!((0.0..=1.0).contains(&report.probability));
                        assert!(report.class <= 1);
                    }
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_rejected_without_calling_predictor() {
        let predictor = Arc::new(FixedPredictor::new(0.5, 1));
        let (handler, metrics) = handler(predictor.clone());

        let form = PatientForm {
            blood_pressure: 301,
            ..Default::default()
        };
        match handler.handle_submission(&form) {
            DisplayResult::Rejected(violations) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "blood_pressure");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(metrics.snapshot().rejected, 1);
    }

    #[test]
    fn test_predictor_error_is_surfaced() {
        let (handler, metrics) = handler(Arc::new(FailingPredictor));

        match handler.handle_submission(&PatientForm::default()) {
            DisplayResult::Failed(message) => {
                assert!(message.starts_with("Error making prediction:"));
                assert!(message.contains("feature names mismatch"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(metrics.snapshot().failed, 1);
    }

    #[test]
    fn test_predictor_panic_is_contained_and_next_submission_succeeds() {
        let (handler, _) = handler(Arc::new(PanicOncePredictor {
            calls: AtomicUsize::new(0),
        }));

        match handler.handle_submission(&PatientForm::default()) {
            DisplayResult::Failed(message) => assert!(message.contains("model exploded")),
            other => panic!("expected failure, got {:?}", other),
        }

        let result = handler.handle_submission(&PatientForm::default());
        assert_eq!(result.report().map(|r| r.class), Some(0));
    }

    #[test]
    fn test_out_of_range_predictor_output_is_failure() {
        let (handler, _) = handler(Arc::new(FixedPredictor::new(1.7, 1)));
        assert!(matches!(
            handler.handle_submission(&PatientForm::default()),
            DisplayResult::Failed(_)
        ));

        let (handler, _) = handler_with_class(2);
        assert!(matches!(
            handler.handle_submission(&PatientForm::default()),
            DisplayResult::Failed(_)
        ));
    }

    fn handler_with_class(class: u8) -> (SubmissionHandler, Arc<SubmissionMetrics>) {
        handler(Arc::new(FixedPredictor::new(0.5, class)))
    }
}
