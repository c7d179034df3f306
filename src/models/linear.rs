//! Logistic-regression predictor loaded from a JSON artifact.
//!
//! The artifact carries the whole preprocessing chain the model was trained
//! with: per-column imputation values for missing cells, standard-scaler
//! parameters, coefficients, intercept and decision threshold.

use crate::error::{ModelError, PredictionError};
use crate::feature_encoder::FeatureEncoder;
use crate::models::predictor::Predictor;
use crate::types::record::{PatientRecord, RECORD_SCHEMA};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

fn default_threshold() -> f64 {
    0.5
}

/// Serialized logistic-regression model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModelArtifact {
    pub name: String,
    /// Must equal the record schema, in order
    pub feature_names: Vec<String>,
    /// Replacement for missing cells, in raw feature units
    pub impute: Vec<f64>,
    pub scaler_mean: Vec<f64>,
    pub scaler_scale: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LinearModelArtifact {
    /// Check the artifact against the record schema.
    pub fn validate(&self) -> Result<(), String> {
        let expected: Vec<&str> = RECORD_SCHEMA.iter().map(|c| c.name).collect();
        let actual: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        if actual != expected {
            return Err(format!(
                "feature names {:?} do not match the record schema {:?}",
                actual, expected
            ));
        }

        let n = expected.len();
        for (label, values) in [
            ("impute", &self.impute),
            ("scaler_mean", &self.scaler_mean),
            ("scaler_scale", &self.scaler_scale),
            ("coefficients", &self.coefficients),
        ] {
            if values.len() != n {
                return Err(format!("{} has {} entries, expected {}", label, values.len(), n));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(format!("{} contains non-finite values", label));
            }
        }

        if let Some(i) = self.scaler_scale.iter().position(|s| *s == 0.0) {
            return Err(format!("scaler_scale for '{}' is zero", expected[i]));
        }
        if !self.intercept.is_finite() {
            return Err("intercept is not finite".to_string());
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(format!("threshold {} outside (0, 1)", self.threshold));
        }

        Ok(())
    }

    /// Hand-set demonstration model with clinically plausible signs.
    ///
    /// Not trained on data; used by the `demo_model` tool and in tests.
    pub fn demonstration() -> Self {
        // (mean, scale, coefficient) per schema column
        let params: [(f64, f64, f64); 24] = [
            (51.0, 17.0, 0.3),      // age
            (0.5, 0.5, 0.0),        // gender
            (125.0, 20.0, 0.4),     // blood_pressure
            (1.017, 0.0057, -1.2),  // specific_gravity
            (1.0, 1.35, 1.0),       // albumin
            (0.45, 1.1, 0.3),       // sugar
            (0.2, 0.4, 0.4),        // pus_cell
            (0.1, 0.3, 0.3),        // pus_cell_clumps
            (0.06, 0.23, 0.1),      // bacteria
            (148.0, 79.0, 0.4),     // blood_glucose_random
            (57.0, 50.0, 0.6),      // blood_urea
            (3.0, 5.7, 0.8),        // serum_creatinine
            (137.0, 10.0, -0.4),    // sodium
            (4.6, 3.2, 0.1),        // potassium
            (12.5, 2.9, -1.3),      // hemoglobin
            (38.9, 9.0, -0.8),      // packed_cell_volume
            (8400.0, 2900.0, 0.1),  // white_blood_cell_count
            (4.7, 1.0, -0.6),       // red_blood_cell_count
            (0.37, 0.48, 0.8),      // hypertension
            (0.34, 0.47, 0.8),      // diabetes_mellitus
            (0.08, 0.28, 0.2),      // coronary_artery_disease
            (0.2, 0.4, 0.5),        // appetite
            (0.15, 0.36, 0.4),      // anemia
            (0.19, 0.39, 0.5),      // pedal_edema
        ];

        // Training-set medians for the labs the form never collects
        let mut impute: Vec<f64> = params.iter().map(|(mean, _, _)| *mean).collect();
        impute[15] = 40.0;
        impute[16] = 8000.0;
        impute[17] = 4.8;

        Self {
            name: "ckd-demo-logistic".to_string(),
            feature_names: RECORD_SCHEMA.iter().map(|c| c.name.to_string()).collect(),
            impute,
            scaler_mean: params.iter().map(|(mean, _, _)| *mean).collect(),
            scaler_scale: params.iter().map(|(_, scale, _)| *scale).collect(),
            coefficients: params.iter().map(|(_, _, coef)| *coef).collect(),
            intercept: -0.6,
            threshold: 0.5,
        }
    }
}

/// Logistic-regression predictor
pub struct LinearPredictor {
    artifact: LinearModelArtifact,
    encoder: FeatureEncoder,
}

impl LinearPredictor {
    pub fn from_artifact(artifact: LinearModelArtifact) -> Result<Self, ModelError> {
        artifact.validate().map_err(ModelError::Schema)?;
        Ok(Self {
            artifact,
            encoder: FeatureEncoder::new(),
        })
    }

    /// Load and validate a JSON artifact.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: LinearModelArtifact =
            serde_json::from_str(&raw).map_err(|e| ModelError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!(
            model = %artifact.name,
            path = %path.display(),
            threshold = artifact.threshold,
            "Linear model loaded"
        );

        Self::from_artifact(artifact)
    }

    /// Override the artifact's decision threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, ModelError> {
        self.artifact.threshold = threshold;
        self.artifact.validate().map_err(ModelError::Schema)?;
        Ok(self)
    }

    fn positive_probability(&self, record: &PatientRecord) -> Result<f64, PredictionError> {
        let features = self.encoder.encode(record)?;
        let a = &self.artifact;

        let logit = features
            .iter()
            .enumerate()
            .fold(a.intercept, |acc, (i, &x)| {
                let x = if x.is_nan() { a.impute[i] } else { f64::from(x) };
                acc + a.coefficients[i] * (x - a.scaler_mean[i]) / a.scaler_scale[i]
            });

        let probability = 1.0 / (1.0 + (-logit).exp());
        debug!(model = %a.name, logit = logit, probability = probability, "Linear model scored");
        Ok(probability)
    }
}

impl Predictor for LinearPredictor {
    fn name(&self) -> &str {
        &self.artifact.name
    }

    fn predict_proba(&self, record: &PatientRecord) -> Result<[f64; 2], PredictionError> {
        let p = self.positive_probability(record)?;
        Ok([1.0 - p, p])
    }

    fn predict_class(&self, record: &PatientRecord) -> Result<u8, PredictionError> {
        let p = self.positive_probability(record)?;
        Ok(u8::from(p >= self.artifact.threshold))
    }
}
