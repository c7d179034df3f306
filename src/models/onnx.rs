//! ONNX Runtime predictor for exported classification pipelines

use crate::error::PredictionError;
use crate::feature_encoder::FeatureEncoder;
use crate::models::predictor::Predictor;
use crate::types::record::PatientRecord;
use ort::memory::Allocator;
use ort::session::{Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Loaded ONNX classifier.
///
/// The graph takes one `float[1, 24]` input in [`FeatureEncoder`] order and
/// produces a label output plus a probability output, either as a
/// `[1, 2]` tensor or as `seq(map(int64, float))`.
pub struct OnnxPredictor {
    name: String,
    /// Running a session needs `&mut`; the lock never outlives one inference
    session: Mutex<Session>,
    input_name: String,
    probability_output: String,
    label_output: Option<String>,
    encoder: FeatureEncoder,
    /// Used to derive the class when the graph has no label output
    threshold: f64,
}

impl OnnxPredictor {
    pub fn new(name: &str, session: Session, threshold: f64) -> Self {
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "probabilities".to_string())
            });

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        debug!(
            model = %name,
            input = %input_name,
            probability_output = %probability_output,
            label_output = ?label_output,
            "ONNX predictor bound"
        );

        Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            probability_output,
            label_output,
            encoder: FeatureEncoder::new(),
            threshold,
        }
    }

    /// A panic during a previous inference poisons the lock but leaves the
    /// session usable, so the guard is recovered.
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn input_tensor(&self, record: &PatientRecord) -> Result<Tensor<f32>, PredictionError> {
        let features = self.encoder.encode(record)?;
        let shape = vec![1_i64, features.len() as i64];
        Tensor::from_array((shape, features))
            .map_err(|e| PredictionError::Inference(format!("failed to create input tensor: {e}")))
    }

    /// Extract the positive-class probability from model outputs.
    /// Handles both tensor outputs and seq(map) outputs.
    fn extract_probability(&self, outputs: &SessionOutputs) -> Result<f64, PredictionError> {
        if let Some(output) = outputs.get(self.probability_output.as_str()) {
            if let Some(prob) = self.probability_from_value(output) {
                return Ok(prob);
            }
        }

        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Some(prob) = self.probability_from_value(&output) {
                debug!(
                    model = %self.name,
                    output = %name,
                    prob = prob,
                    "Extracted probability (fallback)"
                );
                return Ok(prob);
            }
        }

        Err(PredictionError::InvalidOutput(format!(
            "no probability output found in model '{}'",
            self.name
        )))
    }

    fn probability_from_value(&self, output: &ort::value::DynValue) -> Option<f64> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return positive_from_tensor(&dims, data);
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            match self.extract_from_sequence_map(output) {
                Ok(prob) => return Some(prob),
                Err(e) => warn!(model = %self.name, error = %e, "Unreadable seq(map) output"),
            }
        }

        None
    }

    /// Extract probability from seq(map(int64, float)), the zipmap layout
    /// many classifier exporters emit.
    fn extract_from_sequence_map(
        &self,
        output: &ort::value::DynValue,
    ) -> Result<f64, PredictionError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| PredictionError::InvalidOutput(format!("not a sequence: {e}")))?;

        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(|e| PredictionError::InvalidOutput(e.to_string()))?;

        // Batch size is always one
        let first = maps
            .first()
            .ok_or_else(|| PredictionError::InvalidOutput("empty probability sequence".into()))?;

        let pairs = first
            .try_extract_key_values::<i64, f32>()
            .map_err(|e| PredictionError::InvalidOutput(e.to_string()))?;

        positive_from_class_map(&pairs)
    }

    fn extract_label(&self, outputs: &SessionOutputs) -> Option<Result<u8, PredictionError>> {
        let name = self.label_output.as_deref()?;
        let output = outputs.get(name)?;

        Some(match output.try_extract_tensor::<i64>() {
            Ok((_, data)) => label_from_tensor(data),
            Err(e) => Err(PredictionError::InvalidOutput(e.to_string())),
        })
    }
}

/// Binary class from the first entry of a label tensor.
fn label_from_tensor(data: &[i64]) -> Result<u8, PredictionError> {
    match data.first() {
        Some(0) => Ok(0),
        Some(1) => Ok(1),
        Some(other) => Err(PredictionError::InvalidOutput(format!(
            "label {other} is not a binary class"
        ))),
        None => Err(PredictionError::InvalidOutput("empty label output".into())),
    }
}

/// Positive-class probability from one zipmap row. Falls back to the
/// complement of class 0 when class 1 is absent.
fn positive_from_class_map(pairs: &[(i64, f32)]) -> Result<f64, PredictionError> {
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Ok(f64::from(*prob));
    }
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - f64::from(*prob));
    }

    Err(PredictionError::InvalidOutput(
        "probability map has no class 0 or 1".to_string(),
    ))
}

/// Positive-class probability from a `[batch, classes]`, `[classes]` or
/// single-probability tensor.
fn positive_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = match dims {
        [_, classes] | [classes] => *classes,
        _ => return data.last().map(|&v| f64::from(v)),
    };

    match classes {
        c if c >= 2 => data.get(1).map(|&v| f64::from(v)),
        1 => data.first().map(|&v| f64::from(v)),
        _ => None,
    }
}

impl Predictor for OnnxPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, record: &PatientRecord) -> Result<[f64; 2], PredictionError> {
        let input = self.input_tensor(record)?;
        let mut session = self.lock_session();

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| PredictionError::Inference(e.to_string()))?;

        let p = self.extract_probability(&outputs)?;
        debug!(model = %self.name, probability = p, "ONNX probability computed");
        Ok([1.0 - p, p])
    }

    fn predict_class(&self, record: &PatientRecord) -> Result<u8, PredictionError> {
        let input = self.input_tensor(record)?;
        let mut session = self.lock_session();

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| PredictionError::Inference(e.to_string()))?;

        if let Some(label) = self.extract_label(&outputs) {
            return label;
        }

        let p = self.extract_probability(&outputs)?;
        Ok(u8::from(p >= self.threshold))
    }
}
