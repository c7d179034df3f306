//! Predictor backends and model loading

pub mod linear;
pub mod loader;
pub mod onnx;
pub mod predictor;

pub use linear::{LinearModelArtifact, LinearPredictor};
pub use loader::{ModelLoader, PredictorCache};
pub use onnx::OnnxPredictor;
pub use predictor::Predictor;
