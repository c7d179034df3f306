//! Model artifact loading

use crate::config::{ModelConfig, ModelFormat};
use crate::error::ModelError;
use crate::models::linear::LinearPredictor;
use crate::models::onnx::OnnxPredictor;
use crate::models::predictor::Predictor;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

fn runtime_error(e: impl std::fmt::Display) -> ModelError {
    ModelError::Runtime(e.to_string())
}

/// Loader for predictor artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
    /// Decision threshold override
    threshold: Option<f64>,
}

impl ModelLoader {
    pub fn new(onnx_threads: usize, threshold: Option<f64>) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
            threshold,
        }
    }

    /// Load a predictor of the given format from `path`.
    pub fn load<P: AsRef<Path>>(
        &self,
        path: P,
        format: ModelFormat,
    ) -> Result<Arc<dyn Predictor>, ModelError> {
        let path = path.as_ref();
        if let Some(threshold) = self.threshold {
            if !(threshold > 0.0 && threshold < 1.0) {
                return Err(ModelError::Schema(format!(
                    "threshold {} outside (0, 1)",
                    threshold
                )));
            }
        }
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let predictor: Arc<dyn Predictor> = match format {
            ModelFormat::Onnx => Arc::new(self.load_onnx(path)?),
            ModelFormat::Linear => {
                let predictor = LinearPredictor::from_file(path)?;
                match self.threshold {
                    Some(threshold) => Arc::new(predictor.with_threshold(threshold)?),
                    None => Arc::new(predictor),
                }
            }
        };

        info!(
            model = %predictor.name(),
            format = ?format,
            path = %path.display(),
            "Predictor loaded"
        );

        Ok(predictor)
    }

    fn load_onnx(&self, path: &Path) -> Result<OnnxPredictor, ModelError> {
        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(runtime_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime_error)?
            .with_intra_threads(self.onnx_threads)
            .map_err(runtime_error)?
            .commit_from_file(path)
            .map_err(|e| ModelError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        Ok(OnnxPredictor::new(
            &name,
            session,
            self.threshold.unwrap_or(0.5),
        ))
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(1, None)
    }
}

type LoadFn = dyn Fn() -> Result<Arc<dyn Predictor>, ModelError> + Send + Sync;

/// Load-once holder for the process predictor.
///
/// The first successful [`load_predictor`](Self::load_predictor) call runs
/// the source; later calls return the same instance. A failed load is not
/// cached.
pub struct PredictorCache {
    source: Box<LoadFn>,
    loaded: Mutex<Option<Arc<dyn Predictor>>>,
}

impl PredictorCache {
    /// Cache over an arbitrary loading function.
    pub fn new<F>(source: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Predictor>, ModelError> + Send + Sync + 'static,
    {
        Self {
            source: Box::new(source),
            loaded: Mutex::new(None),
        }
    }

    /// Cache over the artifact named by the model configuration.
    pub fn from_config(config: &ModelConfig) -> Self {
        let loader = ModelLoader::new(config.onnx_threads, config.threshold);
        let path = PathBuf::from(&config.path);
        let format = config.format;
        Self::new(move || loader.load(&path, format))
    }

    pub fn load_predictor(&self) -> Result<Arc<dyn Predictor>, ModelError> {
        let mut loaded = self
            .loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(predictor) = loaded.as_ref() {
            return Ok(Arc::clone(predictor));
        }

        let predictor = (self.source)()?;
        *loaded = Some(Arc::clone(&predictor));
        Ok(predictor)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
            .lock()
            .map(|loaded| loaded.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::linear::LinearModelArtifact;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn demo_predictor() -> Arc<dyn Predictor> {
        Arc::new(LinearPredictor::from_artifact(LinearModelArtifact::demonstration()).unwrap())
    }

    fn temp_artifact(artifact: &LinearModelArtifact) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ckd-model-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, serde_json::to_vec(artifact).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_cache_loads_once_and_returns_same_instance() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cache = PredictorCache::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(demo_predictor())
        });

        assert!(!cache.is_loaded());
        let first = cache.load_predictor().unwrap();
        let second = cache.load_predictor().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_loaded());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cache = PredictorCache::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ModelError::NotFound(PathBuf::from("models/model.onnx")))
        });

        assert!(cache.load_predictor().is_err());
        assert!(cache.load_predictor().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.is_loaded());
    }

    #[test]
    fn test_from_config_loads_linear_artifact() {
        let path = temp_artifact(&LinearModelArtifact::demonstration());
        let config = ModelConfig {
            path: path.to_string_lossy().into_owned(),
            format: ModelFormat::Linear,
            onnx_threads: 1,
            threshold: None,
        };

        let cache = PredictorCache::from_config(&config);
        let first = cache.load_predictor().unwrap();
        let second = cache.load_predictor().unwrap();

        assert_eq!(first.name(), "ckd-demo-logistic");
        assert!(Arc::ptr_eq(&first, &second));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_artifact_is_startup_error() {
        let loader = ModelLoader::default();
        let result = loader.load("models/does-not-exist.onnx", ModelFormat::Onnx);
        assert!(matches!(result, Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_linear_artifact_is_invalid() {
        let path = std::env::temp_dir().join(format!("ckd-model-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"{ not json").unwrap();

        let result = ModelLoader::default().load(&path, ModelFormat::Linear);
        assert!(matches!(result, Err(ModelError::Invalid { .. })));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_threshold_override_applies_to_linear_artifact() {
        let path = temp_artifact(&LinearModelArtifact::demonstration());
        let result = ModelLoader::new(1, Some(2.0)).load(&path, ModelFormat::Linear);
        assert!(matches!(result, Err(ModelError::Schema(_))));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_out_of_range_threshold_rejected_for_onnx() {
        let path = std::env::temp_dir().join(format!("ckd-model-{}.onnx", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"not a graph").unwrap();

        for threshold in [1.5, 0.0, 1.0, -0.2, f64::NAN] {
            let result = ModelLoader::new(1, Some(threshold)).load(&path, ModelFormat::Onnx);
            assert!(
                matches!(result, Err(ModelError::Schema(_))),
                "threshold {} was accepted",
                threshold
            );
        }
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_out_of_range_threshold_fails_from_config() {
        let config = ModelConfig {
            path: "models/model.onnx".to_string(),
            format: ModelFormat::Onnx,
            onnx_threads: 1,
            threshold: Some(1.5),
        };

        let cache = PredictorCache::from_config(&config);
        assert!(matches!(cache.load_predictor(), Err(ModelError::Schema(_))));
        assert!(!cache.is_loaded());
    }
}
