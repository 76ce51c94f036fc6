//! Model host: a loaded binary classifier with an optional probability capability.
//!
//! Artifacts are picked by extension: `.onnx` runs through ONNX Runtime, `.json` is a
//! LightGBM `dump_model()` evaluated natively. A missing or unloadable artifact leaves the
//! host empty; callers report that state instead of failing.

mod gbdt;
mod onnx;

pub use gbdt::LightGbmModel;
pub use onnx::OnnxModel;

use crate::features::FeatureVector;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),

    #[error("model features do not match schema: {0}")]
    SchemaMismatch(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("inference failed: {0}")]
    Runtime(String),
}

/// Discrete classification: 1 = rain tomorrow, 0 = no rain.
pub trait Classifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> Result<i64, ModelError>;
}

/// Probability of label 1, on top of classification.
pub trait ProbabilityEstimator: Classifier {
    fn probability(&self, features: &FeatureVector) -> Result<f64, ModelError>;

    /// Label and probability together. Override when both come out of one model run.
    fn predict(&self, features: &FeatureVector) -> Result<(i64, f64), ModelError> {
        Ok((self.classify(features)?, self.probability(features)?))
    }
}

#[derive(Clone)]
enum Capability {
    Label(Arc<dyn Classifier>),
    Probability(Arc<dyn ProbabilityEstimator>),
}

/// A loaded model. Whether it can report probabilities is fixed at construction.
#[derive(Clone)]
pub struct Model {
    format: &'static str,
    capability: Capability,
}

impl Model {
    /// Label-only model.
    pub fn new(format: &'static str, classifier: impl Classifier + 'static) -> Self {
        Self {
            format,
            capability: Capability::Label(Arc::new(classifier)),
        }
    }

    /// Model with both capabilities.
    pub fn with_probability(format: &'static str, model: impl ProbabilityEstimator + 'static) -> Self {
        Self {
            format,
            capability: Capability::Probability(Arc::new(model)),
        }
    }

    /// Read an artifact and load it, dispatching on its extension.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_artifact(path, &bytes)
    }

    /// `bytes` is the content of `path`. ONNX Runtime reopens the file itself.
    pub fn from_artifact(path: &Path, bytes: &[u8]) -> Result<Self, ModelError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Self::with_probability(
                "lightgbm-json",
                LightGbmModel::from_slice(bytes)?,
            )),
            "onnx" => {
                let onnx = OnnxModel::load(path)?;
                if onnx.has_probability() {
                    Ok(Self::with_probability("onnx", onnx))
                } else {
                    Ok(Self::new("onnx", onnx))
                }
            }
            other => Err(ModelError::UnsupportedFormat(format!(
                "{} (expected .onnx or .json)",
                if other.is_empty() { "<no extension>" } else { other }
            ))),
        }
    }

    pub fn format(&self) -> &'static str {
        self.format
    }

    pub fn has_probability(&self) -> bool {
        matches!(self.capability, Capability::Probability(_))
    }

    /// One model call. Probability is `None` when the model has no probability capability.
    pub fn predict(&self, features: &FeatureVector) -> Result<(i64, Option<f64>), ModelError> {
        match &self.capability {
            Capability::Label(classifier) => Ok((classifier.classify(features)?, None)),
            Capability::Probability(estimator) => {
                let (label, p) = estimator.predict(features)?;
                Ok((label, Some(p)))
            }
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("format", &self.format)
            .field("has_probability", &self.has_probability())
            .finish()
    }
}

/// Read-only handle to the (possibly absent) model, cloned into request state.
#[derive(Debug, Clone, Default)]
pub struct ModelHost {
    model: Option<Arc<Model>>,
    sha256: Option<String>,
}

impl ModelHost {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_model(model: Model) -> Self {
        Self {
            model: Some(Arc::new(model)),
            sha256: None,
        }
    }

    /// Load from path. Missing, unreadable or invalid artifacts yield an empty host, logged.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "model artifact not found; predictions disabled");
            return Self::empty();
        }
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "model artifact unreadable; predictions disabled");
                return Self::empty();
            }
        };
        match Model::from_artifact(path, &bytes) {
            Ok(model) => {
                let digest = format!("{:x}", Sha256::digest(&bytes));
                tracing::info!(
                    path = %path.display(),
                    format = model.format(),
                    has_probability = model.has_probability(),
                    sha256 = %digest,
                    "model loaded"
                );
                Self {
                    model: Some(Arc::new(model)),
                    sha256: Some(digest),
                }
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "model load failed; predictions disabled");
                Self::empty()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_deref()
    }

    /// SHA-256 of the artifact bytes, when loaded from a file.
    pub fn sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }
}
