//! Payload → feature vector → model → shaped response. Stateless apart from the model handle.

use super::intensity::{Intensity, IntensityScale};
use crate::features::{build_feature_vector, FeatureVector, ValidationError};
use crate::model::{ModelError, ModelHost};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Model not loaded. Export the trained model to the configured model path and restart the service.")]
    ModelUnavailable,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model returned label {0}, expected 0 or 1")]
    LabelOutOfDomain(i64),

    #[error("model returned probability {0}, expected a value in [0, 1]")]
    ProbabilityOutOfRange(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RainTomorrow {
    Yes,
    No,
}

impl RainTomorrow {
    pub fn from_label(label: i64) -> Result<Self, PredictError> {
        match label {
            1 => Ok(RainTomorrow::Yes),
            0 => Ok(RainTomorrow::No),
            other => Err(PredictError::LabelOutOfDomain(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: i64,
    pub rain_tomorrow: RainTomorrow,
    pub probability: Option<f64>,
    pub intensity: Intensity,
    pub intensity_suggestion: String,
}

#[derive(Debug, Clone)]
pub struct PredictionService {
    host: ModelHost,
    scale: IntensityScale,
}

impl PredictionService {
    pub fn new(host: ModelHost, scale: IntensityScale) -> Self {
        Self { host, scale }
    }

    pub fn host(&self) -> &ModelHost {
        &self.host
    }

    /// Validate the payload and run a single inference.
    pub fn predict(&self, payload: &Map<String, Value>) -> Result<PredictionResponse, PredictError> {
        if !self.host.is_loaded() {
            return Err(PredictError::ModelUnavailable);
        }
        let features = build_feature_vector(payload)?;
        self.predict_vector(&features)
    }

    pub fn predict_vector(&self, features: &FeatureVector) -> Result<PredictionResponse, PredictError> {
        let model = self.host.model().ok_or(PredictError::ModelUnavailable)?;

        let (label, probability) = model.predict(features)?;
        let rain_tomorrow = RainTomorrow::from_label(label)?;
        if let Some(p) = probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(PredictError::ProbabilityOutOfRange(p));
            }
        }

        let intensity = self.scale.classify_opt(probability);
        Ok(PredictionResponse {
            prediction: label,
            rain_tomorrow,
            probability: probability.map(round4),
            intensity,
            intensity_suggestion: intensity.suggestion().to_string(),
        })
    }
}

/// Nearest 4-decimal value of the exact binary `p`, not of `p * 10^4`.
fn round4(p: f64) -> f64 {
    format!("{p:.4}").parse().unwrap_or(p)
}
