//! Inference request handling: validation, model call, response shaping.

mod intensity;
mod service;

pub use intensity::{Intensity, IntensityScale};
pub use service::{PredictError, PredictionResponse, PredictionService, RainTomorrow};
