//! Feature schema and request validation.

mod validate;

pub use validate::{build_feature_vector, parse_payload, ValidationError};

use serde::Serialize;

/// Number of numerical features expected by the model.
pub const FEATURE_DIM: usize = 13;

/// Feature order must match the column order used at training time.
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "MinTemp",
    "MaxTemp",
    "Rainfall",
    "WindGustSpeed",
    "WindSpeed9am",
    "WindSpeed3pm",
    "Humidity9am",
    "Humidity3pm",
    "Pressure9am",
    "Pressure3pm",
    "Temp9am",
    "Temp3pm",
    "RainToday",
];

/// Validated model input, positionally aligned to [`FEATURE_NAMES`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_DIM],
}

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_DIM]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// Single-precision copy for runtimes that take `float` tensors.
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}
