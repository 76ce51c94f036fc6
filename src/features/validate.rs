//! Request payload → feature vector: schema order, presence and numeric coercion.

use super::{FeatureVector, FEATURE_DIM, FEATURE_NAMES};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing or invalid value for: {0}")]
    Missing(&'static str),

    #[error("Invalid number for: {0}")]
    InvalidNumber(&'static str),

    #[error("Invalid JSON body: {0}")]
    MalformedJson(String),

    #[error("Request body must be a JSON object")]
    NotAnObject,
}

impl ValidationError {
    /// Offending feature, for field-level errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::Missing(name) | ValidationError::InvalidNumber(name) => Some(name),
            ValidationError::MalformedJson(_) | ValidationError::NotAnObject => None,
        }
    }
}

/// Parse a raw request body. Empty bodies and `null` are treated as `{}`.
pub fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(ValidationError::NotAnObject),
    }
}

/// Walk the schema in order; the first missing or non-numeric field fails the whole payload.
/// Keys outside the schema are never read.
pub fn build_feature_vector(payload: &Map<String, Value>) -> Result<FeatureVector, ValidationError> {
    let mut values = [0.0f64; FEATURE_DIM];
    for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
        *slot = coerce(name, payload.get(name))?;
    }
    Ok(FeatureVector::new(values))
}

fn coerce(name: &'static str, value: Option<&Value>) -> Result<f64, ValidationError> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(ValidationError::Missing(name)),
        Some(Value::String(s)) if s.is_empty() => return Err(ValidationError::Missing(name)),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::InvalidNumber(name)),
    }
}
