//! Rainfall API: HTTP inference service for next-day rain prediction.
//!
//! Modular structure:
//! - [`features`]: Feature schema and payload validation
//! - [`model`]: Model host, ONNX and LightGBM dump inference
//! - [`inference`]: Prediction service and intensity mapping
//! - [`api`]: axum router and error mapping
//! - [`logging`]: Structured JSON logging

pub mod api;
pub mod config;
pub mod features;
pub mod inference;
pub mod logging;
pub mod model;

pub use api::{build_router, AppState};
pub use config::ServiceConfig;
pub use features::{FeatureVector, FEATURE_NAMES};
pub use inference::{Intensity, IntensityScale, PredictionResponse, PredictionService};
pub use logging::StructuredLogger;
pub use model::{Model, ModelHost};
