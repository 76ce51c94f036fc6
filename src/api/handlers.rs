use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use super::error::ApiError;
use super::SharedState;
use crate::features::{parse_payload, FEATURE_NAMES};
use crate::inference::{PredictError, PredictionResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub features: Vec<String>,
}

pub(super) async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: state.service.host().is_loaded(),
    })
}

pub(super) async fn handle_features() -> Json<FeaturesResponse> {
    Json(FeaturesResponse {
        features: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
    })
}

pub(super) async fn handle_predict(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<PredictionResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("predict", %request_id);
    predict(state, body).instrument(span).await
}

async fn predict(state: SharedState, body: Bytes) -> Result<Json<PredictionResponse>, ApiError> {
    // Unavailability wins over payload problems.
    if !state.service.host().is_loaded() {
        debug!("predict rejected: no model loaded");
        return Err(PredictError::ModelUnavailable.into());
    }

    let payload = parse_payload(&body).map_err(|e| {
        debug!(error = %e, "rejected request body");
        ApiError::from(e)
    })?;

    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.predict(&payload))
        .await
        .map_err(|e| {
            error!(error = %e, "inference worker failed");
            ApiError::internal(format!("inference worker failed: {e}"))
        })?;

    match result {
        Ok(response) => {
            info!(
                prediction = response.prediction,
                probability = ?response.probability,
                intensity = ?response.intensity,
                "prediction served"
            );
            Ok(Json(response))
        }
        Err(PredictError::Validation(e)) => {
            debug!(field = ?e.field(), error = %e, "validation failed");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "prediction failed");
            Err(e.into())
        }
    }
}
