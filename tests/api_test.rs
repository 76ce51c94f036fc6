//! HTTP surface exercised in-process through the router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rainfall_api::{
    api::{build_router, AppState, FeaturesResponse, HealthResponse},
    config::WebConfig,
    features::{FeatureVector, FEATURE_NAMES},
    inference::{IntensityScale, PredictionService},
    model::{Classifier, Model, ModelError, ModelHost, ProbabilityEstimator},
};
use serde_json::{json, Value};
use std::path::Path;
use tower::util::ServiceExt;

/// Deterministic stand-in for a trained classifier.
struct FixedModel {
    label: i64,
    probability: f64,
}

impl Classifier for FixedModel {
    fn classify(&self, _features: &FeatureVector) -> Result<i64, ModelError> {
        Ok(self.label)
    }
}

impl ProbabilityEstimator for FixedModel {
    fn probability(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Ok(self.probability)
    }
}

struct LabelOnly(i64);

impl Classifier for LabelOnly {
    fn classify(&self, _features: &FeatureVector) -> Result<i64, ModelError> {
        Ok(self.0)
    }
}

struct Failing;

impl Classifier for Failing {
    fn classify(&self, _features: &FeatureVector) -> Result<i64, ModelError> {
        Err(ModelError::Runtime("tensor shape mismatch".into()))
    }
}

struct Panicking;

impl Classifier for Panicking {
    fn classify(&self, _features: &FeatureVector) -> Result<i64, ModelError> {
        panic!("model crashed")
    }
}

fn web_config() -> WebConfig {
    WebConfig {
        index_path: "does-not-exist/index.html".into(),
        static_dir: "does-not-exist/static".into(),
        cors: true,
    }
}

fn app_with(host: ModelHost) -> Router {
    let service = PredictionService::new(host, IntensityScale::default());
    build_router(AppState::new(service), &web_config())
}

fn app_with_stub(label: i64, probability: f64) -> Router {
    app_with(ModelHost::with_model(Model::with_probability(
        "stub",
        FixedModel { label, probability },
    )))
}

fn valid_payload() -> Value {
    json!({
        "MinTemp": 13.4,
        "MaxTemp": 22.9,
        "Rainfall": 0.6,
        "WindGustSpeed": 44,
        "WindSpeed9am": 20,
        "WindSpeed3pm": 24,
        "Humidity9am": 71,
        "Humidity3pm": 22,
        "Pressure9am": 1007.7,
        "Pressure3pm": 1007.1,
        "Temp9am": 16.9,
        "Temp3pm": 21.8,
        "RainToday": 0
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

async fn post_predict(app: Router, payload: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

#[tokio::test]
async fn health_reports_model_state() {
    let (status, body) = get(app_with(ModelHost::empty()), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(health.status, "ok");
    assert!(!health.model_loaded);

    let (_, body) = get(app_with_stub(1, 0.8), "/api/health").await;
    assert_eq!(body, json!({"status": "ok", "model_loaded": true}));
}

#[tokio::test]
async fn features_are_listed_in_schema_order() {
    for host in [ModelHost::empty(), ModelHost::with_model(Model::new("stub", LabelOnly(0)))] {
        let (status, body) = get(app_with(host), "/api/features").await;
        assert_eq!(status, StatusCode::OK);
        let features: FeaturesResponse = serde_json::from_value(body).unwrap();
        assert_eq!(features.features, FEATURE_NAMES);
    }
}

#[tokio::test]
async fn predict_without_model_is_unavailable() {
    let (status, body) = post_predict(app_with(ModelHost::empty()), &valid_payload()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().starts_with("Model not loaded"));
}

#[tokio::test]
async fn heavy_rain_prediction() {
    let (status, body) = post_predict(app_with_stub(1, 0.80), &valid_payload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "prediction": 1,
            "rain_tomorrow": "Yes",
            "probability": 0.8,
            "intensity": "Heavy",
            "intensity_suggestion": "Protect crops & livestock"
        })
    );
}

#[tokio::test]
async fn intensity_bands_and_boundaries() {
    let cases = [
        (0.50, "Moderate", "Avoid fertilizer spraying"),
        (0.10, "Light", "Normal activities with caution"),
        (0.34, "Moderate", "Avoid fertilizer spraying"),
        (0.67, "Heavy", "Protect crops & livestock"),
    ];
    for (probability, intensity, suggestion) in cases {
        let (status, body) = post_predict(app_with_stub(0, probability), &valid_payload()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rain_tomorrow"], "No");
        assert_eq!(body["prediction"], 0);
        assert_eq!(body["intensity"], intensity, "probability {probability}");
        assert_eq!(body["intensity_suggestion"], suggestion);
    }
}

#[tokio::test]
async fn probability_is_rounded_to_four_places() {
    let (_, body) = post_predict(app_with_stub(1, 0.734_567_8), &valid_payload()).await;
    assert_eq!(body["probability"], json!(0.7346));
}

#[tokio::test]
async fn label_only_model_defaults_to_light() {
    let app = app_with(ModelHost::with_model(Model::new("stub", LabelOnly(1))));
    let (status, body) = post_predict(app, &valid_payload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "prediction": 1,
            "rain_tomorrow": "Yes",
            "probability": null,
            "intensity": "Light",
            "intensity_suggestion": "Normal activities with caution"
        })
    );
}

#[tokio::test]
async fn missing_field_names_the_field() {
    for name in FEATURE_NAMES {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove(name);
        let (status, body) = post_predict(app_with_stub(1, 0.8), &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], format!("Missing or invalid value for: {name}"));
    }
}

#[tokio::test]
async fn null_and_empty_values_are_missing() {
    for value in [Value::Null, json!("")] {
        let mut payload = valid_payload();
        payload["Humidity9am"] = value;
        let (status, body) = post_predict(app_with_stub(1, 0.8), &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing or invalid value for: Humidity9am");
    }
}

#[tokio::test]
async fn non_numeric_field_names_the_field() {
    for name in FEATURE_NAMES {
        let mut payload = valid_payload();
        payload[name] = json!("abc");
        let (status, body) = post_predict(app_with_stub(1, 0.8), &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], format!("Invalid number for: {name}"));
    }
}

#[tokio::test]
async fn numeric_strings_are_accepted() {
    let mut payload = valid_payload();
    payload["Pressure3pm"] = json!("1007.1");
    payload["RainToday"] = json!("0");
    let (status, _) = post_predict(app_with_stub(1, 0.8), &payload).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn boolean_flags_are_accepted() {
    let mut payload = valid_payload();
    payload["RainToday"] = json!(true);
    let (status, body) = post_predict(app_with_stub(1, 0.8), &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rain_tomorrow"], "Yes");
}

#[tokio::test]
async fn extra_keys_do_not_change_the_result() {
    let (_, plain) = post_predict(app_with_stub(1, 0.55), &valid_payload()).await;
    let mut payload = valid_payload();
    payload["Location"] = json!("Albury");
    payload["WindGustDir"] = json!("W");
    payload["Evaporation"] = Value::Null;
    let (status, extra) = post_predict(app_with_stub(1, 0.55), &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plain, extra);
}

#[tokio::test]
async fn body_level_errors_are_client_faults() {
    let app = app_with_stub(1, 0.8);
    let empty = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.clone(), empty).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing or invalid value for: MinTemp");

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from("{\"MinTemp\": "))
        .unwrap();
    let (status, body) = send(app.clone(), malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));

    let (status, body) = post_predict(app, &json!([1, 2, 3])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request body must be a JSON object");
}

#[tokio::test]
async fn out_of_domain_label_is_internal_fault() {
    let (status, body) = post_predict(app_with_stub(2, 0.9), &valid_payload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("label 2"));
}

#[tokio::test]
async fn probability_outside_unit_interval_is_internal_fault() {
    let (status, _) = post_predict(app_with_stub(1, 1.7), &valid_payload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn model_errors_surface_as_internal_faults() {
    let app = app_with(ModelHost::with_model(Model::new("stub", Failing)));
    let (status, body) = post_predict(app, &valid_payload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "inference failed: tensor shape mismatch");

    let app = app_with(ModelHost::with_model(Model::new("stub", Panicking)));
    let (status, body) = post_predict(app, &valid_payload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn static_files_and_index() {
    let dir = tempfile::tempdir().unwrap();
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>rain</html>").unwrap();
    std::fs::write(static_dir.join("app.js"), "console.log('rain');").unwrap();

    let web = WebConfig {
        index_path: dir.path().join("index.html"),
        static_dir,
        cors: false,
    };
    let service = PredictionService::new(ModelHost::empty(), IntensityScale::default());
    let app = build_router(AppState::new(service), &web);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"<html>rain</html>");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/static/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/static/missing.css").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shipped_ui_renders_field_advice() {
    let templates = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    let web = WebConfig {
        index_path: templates.join("index.html"),
        static_dir: templates.join("static"),
        cors: false,
    };
    let service = PredictionService::new(ModelHost::empty(), IntensityScale::default());
    let app = build_router(AppState::new(service), &web);

    let fetch = |uri: &'static str| {
        let app = app.clone();
        async move {
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            String::from_utf8(body.to_vec()).unwrap()
        }
    };

    let index = fetch("/").await;
    assert!(index.contains(r#"id="agriList""#));
    let script = fetch("/static/app.js").await;
    for advice in ["Delay irrigation", "Avoid harvesting today", "Proceed with irrigation", "Prepare land for sowing"] {
        assert!(script.contains(advice), "{advice}");
    }
    assert!(script.contains("(data.probability * 100).toFixed(1)"));
}
