//! Pipeline benchmark: request body → validation → stub model → shaped response.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rainfall_api::features::{build_feature_vector, parse_payload, FeatureVector, FEATURE_NAMES};
use rainfall_api::inference::{IntensityScale, PredictionService};
use rainfall_api::model::{Classifier, Model, ModelError, ModelHost, ProbabilityEstimator};

struct Constant;

impl Classifier for Constant {
    fn classify(&self, _features: &FeatureVector) -> Result<i64, ModelError> {
        Ok(1)
    }
}

impl ProbabilityEstimator for Constant {
    fn probability(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Ok(0.72)
    }
}

fn body() -> Vec<u8> {
    let map: serde_json::Map<String, serde_json::Value> = FEATURE_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), serde_json::json!(format!("{}.5", i))))
        .collect();
    serde_json::to_vec(&map).unwrap()
}

fn bench_validation(c: &mut Criterion) {
    let payload = parse_payload(&body()).unwrap();

    c.bench_function("validate_13_numeric_strings", |b| {
        b.iter(|| build_feature_vector(black_box(&payload)))
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let service = PredictionService::new(
        ModelHost::with_model(Model::with_probability("bench", Constant)),
        IntensityScale::default(),
    );
    let raw = body();

    c.bench_function("body_to_response", |b| {
        b.iter(|| {
            let payload = parse_payload(black_box(&raw)).unwrap();
            black_box(service.predict(&payload))
        })
    });
}

criterion_group!(benches, bench_validation, bench_full_pipeline);
criterion_main!(benches);
