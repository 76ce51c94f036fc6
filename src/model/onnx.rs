//! ONNX Runtime inference. Input: [1, 13] f32. Outputs: `label` (int64) and, when exported,
//! `probabilities` ([1, 2] f32, ZipMap disabled).

use super::{Classifier, ModelError, ProbabilityEstimator};
use crate::features::{FeatureVector, FEATURE_DIM};
use ndarray::{Array2, CowArray};
use ort::tensor::OrtOwnedTensor;
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};

fn runtime_err(e: impl std::fmt::Display) -> ModelError {
    ModelError::Runtime(e.to_string())
}

pub struct OnnxModel {
    // Runs are serialized through the mutex.
    session: Mutex<Session>,
    label_output: usize,
    probability_output: Option<usize>,
    _env: Arc<Environment>,
}

impl OnnxModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let env = Environment::builder()
            .with_name("rainfall-api")
            .build()
            .map_err(runtime_err)?
            .into_arc();

        let session = SessionBuilder::new(&env)
            .map_err(runtime_err)?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(runtime_err)?
            .with_model_from_file(path)
            .map_err(|e| ModelError::InvalidModel(e.to_string()))?;

        if session.inputs.len() != 1 {
            return Err(ModelError::SchemaMismatch(format!(
                "expected one input tensor, found {}",
                session.inputs.len()
            )));
        }

        let names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        if names.is_empty() {
            return Err(ModelError::InvalidModel("graph has no outputs".into()));
        }
        let label_output = names.iter().position(|n| *n == "label").unwrap_or(0);
        let probability_output = names
            .iter()
            .position(|n| *n == "probabilities")
            .or_else(|| (names.len() > 1).then(|| if label_output == 0 { 1 } else { 0 }));
        tracing::debug!(outputs = ?names, label_output, ?probability_output, "onnx graph outputs");

        Ok(Self {
            session: Mutex::new(session),
            label_output,
            probability_output,
            _env: env,
        })
    }

    pub fn has_probability(&self) -> bool {
        self.probability_output.is_some()
    }

    fn run(&self, features: &FeatureVector) -> Result<(i64, Option<f64>), ModelError> {
        let arr = Array2::from_shape_vec((1, FEATURE_DIM), features.to_f32()).map_err(runtime_err)?;
        let input = CowArray::from(arr).into_dyn();

        let session = self
            .session
            .lock()
            .map_err(|_| ModelError::Runtime("onnx session lock poisoned".into()))?;
        let value = Value::from_array(session.allocator(), &input).map_err(runtime_err)?;
        let outputs = session.run(vec![value]).map_err(runtime_err)?;

        let label_value = outputs
            .get(self.label_output)
            .ok_or_else(|| ModelError::Runtime("missing label output".into()))?;
        let labels: OrtOwnedTensor<i64, _> = label_value.try_extract().map_err(runtime_err)?;
        let label = labels
            .view()
            .iter()
            .next()
            .copied()
            .ok_or_else(|| ModelError::Runtime("empty label tensor".into()))?;

        let probability = match self.probability_output {
            Some(idx) => {
                let value = outputs
                    .get(idx)
                    .ok_or_else(|| ModelError::Runtime("missing probability output".into()))?;
                let probs: OrtOwnedTensor<f32, _> = value.try_extract().map_err(runtime_err)?;
                // Last column is P(label = 1)
                let p = probs
                    .view()
                    .iter()
                    .last()
                    .copied()
                    .ok_or_else(|| ModelError::Runtime("empty probability tensor".into()))?;
                Some(f64::from(p))
            }
            None => None,
        };
        Ok((label, probability))
    }
}

impl Classifier for OnnxModel {
    fn classify(&self, features: &FeatureVector) -> Result<i64, ModelError> {
        self.run(features).map(|(label, _)| label)
    }
}

impl ProbabilityEstimator for OnnxModel {
    fn probability(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        self.predict(features).map(|(_, p)| p)
    }

    fn predict(&self, features: &FeatureVector) -> Result<(i64, f64), ModelError> {
        match self.run(features)? {
            (label, Some(p)) => Ok((label, p)),
            (_, None) => Err(ModelError::Runtime("graph has no probability output".into())),
        }
    }
}
