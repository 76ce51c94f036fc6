//! LightGBM binary classifier evaluated from a `Booster.dump_model()` JSON dump.
//!
//! Trees are compiled into flat node arrays at load time; evaluation walks them without
//! recursion or allocation. Only numerical `<=` splits are supported.

use super::{Classifier, ModelError, ProbabilityEstimator};
use crate::features::{FeatureVector, FEATURE_DIM, FEATURE_NAMES};
use serde::Deserialize;
use serde_json::Value;

/// LightGBM treats |x| <= 1e-35 as zero for `missing_type: Zero`.
const ZERO_THRESHOLD: f64 = 1e-35;

#[derive(Debug, Deserialize)]
struct DumpFile {
    #[serde(default = "one")]
    num_class: u32,
    max_feature_idx: usize,
    objective: String,
    #[serde(default)]
    average_output: bool,
    #[serde(default)]
    feature_names: Vec<String>,
    tree_info: Vec<DumpTree>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct DumpTree {
    tree_structure: DumpNode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpNode {
    Split {
        split_feature: usize,
        threshold: Value,
        decision_type: String,
        #[serde(default)]
        default_left: bool,
        #[serde(default)]
        missing_type: Option<String>,
        left_child: Box<DumpNode>,
        right_child: Box<DumpNode>,
    },
    Leaf {
        leaf_value: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingType {
    None,
    Zero,
    NaN,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        default_left: bool,
        missing: MissingType,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

/// Root is node 0.
#[derive(Debug, Clone, PartialEq)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn eval(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    missing,
                    left,
                    right,
                } => {
                    let go_left =
                        goes_left(features[*feature], *threshold, *default_left, *missing);
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

fn goes_left(value: f64, threshold: f64, default_left: bool, missing: MissingType) -> bool {
    let value = if missing != MissingType::NaN && value.is_nan() {
        0.0
    } else {
        value
    };
    let is_missing = match missing {
        MissingType::Zero => value.abs() <= ZERO_THRESHOLD,
        MissingType::NaN => value.is_nan(),
        MissingType::None => false,
    };
    if is_missing {
        default_left
    } else {
        value <= threshold
    }
}

#[derive(Debug, Clone)]
pub struct LightGbmModel {
    trees: Vec<Tree>,
    sigmoid: f64,
    average_output: bool,
}

impl LightGbmModel {
    pub fn from_slice(data: &[u8]) -> Result<Self, ModelError> {
        let dump: DumpFile = serde_json::from_slice(data)?;
        Self::compile(dump)
    }

    fn compile(dump: DumpFile) -> Result<Self, ModelError> {
        let sigmoid = parse_binary_objective(&dump.objective)?;
        if dump.num_class != 1 {
            return Err(ModelError::InvalidModel(format!(
                "expected a binary model, got num_class {}",
                dump.num_class
            )));
        }
        if !dump.feature_names.is_empty() && dump.feature_names != FEATURE_NAMES {
            return Err(ModelError::SchemaMismatch(format!(
                "expected {:?}, got {:?}",
                FEATURE_NAMES, dump.feature_names
            )));
        }
        if dump.max_feature_idx >= FEATURE_DIM {
            return Err(ModelError::SchemaMismatch(format!(
                "max_feature_idx {} exceeds {} features",
                dump.max_feature_idx, FEATURE_DIM
            )));
        }
        if dump.tree_info.is_empty() {
            return Err(ModelError::InvalidModel("dump contains no trees".into()));
        }

        let mut trees = Vec::with_capacity(dump.tree_info.len());
        for tree in dump.tree_info {
            let mut nodes = Vec::new();
            flatten(tree.tree_structure, &mut nodes)?;
            trees.push(Tree { nodes });
        }
        Ok(Self {
            trees,
            sigmoid,
            average_output: dump.average_output,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Sum (or mean, for random-forest boosting) of leaf outputs.
    pub fn raw_score(&self, features: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.eval(features)).sum();
        if self.average_output {
            sum / self.trees.len() as f64
        } else {
            sum
        }
    }

    pub fn predict_probability(&self, features: &[f64]) -> f64 {
        1.0 / (1.0 + (-self.sigmoid * self.raw_score(features)).exp())
    }
}

fn label_for(p: f64) -> i64 {
    if p > 0.5 {
        1
    } else {
        0
    }
}

impl Classifier for LightGbmModel {
    fn classify(&self, features: &FeatureVector) -> Result<i64, ModelError> {
        Ok(label_for(self.predict_probability(features.as_slice())))
    }
}

impl ProbabilityEstimator for LightGbmModel {
    fn probability(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        Ok(self.predict_probability(features.as_slice()))
    }

    fn predict(&self, features: &FeatureVector) -> Result<(i64, f64), ModelError> {
        let p = self.predict_probability(features.as_slice());
        Ok((label_for(p), p))
    }
}

/// `"binary sigmoid:1"` → 1.0
fn parse_binary_objective(objective: &str) -> Result<f64, ModelError> {
    let mut parts = objective.split_whitespace();
    if parts.next() != Some("binary") {
        return Err(ModelError::InvalidModel(format!(
            "unsupported objective {objective:?}, expected binary"
        )));
    }
    let sigmoid = parts
        .find_map(|p| p.strip_prefix("sigmoid:"))
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| ModelError::InvalidModel(format!("bad sigmoid parameter {s:?}")))
        })
        .transpose()?
        .unwrap_or(1.0);
    Ok(sigmoid)
}

fn flatten(node: DumpNode, nodes: &mut Vec<Node>) -> Result<usize, ModelError> {
    match node {
        DumpNode::Leaf { leaf_value } => {
            nodes.push(Node::Leaf(leaf_value));
            Ok(nodes.len() - 1)
        }
        DumpNode::Split {
            split_feature,
            threshold,
            decision_type,
            default_left,
            missing_type,
            left_child,
            right_child,
        } => {
            if decision_type != "<=" {
                return Err(ModelError::InvalidModel(format!(
                    "unsupported decision type {decision_type:?} (categorical splits are not supported)"
                )));
            }
            if split_feature >= FEATURE_DIM {
                return Err(ModelError::SchemaMismatch(format!(
                    "split on feature {split_feature}, schema has {FEATURE_DIM}"
                )));
            }
            let threshold = threshold.as_f64().ok_or_else(|| {
                ModelError::InvalidModel(format!("non-numeric threshold {threshold}"))
            })?;
            let missing = match missing_type.as_deref() {
                None | Some("None") => MissingType::None,
                Some("Zero") => MissingType::Zero,
                Some("NaN") => MissingType::NaN,
                Some(other) => {
                    return Err(ModelError::InvalidModel(format!(
                        "unknown missing type {other:?}"
                    )))
                }
            };

            let idx = nodes.len();
            nodes.push(Node::Leaf(0.0));
            let left = flatten(*left_child, nodes)?;
            let right = flatten(*right_child, nodes)?;
            nodes[idx] = Node::Split {
                feature: split_feature,
                threshold,
                default_left,
                missing,
                left,
                right,
            };
            Ok(idx)
        }
    }
}
