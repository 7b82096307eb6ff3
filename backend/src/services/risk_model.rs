//! Gradient-boosted-tree risk model
//!
//! Loads an XGBoost model saved with `Booster.save_model("*.json")` and
//! evaluates it natively. Only single-target `gbtree` regressors with
//! numerical splits are supported, which covers the accident-frequency model.

use serde::{Deserialize, Serialize};
use shared::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use std::path::Path;
use std::sync::Arc;

use crate::error::{AppError, AppResult};

/// Anything that turns a feature vector into a predicted accident frequency
pub trait FrequencyModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> AppResult<f64>;
}

/// Link between the raw margin and the prediction, by objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    Identity,
    Log,
    Logit,
}

impl Link {
    fn for_objective(name: &str) -> Option<Self> {
        match name {
            "reg:squarederror" | "reg:linear" | "reg:squaredlogerror" | "reg:pseudohubererror"
            | "reg:absoluteerror" | "reg:quantileerror" => Some(Link::Identity),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Some(Link::Log),
            "reg:logistic" | "binary:logistic" => Some(Link::Logit),
            _ => None,
        }
    }

    /// Map a base score from prediction space into margin space
    fn to_margin(self, base_score: f64) -> f64 {
        match self {
            Link::Identity => base_score,
            Link::Log => base_score.ln(),
            Link::Logit => (base_score / (1.0 - base_score)).ln(),
        }
    }

    fn to_prediction(self, margin: f64) -> f64 {
        match self {
            Link::Identity => margin,
            Link::Log => margin.exp(),
            Link::Logit => 1.0 / (1.0 + (-margin).exp()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf_value(&self, features: &[f32]) -> f32 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(f32::NAN);
                    index = if value.is_nan() {
                        if *default_left {
                            *left
                        } else {
                            *right
                        }
                    } else if value < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Metadata reported by the model endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Artifact file name; the server-side directory is never reported
    pub file_name: Option<String>,
    pub objective: String,
    pub link: Link,
    pub base_score: f64,
    pub num_trees: usize,
    pub feature_names: Vec<String>,
    pub xgboost_version: Option<String>,
}

/// A loaded, validated tree ensemble
#[derive(Debug, Clone)]
pub struct RiskModel {
    trees: Vec<Tree>,
    base_margin: f64,
    link: Link,
    info: ModelInfo,
}

// XGBoost JSON model layout

#[derive(Debug, Deserialize)]
struct XgbDocument {
    learner: XgbLearner,
    #[serde(default)]
    version: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct XgbLearner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: XgbGradientBooster,
    learner_model_param: XgbLearnerModelParam,
    objective: XgbObjective,
}

#[derive(Debug, Deserialize)]
struct XgbGradientBooster {
    name: String,
    model: Option<XgbGbtreeModel>,
}

#[derive(Debug, Deserialize)]
struct XgbGbtreeModel {
    trees: Vec<XgbTree>,
}

#[derive(Debug, Deserialize)]
struct XgbTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<XgbFlag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// Older releases write booleans, newer ones write 0/1
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum XgbFlag {
    Bool(bool),
    Int(i64),
}

impl XgbFlag {
    fn is_set(self) -> bool {
        match self {
            XgbFlag::Bool(b) => b,
            XgbFlag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct XgbLearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_feature: Option<String>,
    #[serde(default)]
    num_class: Option<String>,
    #[serde(default)]
    num_target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XgbObjective {
    name: String,
}

fn load_error(msg: impl Into<String>) -> AppError {
    AppError::ModelLoad(msg.into())
}

/// XGBoost 2.1+ writes vector-valued scores as "[5E-1]"
fn parse_param(name: &str, raw: &str) -> AppResult<f64> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .parse::<f64>()
        .map_err(|_| load_error(format!("invalid {} '{}'", name, raw)))
}

impl RiskModel {
    /// Load and validate a model artifact from disk
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => load_error(format!(
                "Model file not found at '{}'. Please ensure '{}' is present in the \
                 working directory of the server.",
                path.display(),
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            )),
            _ => load_error(format!("cannot read '{}': {}", path.display(), e)),
        })?;

        Self::from_json(&raw, path)
    }

    /// Parse a model from its JSON text
    pub fn from_json(raw: &str, path: impl AsRef<Path>) -> AppResult<Self> {
        let doc: XgbDocument = serde_json::from_str(raw)
            .map_err(|e| load_error(format!("not an XGBoost JSON model: {}", e)))?;
        let learner = doc.learner;

        if learner.gradient_booster.name != "gbtree" {
            return Err(load_error(format!(
                "unsupported booster '{}', expected 'gbtree'",
                learner.gradient_booster.name
            )));
        }

        let objective = learner.objective.name;
        let link = Link::for_objective(&objective)
            .ok_or_else(|| load_error(format!("unsupported objective '{}'", objective)))?;

        let params = &learner.learner_model_param;
        for (name, value) in [("num_class", &params.num_class), ("num_target", &params.num_target)] {
            if let Some(raw) = value {
                if parse_param(name, raw)? > 1.0 {
                    return Err(load_error(format!("multi-output models are not supported ({} = {})", name, raw)));
                }
            }
        }

        if let Some(raw) = &params.num_feature {
            let num_feature = parse_param("num_feature", raw)?;
            if num_feature != FEATURE_COUNT as f64 {
                return Err(load_error(format!(
                    "model expects {} features, quote assembles {}",
                    raw, FEATURE_COUNT
                )));
            }
        }

        if !learner.feature_names.is_empty() && learner.feature_names != FEATURE_NAMES {
            return Err(load_error(format!(
                "feature names {:?} do not match expected {:?}",
                learner.feature_names, FEATURE_NAMES
            )));
        }

        let base_score = parse_param("base_score", &params.base_score)?;
        let base_margin = link.to_margin(base_score);
        if !base_margin.is_finite() {
            return Err(load_error(format!(
                "base_score {} is outside the domain of objective '{}'",
                base_score, objective
            )));
        }

        let raw_trees = learner
            .gradient_booster
            .model
            .map(|m| m.trees)
            .ok_or_else(|| load_error("gbtree model has no trees"))?;

        let trees = raw_trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| convert_tree(t).map_err(|e| load_error(format!("tree {}: {}", i, e))))
            .collect::<AppResult<Vec<_>>>()?;

        let info = ModelInfo {
            file_name: path
                .as_ref()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            objective,
            link,
            base_score,
            num_trees: trees.len(),
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            xgboost_version: (!doc.version.is_empty()).then(|| {
                doc.version
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(".")
            }),
        };

        Ok(Self {
            trees,
            base_margin,
            link,
            info,
        })
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Raw margin: transformed base score plus every tree's leaf value
    pub fn margin(&self, features: &FeatureVector) -> f64 {
        let values = features.as_slice();
        self.trees
            .iter()
            .fold(self.base_margin, |acc, tree| acc + f64::from(tree.leaf_value(values)))
    }

    /// Predicted accident frequency
    pub fn predict_frequency(&self, features: &FeatureVector) -> f64 {
        self.link.to_prediction(self.margin(features))
    }
}

impl FrequencyModel for RiskModel {
    fn predict(&self, features: &FeatureVector) -> AppResult<f64> {
        let frequency = self.predict_frequency(features);
        if frequency.is_finite() {
            Ok(frequency)
        } else {
            Err(AppError::Prediction(format!(
                "model returned non-finite value {}",
                frequency
            )))
        }
    }
}

fn convert_tree(tree: XgbTree) -> Result<Tree, String> {
    let n = tree.left_children.len();
    if n == 0 {
        return Err("empty tree".to_string());
    }
    if tree.right_children.len() != n
        || tree.split_indices.len() != n
        || tree.split_conditions.len() != n
        || tree.default_left.len() != n
    {
        return Err("node arrays have inconsistent lengths".to_string());
    }
    if tree.split_type.iter().any(|t| *t != 0) {
        return Err("categorical splits are not supported".to_string());
    }

    let child = |raw: i64| -> Result<usize, String> {
        usize::try_from(raw)
            .ok()
            .filter(|c| *c < n)
            .ok_or_else(|| format!("child index {} out of range", raw))
    };

    let mut nodes = Vec::with_capacity(n);
    for i in 0..n {
        let (left, right) = (tree.left_children[i], tree.right_children[i]);
        if left == -1 {
            nodes.push(Node::Leaf(tree.split_conditions[i]));
            continue;
        }

        let feature = usize::try_from(tree.split_indices[i])
            .ok()
            .filter(|f| *f < FEATURE_COUNT)
            .ok_or_else(|| format!("node {} splits on unknown feature {}", i, tree.split_indices[i]))?;

        nodes.push(Node::Split {
            feature,
            threshold: tree.split_conditions[i],
            left: child(left)?,
            right: child(right)?,
            default_left: tree.default_left[i].is_set(),
        });
    }

    // Every node reachable from the root must be visited once, so walks terminate
    let mut visited = vec![false; n];
    let mut stack = vec![0usize];
    while let Some(index) = stack.pop() {
        if std::mem::replace(&mut visited[index], true) {
            return Err(format!("node {} is reachable twice", index));
        }
        if let Node::Split { left, right, .. } = nodes[index] {
            stack.push(left);
            stack.push(right);
        }
    }

    Ok(Tree { nodes })
}

/// Process-wide model slot, loaded once at startup
#[derive(Clone)]
pub enum ModelHandle {
    Ready(Arc<RiskModel>),
    Unavailable(Arc<str>),
}

impl ModelHandle {
    /// Load the artifact, recording the failure instead of aborting
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match RiskModel::load(path) {
            Ok(model) => {
                tracing::info!(
                    path = %path.display(),
                    objective = %model.info().objective,
                    trees = model.info().num_trees,
                    "Risk model loaded"
                );
                ModelHandle::Ready(Arc::new(model))
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "Risk model unavailable: {}", e);
                ModelHandle::Unavailable(e.user_message().into())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelHandle::Ready(_))
    }

    pub fn model(&self) -> AppResult<Arc<RiskModel>> {
        match self {
            ModelHandle::Ready(model) => Ok(Arc::clone(model)),
            ModelHandle::Unavailable(reason) => Err(AppError::ModelUnavailable(reason.to_string())),
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ModelHandle::Ready(_) => None,
            ModelHandle::Unavailable(reason) => Some(reason.as_ref()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};
    use shared::RainTrigger;
    use std::path::PathBuf;

    /// A stump per (feature, left leaf, right leaf)
    pub(crate) fn model_json(objective: &str, base_score: &str, stumps: &[(i64, f32, f32)]) -> Value {
        let trees: Vec<Value> = stumps
            .iter()
            .enumerate()
            .map(|(id, (feature, left, right))| {
                json!({
                    "id": id,
                    "left_children": [1, -1, -1],
                    "right_children": [2, -1, -1],
                    "parents": [2147483647, 0, 0],
                    "split_indices": [feature, 0, 0],
                    "split_conditions": [0.5, left, right],
                    "default_left": [0, 0, 0],
                    "split_type": [0, 0, 0],
                    "base_weights": [0.0, left, right],
                    "tree_param": { "num_nodes": "3", "num_feature": "13", "num_deleted": "0", "size_leaf_vector": "1" }
                })
            })
            .collect();

        json!({
            "learner": {
                "attributes": {},
                "feature_names": FEATURE_NAMES,
                "feature_types": vec!["int"; FEATURE_COUNT],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "gbtree_model_param": { "num_trees": stumps.len().to_string(), "num_parallel_tree": "1" },
                        "trees": trees,
                        "tree_info": vec![0; stumps.len()]
                    }
                },
                "learner_model_param": {
                    "base_score": base_score,
                    "boost_from_average": "1",
                    "num_class": "0",
                    "num_feature": "13",
                    "num_target": "1"
                },
                "objective": { "name": objective }
            },
            "version": [2, 0, 3]
        })
    }

    pub(crate) fn fixture_path() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/risk_model.json"))
    }

    fn load(doc: &Value) -> AppResult<RiskModel> {
        RiskModel::from_json(&doc.to_string(), "inline.json")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_squared_error_sums_leaves() {
        let model = load(&model_json("reg:squarederror", "2E-3", &[(0, 0.004, 0.008), (7, 0.0, 0.001)])).unwrap();

        let dry_july = FeatureVector::assemble(RainTrigger::No, 7);
        assert!(close(model.predict_frequency(&dry_july), 0.002 + 0.004 + 0.001));

        let wet_march = FeatureVector::assemble(RainTrigger::Yes, 3);
        assert!(close(model.predict_frequency(&wet_march), 0.002 + 0.008));
    }

    #[test]
    fn test_poisson_applies_log_link() {
        let model = load(&model_json("count:poisson", "[1E-2]", &[(0, -0.2, 0.3)])).unwrap();
        assert_eq!(model.info().link, Link::Log);

        let wet = FeatureVector::assemble(RainTrigger::Yes, 1);
        let expected = (0.01f64.ln() + f64::from(0.3f32)).exp();
        assert!(close(model.predict_frequency(&wet), expected));
    }

    #[test]
    fn test_logistic_link() {
        let model = load(&model_json("binary:logistic", "5E-1", &[(0, -1.0, 1.0)])).unwrap();
        let wet = FeatureVector::assemble(RainTrigger::Yes, 1);
        assert!(close(model.predict_frequency(&wet), 1.0 / (1.0 + (-1.0f64).exp())));
    }

    #[test]
    fn test_missing_value_follows_default_direction() {
        let mut doc = model_json("reg:squarederror", "0", &[(0, 1.0, 2.0)]);
        doc["learner"]["gradient_booster"]["model"]["trees"][0]["default_left"] = json!([true, false, false]);
        let model = load(&doc).unwrap();

        let tree = &model.trees[0];
        assert_eq!(tree.leaf_value(&[f32::NAN]), 1.0);
        assert_eq!(tree.leaf_value(&[0.0]), 1.0);
        assert_eq!(tree.leaf_value(&[1.0]), 2.0);
    }

    #[test]
    fn test_rejects_unsupported_models() {
        let mut dart = model_json("reg:squarederror", "0", &[(0, 1.0, 2.0)]);
        dart["learner"]["gradient_booster"]["name"] = json!("dart");
        assert!(matches!(load(&dart), Err(AppError::ModelLoad(_))));

        let ranker = model_json("rank:pairwise", "0", &[(0, 1.0, 2.0)]);
        assert!(matches!(load(&ranker), Err(AppError::ModelLoad(_))));

        let mut renamed = model_json("reg:squarederror", "0", &[(0, 1.0, 2.0)]);
        renamed["learner"]["feature_names"][0] = json!("rain_mm");
        assert!(matches!(load(&renamed), Err(AppError::ModelLoad(_))));

        let mut wide = model_json("reg:squarederror", "0", &[(0, 1.0, 2.0)]);
        wide["learner"]["learner_model_param"]["num_feature"] = json!("14");
        assert!(matches!(load(&wide), Err(AppError::ModelLoad(_))));

        let bad_poisson_base = model_json("count:poisson", "0", &[(0, 1.0, 2.0)]);
        assert!(matches!(load(&bad_poisson_base), Err(AppError::ModelLoad(_))));
    }

    #[test]
    fn test_rejects_malformed_trees() {
        let mut out_of_range = model_json("reg:squarederror", "0", &[(0, 1.0, 2.0)]);
        out_of_range["learner"]["gradient_booster"]["model"]["trees"][0]["right_children"] = json!([9, -1, -1]);
        assert!(matches!(load(&out_of_range), Err(AppError::ModelLoad(_))));

        let mut cyclic = model_json("reg:squarederror", "0", &[(0, 1.0, 2.0)]);
        cyclic["learner"]["gradient_booster"]["model"]["trees"][0]["left_children"] = json!([0, -1, -1]);
        assert!(matches!(load(&cyclic), Err(AppError::ModelLoad(_))));

        let mut unknown_feature = model_json("reg:squarederror", "0", &[(0, 1.0, 2.0)]);
        unknown_feature["learner"]["gradient_booster"]["model"]["trees"][0]["split_indices"] = json!([13, 0, 0]);
        assert!(matches!(load(&unknown_feature), Err(AppError::ModelLoad(_))));
    }

    #[test]
    fn test_load_fixture_from_disk() {
        let model = RiskModel::load(fixture_path()).unwrap();
        assert_eq!(model.info().num_trees, 2);
        assert_eq!(model.info().objective, "count:poisson");
        assert_eq!(model.info().xgboost_version.as_deref(), Some("2.0.3"));
        assert_eq!(model.info().file_name.as_deref(), Some("risk_model.json"));

        let wet_april = FeatureVector::assemble(RainTrigger::Yes, 4);
        let dry_january = FeatureVector::assemble(RainTrigger::No, 1);
        assert!(model.predict_frequency(&wet_april) > model.predict_frequency(&dry_january));
    }

    #[test]
    fn test_missing_artifact_leaves_handle_unavailable() {
        let handle = ModelHandle::load("/nonexistent/python_gbm_model.json");
        assert!(!handle.is_ready());
        assert!(handle.unavailable_reason().unwrap().contains("Model file not found"));
        assert!(matches!(handle.model(), Err(AppError::ModelUnavailable(_))));
    }
}
