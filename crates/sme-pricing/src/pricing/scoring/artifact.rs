use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::LoanApplication;
use super::features::{FeatureKey, FeatureKind, FeatureLayout, FeatureSpec};

/// Artifact layout revision this engine understands.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

const MIN_CALIBRATED_PD: f64 = 0.0001;
const MAX_CALIBRATED_PD: f64 = 0.9999;

fn default_calibration_factor() -> f64 {
    // 2% observed SME default rate over the 16% rate of the training sample.
    0.02 / 0.16
}

/// Errors raised while loading a scoring artifact. All are fatal for the artifact, never for
/// the process.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read scoring artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("scoring artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("artifact declares no features")]
    EmptySchema,
    #[error("artifact feature '{0}' cannot be derived from a loan application")]
    UnknownFeature(String),
    #[error("artifact feature '{name}' is declared {declared:?} but the engine encodes it as {expected:?}")]
    KindMismatch {
        name: String,
        declared: FeatureKind,
        expected: FeatureKind,
    },
    #[error("artifact feature '{0}' is declared more than once")]
    DuplicateFeature(String),
    #[error("{component} has {found} values for {expected} features")]
    DimensionMismatch {
        component: String,
        expected: usize,
        found: usize,
    },
    #[error("ensemble has no members")]
    EmptyEnsemble,
    #[error("member {member}, tree {tree}: {detail}")]
    MalformedTree {
        member: usize,
        tree: usize,
        detail: String,
    },
    #[error("stacking combiner has {found} weights for {expected} members")]
    CombinerMismatch { expected: usize, found: usize },
    #[error("{0} contains a non-finite value")]
    NonFinite(String),
    #[error("calibration factor must be positive and finite, got {0}")]
    InvalidCalibration(f64),
}

#[derive(Debug, Deserialize)]
struct ArtifactDocument {
    format_version: u32,
    model_version: String,
    #[serde(default)]
    trained_on: Option<NaiveDate>,
    features: Vec<FeatureSpec>,
    scaler: StandardScaler,
    ensemble: Ensemble,
    #[serde(default = "default_calibration_factor")]
    calibration_factor: f64,
}

/// Trained default-probability ensemble plus the schema it was fitted against.
///
/// Loaded once at startup and shared read-only between requests.
#[derive(Debug, Clone)]
pub struct ScoringArtifact {
    model_version: String,
    trained_on: Option<NaiveDate>,
    features: Vec<FeatureSpec>,
    layout: FeatureLayout,
    scaler: StandardScaler,
    ensemble: Ensemble,
    calibration_factor: f64,
}

impl ScoringArtifact {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ArtifactError> {
        let document: ArtifactDocument = serde_json::from_reader(reader)?;
        Self::from_document(document)
    }

    pub fn from_json(raw: &str) -> Result<Self, ArtifactError> {
        let document: ArtifactDocument = serde_json::from_str(raw)?;
        Self::from_document(document)
    }

    fn from_document(document: ArtifactDocument) -> Result<Self, ArtifactError> {
        if document.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: document.format_version,
                expected: SUPPORTED_FORMAT_VERSION,
            });
        }

        let layout = resolve_layout(&document.features)?;
        let width = layout.len();

        document.scaler.validate(width)?;
        document.ensemble.validate(width)?;

        let calibration_factor = document.calibration_factor;
        if !calibration_factor.is_finite() || calibration_factor <= 0.0 {
            return Err(ArtifactError::InvalidCalibration(calibration_factor));
        }

        Ok(Self {
            model_version: document.model_version,
            trained_on: document.trained_on,
            features: document.features,
            layout,
            scaler: document.scaler,
            ensemble: document.ensemble,
            calibration_factor,
        })
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn trained_on(&self) -> Option<NaiveDate> {
        self.trained_on
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Uncalibrated ensemble probability for the application.
    pub fn raw_probability(&self, application: &LoanApplication) -> f64 {
        let features = self.layout.vector(application);
        let scaled = self.scaler.transform(&features);
        self.ensemble.predict_proba(&scaled)
    }

    /// Calibrated probability of default, bounded away from 0 and 1.
    pub fn predict(&self, application: &LoanApplication) -> f64 {
        let raw = self.raw_probability(application);
        if !raw.is_finite() {
            return MAX_CALIBRATED_PD;
        }
        (raw * self.calibration_factor).clamp(MIN_CALIBRATED_PD, MAX_CALIBRATED_PD)
    }
}

fn resolve_layout(features: &[FeatureSpec]) -> Result<FeatureLayout, ArtifactError> {
    if features.is_empty() {
        return Err(ArtifactError::EmptySchema);
    }

    let mut keys = Vec::with_capacity(features.len());
    for spec in features {
        let key = FeatureKey::parse(&spec.name)
            .ok_or_else(|| ArtifactError::UnknownFeature(spec.name.clone()))?;
        // aliases such as `sector_retail_trade` resolve to an already declared column
        if keys.contains(&key) {
            return Err(ArtifactError::DuplicateFeature(spec.name.clone()));
        }
        if key.kind() != spec.kind {
            return Err(ArtifactError::KindMismatch {
                name: spec.name.clone(),
                declared: spec.kind,
                expected: key.kind(),
            });
        }
        keys.push(key);
    }

    Ok(FeatureLayout::new(keys))
}

fn ensure_finite(label: &str, values: &[f64]) -> Result<(), ArtifactError> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(ArtifactError::NonFinite(label.to_string()))
    }
}

fn ensure_width(component: &str, expected: usize, found: usize) -> Result<(), ArtifactError> {
    if expected == found {
        Ok(())
    } else {
        Err(ArtifactError::DimensionMismatch {
            component: component.to_string(),
            expected,
            found,
        })
    }
}

/// Standardization fitted on the training sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn validate(&self, width: usize) -> Result<(), ArtifactError> {
        ensure_width("scaler mean", width, self.mean.len())?;
        ensure_width("scaler scale", width, self.scale.len())?;
        ensure_finite("scaler mean", &self.mean)?;
        ensure_finite("scaler scale", &self.scale)
    }

    pub fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(value, (mean, scale))| {
                // constant training columns were stored with a zero scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (value - mean) / scale
            })
            .collect()
    }
}

/// Base estimators and the rule that combines their probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    pub members: Vec<Estimator>,
    #[serde(default)]
    pub combiner: Combiner,
}

impl Ensemble {
    fn validate(&self, width: usize) -> Result<(), ArtifactError> {
        if self.members.is_empty() {
            return Err(ArtifactError::EmptyEnsemble);
        }
        for (index, member) in self.members.iter().enumerate() {
            member.validate(index, width)?;
        }
        self.combiner.validate(self.members.len())
    }

    pub fn predict_proba(&self, scaled: &[f64]) -> f64 {
        let probabilities: Vec<f64> = self
            .members
            .iter()
            .map(|member| member.predict_proba(scaled))
            .collect();
        self.combiner.combine(&probabilities)
    }
}

fn default_learning_rate() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    Logistic {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// Mean of per-tree leaf probabilities.
    #[serde(alias = "random_forest")]
    Forest { trees: Vec<DecisionTree> },
    /// Additive trees in log-odds space: `sigmoid(base_score + learning_rate * Σ value)`.
    /// Exporters that bake the learning rate into the leaves leave it at 1.
    #[serde(alias = "gradient_boosting", alias = "xgboost")]
    Boosted {
        base_score: f64,
        #[serde(default = "default_learning_rate")]
        learning_rate: f64,
        trees: Vec<DecisionTree>,
    },
}

fn validate_trees(
    member: usize,
    trees: &[DecisionTree],
    width: usize,
    leaves: LeafKind,
) -> Result<(), ArtifactError> {
    if trees.is_empty() {
        return Err(ArtifactError::MalformedTree {
            member,
            tree: 0,
            detail: "member has no trees".to_string(),
        });
    }
    for (tree_index, tree) in trees.iter().enumerate() {
        tree.validate(width, leaves)
            .map_err(|detail| ArtifactError::MalformedTree {
                member,
                tree: tree_index,
                detail,
            })?;
    }
    Ok(())
}

impl Estimator {
    fn validate(&self, member: usize, width: usize) -> Result<(), ArtifactError> {
        match self {
            Estimator::Logistic {
                coefficients,
                intercept,
            } => {
                let label = format!("member {member} coefficients");
                ensure_width(&label, width, coefficients.len())?;
                ensure_finite(&label, coefficients)?;
                ensure_finite(&format!("member {member} intercept"), &[*intercept])
            }
            Estimator::Forest { trees } => {
                validate_trees(member, trees, width, LeafKind::Probability)
            }
            Estimator::Boosted {
                base_score,
                learning_rate,
                trees,
            } => {
                ensure_finite(
                    &format!("member {member} boosting parameters"),
                    &[*base_score, *learning_rate],
                )?;
                validate_trees(member, trees, width, LeafKind::Margin)
            }
        }
    }

    fn predict_proba(&self, scaled: &[f64]) -> f64 {
        match self {
            Estimator::Logistic {
                coefficients,
                intercept,
            } => {
                let z = coefficients
                    .iter()
                    .zip(scaled)
                    .fold(*intercept, |acc, (weight, value)| acc + weight * value);
                sigmoid(z)
            }
            Estimator::Forest { trees } => {
                let total: f64 = trees.iter().map(|tree| tree.predict(scaled)).sum();
                total / trees.len() as f64
            }
            Estimator::Boosted {
                base_score,
                learning_rate,
                trees,
            } => {
                let margin: f64 = trees.iter().map(|tree| tree.predict(scaled)).sum();
                sigmoid(base_score + learning_rate * margin)
            }
        }
    }
}

/// Binary decision tree stored as a flat node list rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// `x[feature] <= threshold` descends left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { probability: f64 },
    /// Raw log-odds contribution of a boosted tree.
    Margin { value: f64 },
}

/// Leaf shape a member's trees must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafKind {
    Probability,
    Margin,
}

impl DecisionTree {
    fn validate(&self, width: usize, leaves: LeafKind) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= width {
                        return Err(format!(
                            "node {index} splits on feature {feature} of {width}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {index} has a non-finite threshold"));
                    }
                    // children must come later in the list, which also rules out cycles
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("node {index} points at invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { probability } => {
                    if leaves != LeafKind::Probability {
                        return Err(format!("node {index} is a probability leaf in a boosted tree"));
                    }
                    if !(0.0..=1.0).contains(probability) {
                        return Err(format!(
                            "node {index} leaf probability {probability} outside [0, 1]"
                        ));
                    }
                }
                TreeNode::Margin { value } => {
                    if leaves != LeafKind::Margin {
                        return Err(format!("node {index} is a margin leaf in a forest tree"));
                    }
                    if !value.is_finite() {
                        return Err(format!("node {index} has a non-finite leaf value"));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict(&self, scaled: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = scaled.get(*feature).copied().unwrap_or(0.0);
                    index = if value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { probability }) => return *probability,
                Some(TreeNode::Margin { value }) => return *value,
                None => return 0.0,
            }
        }
    }
}

/// How member probabilities become the ensemble probability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Combiner {
    #[default]
    Mean,
    /// Logistic meta-learner over member probabilities.
    Stacking { weights: Vec<f64>, intercept: f64 },
}

impl Combiner {
    fn validate(&self, members: usize) -> Result<(), ArtifactError> {
        match self {
            Combiner::Mean => Ok(()),
            Combiner::Stacking { weights, intercept } => {
                if weights.len() != members {
                    return Err(ArtifactError::CombinerMismatch {
                        expected: members,
                        found: weights.len(),
                    });
                }
                ensure_finite("stacking weights", weights)?;
                ensure_finite("stacking intercept", &[*intercept])
            }
        }
    }

    fn combine(&self, probabilities: &[f64]) -> f64 {
        match self {
            Combiner::Mean => {
                probabilities.iter().sum::<f64>() / probabilities.len().max(1) as f64
            }
            Combiner::Stacking { weights, intercept } => {
                let z = weights
                    .iter()
                    .zip(probabilities)
                    .fold(*intercept, |acc, (weight, p)| acc + weight * p);
                sigmoid(z)
            }
        }
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::domain::Sector;

    fn application(credit_score: u16) -> LoanApplication {
        LoanApplication {
            annual_revenue_ntd: 8_000_000.0,
            years_in_business: 10,
            num_employees: 40,
            business_sector: Sector::Manufacturing,
            credit_score,
            loan_amount_ntd: 2_000_000.0,
            tenor_months: 36,
            collateral_value_ntd: 3_000_000.0,
            is_existing_customer: false,
            has_credit_guarantee: false,
        }
    }

    const LOGISTIC_ARTIFACT: &str = r#"{
        "format_version": 1,
        "model_version": "pd-logit-test",
        "trained_on": "2025-02-14",
        "features": [
            {"name": "credit_score", "kind": "numeric"},
            {"name": "debt_to_revenue_ratio", "kind": "numeric"}
        ],
        "scaler": {"mean": [600.0, 1.0], "scale": [100.0, 0.0]},
        "ensemble": {
            "members": [
                {"type": "logistic", "coefficients": [-1.0, 0.5], "intercept": -1.0}
            ]
        }
    }"#;

    #[test]
    fn logistic_member_scores_scaled_features() {
        let artifact = ScoringArtifact::from_json(LOGISTIC_ARTIFACT).expect("artifact loads");

        assert_eq!(artifact.model_version(), "pd-logit-test");
        assert_eq!(
            artifact.trained_on(),
            NaiveDate::from_ymd_opt(2025, 2, 14)
        );

        // z = -1 - 1.5 + 0.5 * (0.25 - 1.0) with the zero scale treated as one
        let expected = sigmoid(-1.0 - 1.5 - 0.375);
        let raw = artifact.raw_probability(&application(750));
        assert!((raw - expected).abs() < 1e-12);
        assert!((artifact.predict(&application(750)) - expected * 0.125).abs() < 1e-12);
    }

    #[test]
    fn stacked_forest_and_logistic_members_combine() {
        let raw = r#"{
            "format_version": 1,
            "model_version": "stack-test",
            "features": [
                {"name": "credit_score", "kind": "numeric"},
                {"name": "sector_manufacturing", "kind": "indicator"}
            ],
            "scaler": {"mean": [0.0, 0.0], "scale": [1.0, 1.0]},
            "ensemble": {
                "members": [
                    {"type": "forest", "trees": [
                        {"nodes": [
                            {"feature": 0, "threshold": 700.0, "left": 1, "right": 2},
                            {"probability": 0.6},
                            {"probability": 0.1}
                        ]},
                        {"nodes": [{"probability": 0.3}]}
                    ]},
                    {"type": "logistic", "coefficients": [0.0, 0.0], "intercept": 0.0}
                ],
                "combiner": {"type": "stacking", "weights": [2.0, 1.0], "intercept": -1.0}
            },
            "calibration_factor": 1.0
        }"#;
        let artifact = ScoringArtifact::from_json(raw).expect("artifact loads");

        // forest: (0.1 + 0.3) / 2 = 0.2; logistic: 0.5; stack z = -1 + 0.4 + 0.5
        let expected = sigmoid(-0.1);
        assert!((artifact.raw_probability(&application(750)) - expected).abs() < 1e-12);

        // a weaker score falls to the 0.6 leaf
        let expected_low = sigmoid(-1.0 + 2.0 * 0.45 + 0.5);
        assert!((artifact.raw_probability(&application(650)) - expected_low).abs() < 1e-12);
    }

    #[test]
    fn rejects_features_the_engine_cannot_derive() {
        let raw = LOGISTIC_ARTIFACT.replace("debt_to_revenue_ratio", "owner_age");
        let err = ScoringArtifact::from_json(&raw).expect_err("unknown feature rejected");
        assert!(matches!(err, ArtifactError::UnknownFeature(name) if name == "owner_age"));
    }

    #[test]
    fn rejects_kind_mismatch() {
        let raw = LOGISTIC_ARTIFACT.replace(
            r#"{"name": "credit_score", "kind": "numeric"}"#,
            r#"{"name": "credit_score", "kind": "indicator"}"#,
        );
        let err = ScoringArtifact::from_json(&raw).expect_err("kind mismatch rejected");
        assert!(matches!(err, ArtifactError::KindMismatch { .. }));
    }

    #[test]
    fn rejects_coefficient_width_mismatch() {
        let raw = LOGISTIC_ARTIFACT.replace("[-1.0, 0.5]", "[-1.0]");
        let err = ScoringArtifact::from_json(&raw).expect_err("width mismatch rejected");
        assert!(matches!(
            err,
            ArtifactError::DimensionMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unsupported_format_version() {
        let raw = LOGISTIC_ARTIFACT.replace("\"format_version\": 1", "\"format_version\": 2");
        let err = ScoringArtifact::from_json(&raw).expect_err("version rejected");
        assert!(matches!(
            err,
            ArtifactError::UnsupportedVersion {
                found: 2,
                expected: 1
            }
        ));
    }

    #[test]
    fn rejects_cyclic_tree() {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 0,
                    right: 1,
                },
                TreeNode::Leaf { probability: 0.2 },
            ],
        };
        let err = tree
            .validate(1, LeafKind::Probability)
            .expect_err("cycle rejected");
        assert!(err.contains("invalid child 0"));
    }

    const BOOSTED_ARTIFACT: &str = r#"{
        "format_version": 1,
        "model_version": "boosted-test",
        "features": [{"name": "credit_score", "kind": "numeric"}],
        "scaler": {"mean": [0.0], "scale": [1.0]},
        "ensemble": {
            "members": [
                {"type": "gradient_boosting", "base_score": -2.0, "learning_rate": 0.5, "trees": [
                    {"nodes": [
                        {"feature": 0, "threshold": 700.0, "left": 1, "right": 2},
                        {"value": 1.2},
                        {"value": -0.4}
                    ]},
                    {"nodes": [{"value": 0.2}]}
                ]}
            ]
        },
        "calibration_factor": 1.0
    }"#;

    #[test]
    fn boosted_member_sums_margins_in_log_odds() {
        let artifact = ScoringArtifact::from_json(BOOSTED_ARTIFACT).expect("artifact loads");

        // strong score: -2 + 0.5 * (-0.4 + 0.2)
        let strong = artifact.raw_probability(&application(750));
        assert!((strong - sigmoid(-2.1)).abs() < 1e-12);

        // weak score: -2 + 0.5 * (1.2 + 0.2)
        let weak = artifact.raw_probability(&application(650));
        assert!((weak - sigmoid(-1.3)).abs() < 1e-12);
    }

    #[test]
    fn boosted_learning_rate_defaults_to_one() {
        let raw = BOOSTED_ARTIFACT
            .replace("\"learning_rate\": 0.5, ", "")
            .replace("gradient_boosting", "xgboost");
        let artifact = ScoringArtifact::from_json(&raw).expect("artifact loads");

        let strong = artifact.raw_probability(&application(750));
        assert!((strong - sigmoid(-2.2)).abs() < 1e-12);
    }

    #[test]
    fn rejects_probability_leaves_in_boosted_trees() {
        let raw = BOOSTED_ARTIFACT.replace("{\"value\": 0.2}", "{\"probability\": 0.2}");
        let err = ScoringArtifact::from_json(&raw).expect_err("mixed leaves rejected");
        assert!(matches!(
            err,
            ArtifactError::MalformedTree { member: 0, tree: 1, ref detail }
                if detail.contains("probability leaf")
        ));
    }

    #[test]
    fn rejects_margin_leaves_in_forest_trees() {
        let tree = DecisionTree {
            nodes: vec![TreeNode::Margin { value: 0.3 }],
        };
        let err = tree
            .validate(1, LeafKind::Probability)
            .expect_err("margin leaf rejected");
        assert!(err.contains("margin leaf"));
    }

    #[test]
    fn rejects_sector_alias_declared_twice() {
        let raw = LOGISTIC_ARTIFACT.replace(
            r#"{"name": "debt_to_revenue_ratio", "kind": "numeric"}"#,
            r#"{"name": "sector_retail", "kind": "indicator"},
            {"name": "sector_retail_trade", "kind": "indicator"}"#,
        );
        let err = ScoringArtifact::from_json(&raw).expect_err("alias duplicate rejected");
        assert!(
            matches!(err, ArtifactError::DuplicateFeature(name) if name == "sector_retail_trade")
        );
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(-1_000.0), 0.0);
        assert_eq!(sigmoid(1_000.0), 1.0);
        assert!((sigmoid(0.0) - 0.5).abs() < f64::EPSILON);
    }
}
