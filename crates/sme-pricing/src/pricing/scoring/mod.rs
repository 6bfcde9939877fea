//! Probability-of-default estimation.
//!
//! Two interchangeable strategies sit behind [`PdScorer`]: the trained ensemble loaded from a
//! [`ScoringArtifact`] and the deterministic [`RuleBasedScorer`]. The engine picks one at
//! construction time from whether an artifact was loaded.

mod artifact;
mod fallback;
mod features;
mod model;

pub use artifact::{
    ArtifactError, Combiner, DecisionTree, Ensemble, Estimator, ScoringArtifact, StandardScaler,
    TreeNode, SUPPORTED_FORMAT_VERSION,
};
pub use fallback::{FallbackWeights, RuleBasedScorer};
pub use features::{sector_risk, FeatureKey, FeatureKind, FeatureSpec};
pub use model::{ModelAdjustmentConfig, ModelBackedScorer};

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::LoanApplication;

/// Capability shared by the model-backed and rule-based estimators.
pub trait PdScorer: Send + Sync {
    /// Must be total over every validated application and return `pd` in `[0, 1]`.
    fn score(&self, application: &LoanApplication) -> PdEstimate;

    fn descriptor(&self) -> ScorerDescriptor;
}

/// Default probability plus the signed rate nudge the model suggests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdEstimate {
    pub pd: f64,
    /// Unclamped; the rate composer bounds it.
    pub model_adjustment: f64,
    pub used_model: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    ModelBacked,
    RuleBased,
}

/// Operational description of the active scorer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorerDescriptor {
    pub kind: ScorerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

/// Chooses the scoring strategy once, based on artifact presence.
pub fn select_scorer(
    artifact: Option<Arc<ScoringArtifact>>,
    weights: FallbackWeights,
    adjustment: ModelAdjustmentConfig,
) -> Arc<dyn PdScorer> {
    let baseline = RuleBasedScorer::new(weights);
    match artifact {
        Some(artifact) => Arc::new(ModelBackedScorer::new(artifact, baseline, adjustment)),
        None => Arc::new(baseline),
    }
}

/// Loads the artifact at startup. A missing path or a rejected artifact is logged and yields
/// `None` so the process keeps serving with the rule-based scorer.
pub fn load_artifact(path: Option<&Path>) -> Option<Arc<ScoringArtifact>> {
    let Some(path) = path else {
        warn!("no scoring artifact configured; using rule-based PD estimates");
        return None;
    };

    if !path.exists() {
        warn!(path = %path.display(), "scoring artifact not found; using rule-based PD estimates");
        return None;
    }

    match ScoringArtifact::load(path) {
        Ok(artifact) => {
            info!(
                path = %path.display(),
                model_version = artifact.model_version(),
                features = artifact.features().len(),
                "scoring artifact loaded"
            );
            Some(Arc::new(artifact))
        }
        Err(err) => {
            error!(
                path = %path.display(),
                error = %err,
                "scoring artifact rejected; using rule-based PD estimates"
            );
            None
        }
    }
}
