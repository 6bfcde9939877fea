use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::super::domain::LoanApplication;
use super::artifact::ScoringArtifact;
use super::fallback::RuleBasedScorer;
use super::{PdEstimate, PdScorer, ScorerDescriptor, ScorerKind};

/// Controls how far the trained model may move the quoted rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelAdjustmentConfig {
    /// Multiplier applied to the gap between the model PD and the rule-based PD.
    pub scale: f64,
}

impl Default for ModelAdjustmentConfig {
    fn default() -> Self {
        Self { scale: 0.1 }
    }
}

/// Scores applications with the trained ensemble, anchoring the rate nudge to the rule-based
/// estimate.
#[derive(Debug, Clone)]
pub struct ModelBackedScorer {
    artifact: Arc<ScoringArtifact>,
    baseline: RuleBasedScorer,
    adjustment: ModelAdjustmentConfig,
}

impl ModelBackedScorer {
    pub fn new(
        artifact: Arc<ScoringArtifact>,
        baseline: RuleBasedScorer,
        adjustment: ModelAdjustmentConfig,
    ) -> Self {
        Self {
            artifact,
            baseline,
            adjustment,
        }
    }
}

impl PdScorer for ModelBackedScorer {
    fn score(&self, application: &LoanApplication) -> PdEstimate {
        let pd = self.artifact.predict(application);
        let rule_pd = self.baseline.probability(application);

        PdEstimate {
            pd,
            model_adjustment: (pd - rule_pd) * self.adjustment.scale,
            used_model: true,
        }
    }

    fn descriptor(&self) -> ScorerDescriptor {
        ScorerDescriptor {
            kind: ScorerKind::ModelBacked,
            model_version: Some(self.artifact.model_version().to_string()),
            trained_on: self.artifact.trained_on(),
            features: self
                .artifact
                .features()
                .iter()
                .map(|spec| spec.name.clone())
                .collect(),
        }
    }
}
