use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::{LoanApplication, Sector};
use super::artifact::sigmoid;
use super::{PdEstimate, PdScorer, ScorerDescriptor, ScorerKind};

/// Log-odds weights of the rule-based default estimator.
///
/// `z = intercept + credit_weight * (score - credit_pivot) / 100
///      + leverage_weight * min(dbr, leverage_cap)
///      + sector_log_odds[sector]
///      + tenure_weight * min(years, tenure_cap)`
/// and the estimate is `1 / (1 + e^-z)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackWeights {
    pub intercept: f64,
    pub credit_pivot: f64,
    /// Per 100 points above the pivot; negative so better scores lower the PD.
    pub credit_weight: f64,
    pub leverage_weight: f64,
    pub leverage_cap: f64,
    pub tenure_weight: f64,
    pub tenure_cap_years: u32,
    pub sector_log_odds: BTreeMap<Sector, f64>,
}

impl Default for FallbackWeights {
    fn default() -> Self {
        let sector_log_odds = BTreeMap::from([
            (Sector::Manufacturing, 0.0),
            (Sector::Technology, 0.1),
            (Sector::Services, 0.2),
            (Sector::Retail, 0.3),
            (Sector::Construction, 0.45),
            (Sector::Agriculture, 0.5),
            (Sector::Other, 0.3),
        ]);

        Self {
            intercept: -5.0,
            credit_pivot: 700.0,
            credit_weight: -1.5,
            leverage_weight: 0.6,
            leverage_cap: 5.0,
            tenure_weight: -0.06,
            tenure_cap_years: 20,
            sector_log_odds,
        }
    }
}

/// Deterministic estimator used whenever no trained artifact is available.
#[derive(Debug, Clone)]
pub struct RuleBasedScorer {
    weights: FallbackWeights,
}

impl RuleBasedScorer {
    pub fn new(weights: FallbackWeights) -> Self {
        Self { weights }
    }

    pub fn log_odds(&self, application: &LoanApplication) -> f64 {
        let weights = &self.weights;
        let ratios = application.ratios();

        let credit = weights.credit_weight
            * (f64::from(application.credit_score) - weights.credit_pivot)
            / 100.0;
        let leverage = weights.leverage_weight * ratios.debt_to_revenue.min(weights.leverage_cap);
        let sector = weights
            .sector_log_odds
            .get(&application.business_sector)
            .copied()
            .unwrap_or(0.0);
        let tenure = weights.tenure_weight
            * f64::from(application.years_in_business.min(weights.tenure_cap_years));

        weights.intercept + credit + leverage + sector + tenure
    }

    pub fn probability(&self, application: &LoanApplication) -> f64 {
        sigmoid(self.log_odds(application)).clamp(0.0, 1.0)
    }
}

impl PdScorer for RuleBasedScorer {
    fn score(&self, application: &LoanApplication) -> PdEstimate {
        PdEstimate {
            pd: self.probability(application),
            model_adjustment: 0.0,
            used_model: false,
        }
    }

    fn descriptor(&self) -> ScorerDescriptor {
        ScorerDescriptor {
            kind: ScorerKind::RuleBased,
            model_version: None,
            trained_on: None,
            features: Vec::new(),
        }
    }
}
