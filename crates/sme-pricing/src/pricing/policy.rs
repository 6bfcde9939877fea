use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::approval::{default_approval_rules, ApprovalRouter, ApprovalRule};
use super::domain::Sector;
use super::eligibility::EligibilityConfig;
use super::grading::{default_grade_bands, GradeBand, RiskGrader};
use super::rate::RateConfig;
use super::scoring::{FallbackWeights, ModelAdjustmentConfig};
use super::validation::InputLimits;

/// Every externally tunable table of the engine. Sections missing from a policy document keep
/// their built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    pub eligibility: EligibilityConfig,
    pub rates: RateConfig,
    pub grades: Vec<GradeBand>,
    pub approvals: Vec<ApprovalRule>,
    pub fallback_scorer: FallbackWeights,
    pub model_adjustment: ModelAdjustmentConfig,
    pub input_limits: InputLimits,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            eligibility: EligibilityConfig::default(),
            rates: RateConfig::default(),
            grades: default_grade_bands(),
            approvals: default_approval_rules(),
            fallback_scorer: FallbackWeights::default(),
            model_adjustment: ModelAdjustmentConfig::default(),
            input_limits: InputLimits::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read pricing policy: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid pricing policy document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0} must be a finite number")]
    NonFinite(String),
    #[error("{0} must not be negative")]
    NegativeLimit(&'static str),
    #[error("rate floor {min} must be below rate ceiling {max}")]
    RateBounds { min: f64, max: f64 },
    #[error("LGD coverage offset {0} must lie within [0, 1]")]
    LgdOffset(f64),
    #[error("credit tiers leave score {score} uncovered or overlapping")]
    CreditTierGap { score: u16 },
    #[error("credit tier starting at {min_score} charges more than a weaker tier")]
    CreditPremiumOrder { min_score: u16 },
    #[error("leverage tier bounded at {max_ratio} is out of order")]
    LeverageTierOrder { max_ratio: f64 },
    #[error("no sector premium configured for {}", .0.as_str())]
    MissingSectorPremium(Sector),
    #[error("grade table is empty")]
    EmptyGradeTable,
    #[error("grade table expected grade {expected} but found {found}")]
    GradeNumbering { expected: usize, found: u8 },
    #[error("grade {grade} upper bound must exceed the previous grade's")]
    GradeBreakpoints { grade: u8 },
    #[error("grade table stops at PD {upper_bound}; the last grade must reach 1.0")]
    GradeCoverage { upper_bound: f64 },
    #[error("approval table has no catch-all entry for grade {grade}")]
    MissingApproval { grade: u8 },
    #[error("input limit {0} is inconsistent")]
    InputLimits(&'static str),
}

impl PricingPolicy {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PolicyError> {
        let policy: Self = serde_json::from_reader(reader)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Replaces the market benchmark component.
    pub fn with_base_rate(mut self, base_rate: f64) -> Self {
        self.rates.market_benchmark = base_rate;
        self
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        self.validate_eligibility()?;
        self.validate_input_limits()?;
        self.rates.validate()?;
        let grader = RiskGrader::new(self.grades.clone())?;
        ApprovalRouter::new(self.approvals.clone(), grader.grades())?;
        self.validate_scoring()
    }

    fn validate_eligibility(&self) -> Result<(), PolicyError> {
        let eligibility = &self.eligibility;
        let thresholds = [
            (
                "eligibility.minimum_annual_revenue_ntd",
                eligibility.minimum_annual_revenue_ntd,
            ),
            (
                "eligibility.maximum_debt_to_revenue",
                eligibility.maximum_debt_to_revenue,
            ),
            (
                "eligibility.minimum_collateral_coverage",
                eligibility.minimum_collateral_coverage,
            ),
            (
                "eligibility.maximum_loan_amount_ntd",
                eligibility.maximum_loan_amount_ntd,
            ),
        ];
        for (name, value) in thresholds {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(PolicyError::NonFinite(name.to_string()));
                }
                if value < 0.0 {
                    return Err(PolicyError::NegativeLimit(name));
                }
            }
        }
        Ok(())
    }

    fn validate_input_limits(&self) -> Result<(), PolicyError> {
        let limits = &self.input_limits;
        if !limits.max_loan_amount_ntd.is_finite() {
            return Err(PolicyError::NonFinite(
                "input_limits.max_loan_amount_ntd".to_string(),
            ));
        }
        if limits.max_loan_amount_ntd < 0.0 {
            return Err(PolicyError::NegativeLimit("input_limits.max_loan_amount_ntd"));
        }
        if limits.min_credit_score > limits.max_credit_score {
            return Err(PolicyError::InputLimits("input_limits.credit_score"));
        }
        if limits.max_years_in_business == 0 {
            return Err(PolicyError::InputLimits("input_limits.max_years_in_business"));
        }
        if limits.max_employees == 0 {
            return Err(PolicyError::InputLimits("input_limits.max_employees"));
        }
        Ok(())
    }

    fn validate_scoring(&self) -> Result<(), PolicyError> {
        let weights = &self.fallback_scorer;
        let scalars = [
            ("fallback_scorer.intercept", weights.intercept),
            ("fallback_scorer.credit_pivot", weights.credit_pivot),
            ("fallback_scorer.credit_weight", weights.credit_weight),
            ("fallback_scorer.leverage_weight", weights.leverage_weight),
            ("fallback_scorer.leverage_cap", weights.leverage_cap),
            ("fallback_scorer.tenure_weight", weights.tenure_weight),
            ("model_adjustment.scale", self.model_adjustment.scale),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, value)| !value.is_finite()) {
            return Err(PolicyError::NonFinite((*name).to_string()));
        }
        if weights.sector_log_odds.values().any(|value| !value.is_finite()) {
            return Err(PolicyError::NonFinite(
                "fallback_scorer.sector_log_odds".to_string(),
            ));
        }
        if self.model_adjustment.scale < 0.0 {
            return Err(PolicyError::NegativeLimit("model_adjustment.scale"));
        }
        Ok(())
    }
}
