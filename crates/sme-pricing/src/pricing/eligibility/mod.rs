mod config;
mod rules;

pub use config::EligibilityConfig;

use super::domain::LoanApplication;
use serde::{Deserialize, Serialize};

/// Stateless gate applying the hard eligibility thresholds to an application.
#[derive(Debug, Clone)]
pub struct EligibilityGate {
    config: EligibilityConfig,
}

impl EligibilityGate {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, application: &LoanApplication) -> EligibilityResult {
        EligibilityResult::from_failures(rules::failed_rules(application, &self.config))
    }
}

/// Identifies which hard rule an application violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityRule {
    MinimumAnnualRevenue,
    MinimumCreditScore,
    MinimumYearsInBusiness,
    MaximumDebtToRevenue,
    MinimumCollateralCoverage,
    MaximumLoanAmount,
}

/// A violated rule with display-ready actual and required values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRule {
    pub code: EligibilityRule,
    pub rule: String,
    pub actual: String,
    pub required: String,
}

/// Gate outcome. `failed_rules` is empty exactly when `eligible` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub eligible: bool,
    pub failed_rules: Vec<FailedRule>,
}

impl EligibilityResult {
    pub fn from_failures(failed_rules: Vec<FailedRule>) -> Self {
        Self {
            eligible: failed_rules.is_empty(),
            failed_rules,
        }
    }
}
