use serde::{Deserialize, Serialize};

/// Hard go/no-go thresholds. A `None` threshold disables its rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityConfig {
    pub minimum_annual_revenue_ntd: Option<f64>,
    pub minimum_credit_score: Option<u16>,
    pub minimum_years_in_business: Option<u32>,
    pub maximum_debt_to_revenue: Option<f64>,
    pub minimum_collateral_coverage: Option<f64>,
    pub maximum_loan_amount_ntd: Option<f64>,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            minimum_annual_revenue_ntd: Some(1_000_000.0),
            minimum_credit_score: Some(400),
            minimum_years_in_business: Some(1),
            maximum_debt_to_revenue: Some(5.0),
            minimum_collateral_coverage: Some(0.5),
            maximum_loan_amount_ntd: Some(50_000_000.0),
        }
    }
}
