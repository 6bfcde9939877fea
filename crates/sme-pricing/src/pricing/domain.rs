use serde::{Deserialize, Serialize};

use super::eligibility::FailedRule;
use super::rate::RateComponent;

/// Loan terms offered to applicants, in months.
pub const SUPPORTED_TENORS: [u16; 7] = [12, 24, 36, 48, 60, 72, 84];

/// Industry classification used for sector premiums and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Manufacturing,
    Technology,
    Services,
    #[serde(alias = "retail_trade")]
    Retail,
    Construction,
    Agriculture,
    Other,
}

impl Sector {
    pub const ALL: [Sector; 7] = [
        Sector::Manufacturing,
        Sector::Technology,
        Sector::Services,
        Sector::Retail,
        Sector::Construction,
        Sector::Agriculture,
        Sector::Other,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Sector::Manufacturing => "manufacturing",
            Sector::Technology => "technology",
            Sector::Services => "services",
            Sector::Retail => "retail",
            Sector::Construction => "construction",
            Sector::Agriculture => "agriculture",
            Sector::Other => "other",
        }
    }

    /// Parses the wire name, accepting the legacy `retail_trade` spelling.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "retail_trade" => Some(Sector::Retail),
            other => Self::ALL.into_iter().find(|sector| sector.as_str() == other),
        }
    }
}

/// Validated loan application. Built by the intake validator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub annual_revenue_ntd: f64,
    pub years_in_business: u32,
    pub num_employees: u32,
    pub business_sector: Sector,
    pub credit_score: u16,
    pub loan_amount_ntd: f64,
    pub tenor_months: u16,
    pub collateral_value_ntd: f64,
    pub is_existing_customer: bool,
    pub has_credit_guarantee: bool,
}

impl LoanApplication {
    pub fn ratios(&self) -> DerivedRatios {
        DerivedRatios::from_application(self)
    }

    pub fn tenor_years(&self) -> f64 {
        f64::from(self.tenor_months) / 12.0
    }

    pub fn revenue_per_employee(&self) -> f64 {
        self.annual_revenue_ntd / f64::from(self.num_employees.max(1))
    }
}

/// Leverage and collateral ratios, always recomputed from the application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedRatios {
    pub debt_to_revenue: f64,
    pub collateral_coverage: f64,
}

impl DerivedRatios {
    pub fn from_application(application: &LoanApplication) -> Self {
        Self {
            debt_to_revenue: application.loan_amount_ntd / application.annual_revenue_ntd.max(1.0),
            collateral_coverage: application.collateral_value_ntd
                / application.loan_amount_ntd.max(1.0),
        }
    }
}

/// Outcome of a pricing request. Pricing fields are present only for eligible applications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub is_eligible: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_rules: Vec<FailedRule>,
    #[serde(flatten)]
    pub pricing: Option<PricingDetails>,
    pub message: String,
}

/// Quoted rate, risk view, repayment figures, and approval routing for an eligible application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingDetails {
    pub final_rate: f64,
    pub final_rate_pct: String,
    pub rate_clamped: bool,
    pub pd_score: f64,
    pub pd_score_pct: String,
    pub risk_grade: u8,
    pub risk_grade_name: String,
    pub risk_color: String,
    pub components: Vec<RateComponent>,
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
    pub approval_decision: String,
    pub approval_authority: String,
    pub approval_conditions: String,
    pub market_benchmark_rate: f64,
    pub rate_vs_market: f64,
    pub ml_model_used: bool,
}

pub(crate) fn format_pct(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

pub(crate) fn format_signed_pct(rate: f64) -> String {
    format!("{:+.2}%", rate * 100.0)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_parse_accepts_legacy_retail_name() {
        assert_eq!(Sector::parse("retail_trade"), Some(Sector::Retail));
        assert_eq!(Sector::parse(" Technology "), Some(Sector::Technology));
        assert_eq!(Sector::parse("mining"), None);
    }

    #[test]
    fn ratios_floor_zero_denominators() {
        let application = LoanApplication {
            annual_revenue_ntd: 0.0,
            years_in_business: 1,
            num_employees: 1,
            business_sector: Sector::Other,
            credit_score: 600,
            loan_amount_ntd: 0.0,
            tenor_months: 12,
            collateral_value_ntd: 500.0,
            is_existing_customer: false,
            has_credit_guarantee: false,
        };

        let ratios = application.ratios();
        assert_eq!(ratios.debt_to_revenue, 0.0);
        assert_eq!(ratios.collateral_coverage, 500.0);
    }

    #[test]
    fn signed_percent_keeps_sign() {
        assert_eq!(format_signed_pct(-0.005), "-0.50%");
        assert_eq!(format_signed_pct(0.02), "+2.00%");
        assert_eq!(format_pct(0.044826), "4.48%");
    }
}
