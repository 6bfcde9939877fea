use serde::{Deserialize, Serialize};

use super::super::domain::{DerivedRatios, LoanApplication, Sector};

/// Value used for `existing_debt_proxy` at inference; applicants do not report it.
const EXISTING_DEBT_PROXY: f64 = 0.08;

/// Encoding a feature was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Indicator,
}

/// One entry of an artifact's declared feature schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
}

/// Features the engine knows how to derive from an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKey {
    AnnualRevenue,
    RevenuePerEmployee,
    YearsInBusiness,
    NumEmployees,
    BusinessGrowthProxy,
    CreditScore,
    OwnerExperienceYears,
    BusinessSectorRisk,
    LoanAmount,
    DebtToRevenueRatio,
    CollateralCoverage,
    TenorMonths,
    ExistingDebtProxy,
    SectorIndicator(Sector),
    ExistingCustomer,
    CreditGuarantee,
}

impl FeatureKey {
    pub fn parse(name: &str) -> Option<Self> {
        let key = match name {
            "annual_revenue_ntd" => Self::AnnualRevenue,
            "revenue_per_employee" => Self::RevenuePerEmployee,
            "years_in_business" => Self::YearsInBusiness,
            "num_employees" => Self::NumEmployees,
            "business_growth_proxy" => Self::BusinessGrowthProxy,
            "credit_score" => Self::CreditScore,
            "owner_experience_years" => Self::OwnerExperienceYears,
            "business_sector_risk" => Self::BusinessSectorRisk,
            "loan_amount_ntd" => Self::LoanAmount,
            "debt_to_revenue_ratio" => Self::DebtToRevenueRatio,
            "collateral_coverage" => Self::CollateralCoverage,
            "tenor_months" => Self::TenorMonths,
            "existing_debt_proxy" => Self::ExistingDebtProxy,
            "is_existing_customer" => Self::ExistingCustomer,
            "has_credit_guarantee" => Self::CreditGuarantee,
            other => {
                let sector = other.strip_prefix("sector_").and_then(Sector::parse)?;
                Self::SectorIndicator(sector)
            }
        };
        Some(key)
    }

    pub fn kind(self) -> FeatureKind {
        match self {
            Self::SectorIndicator(_) | Self::ExistingCustomer | Self::CreditGuarantee => {
                FeatureKind::Indicator
            }
            _ => FeatureKind::Numeric,
        }
    }

    pub fn value(self, application: &LoanApplication, ratios: &DerivedRatios) -> f64 {
        match self {
            Self::AnnualRevenue => application.annual_revenue_ntd,
            Self::RevenuePerEmployee => application.revenue_per_employee(),
            Self::YearsInBusiness | Self::OwnerExperienceYears => {
                f64::from(application.years_in_business)
            }
            Self::NumEmployees => f64::from(application.num_employees),
            Self::BusinessGrowthProxy | Self::DebtToRevenueRatio => ratios.debt_to_revenue,
            Self::CreditScore => f64::from(application.credit_score),
            Self::BusinessSectorRisk => sector_risk(application.business_sector),
            Self::LoanAmount => application.loan_amount_ntd,
            Self::CollateralCoverage => ratios.collateral_coverage,
            Self::TenorMonths => f64::from(application.tenor_months),
            Self::ExistingDebtProxy => EXISTING_DEBT_PROXY,
            Self::SectorIndicator(sector) => indicator(application.business_sector == sector),
            Self::ExistingCustomer => indicator(application.is_existing_customer),
            Self::CreditGuarantee => indicator(application.has_credit_guarantee),
        }
    }
}

/// Sector risk encoding the ensemble was trained against.
pub fn sector_risk(sector: Sector) -> f64 {
    match sector {
        Sector::Manufacturing => 0.15,
        Sector::Retail => 0.20,
        Sector::Technology => 0.22,
        Sector::Services => 0.25,
        Sector::Construction => 0.28,
        Sector::Agriculture => 0.30,
        Sector::Other => 0.25,
    }
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Resolved, ordered schema; building one is the only place names are interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayout {
    keys: Vec<FeatureKey>,
}

impl FeatureLayout {
    pub(crate) fn new(keys: Vec<FeatureKey>) -> Self {
        Self { keys }
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn vector(&self, application: &LoanApplication) -> Vec<f64> {
        let ratios = application.ratios();
        self.keys
            .iter()
            .map(|key| key.value(application, &ratios))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> LoanApplication {
        LoanApplication {
            annual_revenue_ntd: 6_000_000.0,
            years_in_business: 7,
            num_employees: 30,
            business_sector: Sector::Construction,
            credit_score: 690,
            loan_amount_ntd: 3_000_000.0,
            tenor_months: 48,
            collateral_value_ntd: 1_500_000.0,
            is_existing_customer: true,
            has_credit_guarantee: false,
        }
    }

    #[test]
    fn parses_named_and_one_hot_features() {
        assert_eq!(
            FeatureKey::parse("credit_score"),
            Some(FeatureKey::CreditScore)
        );
        assert_eq!(
            FeatureKey::parse("sector_retail_trade"),
            Some(FeatureKey::SectorIndicator(Sector::Retail))
        );
        assert_eq!(FeatureKey::parse("sector_mining"), None);
        assert_eq!(FeatureKey::parse("owner_age"), None);
        assert_eq!(
            FeatureKey::parse("sector_agriculture").map(FeatureKey::kind),
            Some(FeatureKind::Indicator)
        );
    }

    #[test]
    fn vector_follows_declared_order() {
        let layout = FeatureLayout::new(vec![
            FeatureKey::DebtToRevenueRatio,
            FeatureKey::SectorIndicator(Sector::Construction),
            FeatureKey::SectorIndicator(Sector::Retail),
            FeatureKey::RevenuePerEmployee,
            FeatureKey::ExistingCustomer,
            FeatureKey::BusinessSectorRisk,
        ]);

        let vector = layout.vector(&application());

        assert_eq!(vector, vec![0.5, 1.0, 0.0, 200_000.0, 1.0, 0.28]);
    }
}
