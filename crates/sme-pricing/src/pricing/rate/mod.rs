mod config;

pub use config::{CreditTier, LeverageTier, LgdConfig, RateConfig, ScaleDiscountConfig};

use serde::Serialize;
use tracing::warn;

use super::domain::{format_signed_pct, LoanApplication};
use super::grading::RiskGrade;
use super::scoring::PdEstimate;

const TEN_MILLION_NTD: f64 = 10_000_000.0;

/// Named contributors to the quoted rate, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    MarketBenchmark,
    CreditPremium,
    LeverageSurcharge,
    ExpectedLoss,
    FundingCost,
    TargetSpread,
    TenorPremium,
    ScaleDiscount,
    SectorPremium,
    CompetitiveAdjustment,
    RelationshipDiscount,
    GuaranteeDiscount,
    ModelAdjustment,
}

impl ComponentKind {
    pub const fn label(self) -> &'static str {
        match self {
            ComponentKind::MarketBenchmark => "市場基準利率",
            ComponentKind::CreditPremium => "信用評分溢酬",
            ComponentKind::LeverageSurcharge => "負債比加成",
            ComponentKind::ExpectedLoss => "預期損失成本(PD×LGD)",
            ComponentKind::FundingCost => "資金成本",
            ComponentKind::TargetSpread => "目標利差",
            ComponentKind::TenorPremium => "期限溢酬",
            ComponentKind::ScaleDiscount => "規模折扣",
            ComponentKind::SectorPremium => "產業溢酬",
            ComponentKind::CompetitiveAdjustment => "市場競爭調整",
            ComponentKind::RelationshipDiscount => "客戶關係折扣",
            ComponentKind::GuaranteeDiscount => "信保擔保折扣",
            ComponentKind::ModelAdjustment => "ML模型微調",
        }
    }
}

/// One signed contribution to the quoted rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateComponent {
    pub key: ComponentKind,
    pub name: String,
    pub rate: f64,
    pub rate_pct: String,
}

impl RateComponent {
    fn new(key: ComponentKind, rate: f64) -> Self {
        Self {
            key,
            name: key.label().to_string(),
            rate,
            rate_pct: format_signed_pct(rate),
        }
    }
}

/// Composer output. `raw_rate` is the exact sum of `components`; `final_rate` is that sum
/// clamped to the legal range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateQuote {
    pub components: Vec<RateComponent>,
    pub raw_rate: f64,
    pub final_rate: f64,
    pub clamped: bool,
}

impl RateQuote {
    pub fn component(&self, key: ComponentKind) -> Option<&RateComponent> {
        self.components.iter().find(|component| component.key == key)
    }
}

/// Builds the quoted rate from the configured constants.
#[derive(Debug, Clone)]
pub struct RateComposer {
    config: RateConfig,
}

impl RateComposer {
    pub fn new(config: RateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RateConfig {
        &self.config
    }

    pub fn compose(
        &self,
        application: &LoanApplication,
        estimate: &PdEstimate,
        grade: &RiskGrade,
    ) -> RateQuote {
        let config = &self.config;
        let ratios = application.ratios();

        let components = vec![
            RateComponent::new(ComponentKind::MarketBenchmark, config.market_benchmark),
            RateComponent::new(
                ComponentKind::CreditPremium,
                self.credit_premium(application.credit_score),
            ),
            RateComponent::new(
                ComponentKind::LeverageSurcharge,
                self.leverage_surcharge(ratios.debt_to_revenue),
            ),
            RateComponent::new(
                ComponentKind::ExpectedLoss,
                estimate.pd * self.loss_given_default(ratios.collateral_coverage),
            ),
            RateComponent::new(ComponentKind::FundingCost, config.funding_cost),
            RateComponent::new(ComponentKind::TargetSpread, config.target_spread),
            RateComponent::new(
                ComponentKind::TenorPremium,
                config.tenor_premium_per_year * application.tenor_years(),
            ),
            RateComponent::new(
                ComponentKind::ScaleDiscount,
                self.scale_discount(application.loan_amount_ntd),
            ),
            RateComponent::new(
                ComponentKind::SectorPremium,
                config
                    .sector_premiums
                    .get(&application.business_sector)
                    .copied()
                    .unwrap_or(0.0),
            ),
            RateComponent::new(
                ComponentKind::CompetitiveAdjustment,
                config.competitive_adjustment,
            ),
            RateComponent::new(
                ComponentKind::RelationshipDiscount,
                if application.is_existing_customer {
                    config.relationship_discount
                } else {
                    0.0
                },
            ),
            RateComponent::new(
                ComponentKind::GuaranteeDiscount,
                if application.has_credit_guarantee {
                    config.guarantee_discount
                } else {
                    0.0
                },
            ),
            RateComponent::new(
                ComponentKind::ModelAdjustment,
                self.model_adjustment(estimate),
            ),
        ];

        let raw_rate: f64 = components.iter().map(|component| component.rate).sum();
        let final_rate = raw_rate.clamp(config.min_rate, config.max_rate);
        let clamped = final_rate != raw_rate;

        if (final_rate - raw_rate).abs() > config.clamp_log_threshold {
            warn!(
                raw_rate,
                final_rate,
                risk_grade = grade.grade,
                "composed rate clamped to legal range"
            );
        }

        RateQuote {
            components,
            raw_rate,
            final_rate,
            clamped,
        }
    }

    pub fn credit_premium(&self, credit_score: u16) -> f64 {
        self.config
            .credit_tiers
            .iter()
            .find(|tier| (tier.min_score..=tier.max_score).contains(&credit_score))
            .map(|tier| tier.premium)
            .unwrap_or_else(|| {
                // unreachable with a validated table; price as the weakest tier
                self.config
                    .credit_tiers
                    .iter()
                    .map(|tier| tier.premium)
                    .fold(0.0, f64::max)
            })
    }

    pub fn leverage_surcharge(&self, debt_to_revenue: f64) -> f64 {
        self.config
            .leverage_tiers
            .iter()
            .find(|tier| debt_to_revenue <= tier.max_ratio)
            .map(|tier| tier.surcharge)
            .unwrap_or(self.config.leverage_ceiling_surcharge)
    }

    pub fn loss_given_default(&self, collateral_coverage: f64) -> f64 {
        let lgd = &self.config.lgd;
        let offset = (collateral_coverage.max(0.0) * lgd.coverage_factor).min(lgd.max_offset);
        lgd.baseline * (1.0 - offset)
    }

    pub fn scale_discount(&self, loan_amount_ntd: f64) -> f64 {
        let scale = &self.config.scale_discount;
        (-scale.per_ten_million * loan_amount_ntd / TEN_MILLION_NTD).max(scale.floor)
    }

    fn model_adjustment(&self, estimate: &PdEstimate) -> f64 {
        if !estimate.used_model || !estimate.model_adjustment.is_finite() {
            return 0.0;
        }
        let limit = self.config.model_adjustment_limit;
        estimate.model_adjustment.clamp(-limit, limit)
    }
}
