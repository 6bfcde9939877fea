use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::Sector;
use super::super::policy::PolicyError;

const LOWEST_CREDIT_SCORE: u16 = 300;
const HIGHEST_CREDIT_SCORE: u16 = 850;

/// Inclusive credit-score band and its premium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTier {
    pub min_score: u16,
    pub max_score: u16,
    pub premium: f64,
    pub label: String,
}

/// Surcharge applied while the debt-to-revenue ratio stays at or below `max_ratio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageTier {
    pub max_ratio: f64,
    pub surcharge: f64,
}

/// Loss-given-default model: `baseline * (1 - min(coverage * coverage_factor, max_offset))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LgdConfig {
    pub baseline: f64,
    pub coverage_factor: f64,
    pub max_offset: f64,
}

/// Economies-of-scale discount, `-per_ten_million * amount / 10M`, never below `floor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleDiscountConfig {
    pub per_ten_million: f64,
    pub floor: f64,
}

/// Constants of the rate formula. All rates are annual fractions (0.02 = 2%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub market_benchmark: f64,
    pub credit_tiers: Vec<CreditTier>,
    pub leverage_tiers: Vec<LeverageTier>,
    /// Surcharge once the ratio exceeds every tier.
    pub leverage_ceiling_surcharge: f64,
    pub lgd: LgdConfig,
    pub funding_cost: f64,
    pub target_spread: f64,
    pub tenor_premium_per_year: f64,
    pub scale_discount: ScaleDiscountConfig,
    pub sector_premiums: BTreeMap<Sector, f64>,
    pub competitive_adjustment: f64,
    pub relationship_discount: f64,
    pub guarantee_discount: f64,
    /// Symmetric bound on the model fine-tune component.
    pub model_adjustment_limit: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    /// Clamps moving the rate further than this are logged.
    pub clamp_log_threshold: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        let credit_tiers = [
            (750, 850, 0.0, "優質"),
            (700, 749, 0.0025, "良好"),
            (650, 699, 0.005, "尚可"),
            (600, 649, 0.010, "普通"),
            (550, 599, 0.020, "偏低"),
            (300, 549, 0.035, "低"),
        ]
        .into_iter()
        .map(|(min_score, max_score, premium, label)| CreditTier {
            min_score,
            max_score,
            premium,
            label: label.to_string(),
        })
        .collect();

        let leverage_tiers = [
            (0.5, 0.0),
            (1.0, 0.005),
            (2.0, 0.015),
            (3.0, 0.030),
            (5.0, 0.050),
        ]
        .into_iter()
        .map(|(max_ratio, surcharge)| LeverageTier {
            max_ratio,
            surcharge,
        })
        .collect();

        let sector_premiums = BTreeMap::from([
            (Sector::Manufacturing, 0.0),
            (Sector::Technology, 0.0),
            (Sector::Services, 0.0025),
            (Sector::Retail, 0.0030),
            (Sector::Construction, 0.0040),
            (Sector::Agriculture, 0.0045),
            (Sector::Other, 0.0030),
        ]);

        Self {
            // central bank rediscount rate 1.875% plus 0.125% bank funding premium
            market_benchmark: 0.01875 + 0.00125,
            credit_tiers,
            leverage_tiers,
            leverage_ceiling_surcharge: 0.050,
            lgd: LgdConfig {
                baseline: 0.40,
                coverage_factor: 0.4,
                max_offset: 0.4,
            },
            funding_cost: 0.0100,
            target_spread: 0.0150,
            tenor_premium_per_year: 0.0015,
            scale_discount: ScaleDiscountConfig {
                per_ten_million: 0.0008,
                floor: -0.0100,
            },
            sector_premiums,
            competitive_adjustment: -0.0050,
            relationship_discount: -0.0030,
            guarantee_discount: -0.0025,
            model_adjustment_limit: 0.005,
            min_rate: 0.025,
            max_rate: 0.120,
            clamp_log_threshold: 0.0001,
        }
    }
}

impl RateConfig {
    pub(crate) fn validate(&self) -> Result<(), PolicyError> {
        let scalars = [
            ("market_benchmark", self.market_benchmark),
            ("leverage_ceiling_surcharge", self.leverage_ceiling_surcharge),
            ("lgd.baseline", self.lgd.baseline),
            ("lgd.coverage_factor", self.lgd.coverage_factor),
            ("lgd.max_offset", self.lgd.max_offset),
            ("funding_cost", self.funding_cost),
            ("target_spread", self.target_spread),
            ("tenor_premium_per_year", self.tenor_premium_per_year),
            ("scale_discount.per_ten_million", self.scale_discount.per_ten_million),
            ("scale_discount.floor", self.scale_discount.floor),
            ("competitive_adjustment", self.competitive_adjustment),
            ("relationship_discount", self.relationship_discount),
            ("guarantee_discount", self.guarantee_discount),
            ("model_adjustment_limit", self.model_adjustment_limit),
            ("min_rate", self.min_rate),
            ("max_rate", self.max_rate),
            ("clamp_log_threshold", self.clamp_log_threshold),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, value)| !value.is_finite()) {
            return Err(PolicyError::NonFinite(format!("rates.{name}")));
        }

        if self.min_rate >= self.max_rate {
            return Err(PolicyError::RateBounds {
                min: self.min_rate,
                max: self.max_rate,
            });
        }

        if self.model_adjustment_limit < 0.0 {
            return Err(PolicyError::NegativeLimit("rates.model_adjustment_limit"));
        }

        if !(0.0..=1.0).contains(&self.lgd.max_offset) {
            return Err(PolicyError::LgdOffset(self.lgd.max_offset));
        }

        self.validate_credit_tiers()?;
        self.validate_leverage_tiers()?;

        if let Some(sector) = Sector::ALL
            .into_iter()
            .find(|sector| !self.sector_premiums.contains_key(sector))
        {
            return Err(PolicyError::MissingSectorPremium(sector));
        }
        if self.sector_premiums.values().any(|premium| !premium.is_finite()) {
            return Err(PolicyError::NonFinite("rates.sector_premiums".to_string()));
        }

        Ok(())
    }

    /// Tiers must tile 300..=850 and premiums must not rise as scores improve.
    fn validate_credit_tiers(&self) -> Result<(), PolicyError> {
        let mut tiers: Vec<&CreditTier> = self.credit_tiers.iter().collect();
        tiers.sort_by_key(|tier| tier.min_score);

        let mut next_score = LOWEST_CREDIT_SCORE;
        let mut previous_premium = f64::INFINITY;
        for tier in tiers {
            if tier.min_score != next_score || tier.max_score < tier.min_score {
                return Err(PolicyError::CreditTierGap { score: next_score });
            }
            if !tier.premium.is_finite() || tier.premium > previous_premium {
                return Err(PolicyError::CreditPremiumOrder {
                    min_score: tier.min_score,
                });
            }
            previous_premium = tier.premium;
            next_score = tier.max_score.saturating_add(1);
        }

        if next_score <= HIGHEST_CREDIT_SCORE {
            return Err(PolicyError::CreditTierGap { score: next_score });
        }
        Ok(())
    }

    fn validate_leverage_tiers(&self) -> Result<(), PolicyError> {
        let mut previous: Option<&LeverageTier> = None;
        for tier in &self.leverage_tiers {
            if !tier.max_ratio.is_finite() || !tier.surcharge.is_finite() {
                return Err(PolicyError::NonFinite("rates.leverage_tiers".to_string()));
            }
            if let Some(previous) = previous {
                if tier.max_ratio <= previous.max_ratio || tier.surcharge < previous.surcharge {
                    return Err(PolicyError::LeverageTierOrder {
                        max_ratio: tier.max_ratio,
                    });
                }
            }
            previous = Some(tier);
        }
        if let Some(last) = previous {
            if self.leverage_ceiling_surcharge < last.surcharge {
                return Err(PolicyError::LeverageTierOrder {
                    max_ratio: f64::INFINITY,
                });
            }
        }
        Ok(())
    }
}
