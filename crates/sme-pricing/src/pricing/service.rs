use std::sync::Arc;

use tracing::debug;

use super::approval::ApprovalRouter;
use super::domain::{format_pct, round_to, LoanApplication, PredictionResult, PricingDetails};
use super::eligibility::EligibilityGate;
use super::grading::RiskGrader;
use super::policy::{PolicyError, PricingPolicy};
use super::rate::{RateComponent, RateComposer};
use super::repayment::amortize;
use super::scoring::{select_scorer, PdScorer, ScorerDescriptor, ScoringArtifact};
use super::validation::{IntakeValidator, LoanApplicationRequest, ValidationError};

pub const ASSESSMENT_COMPLETE: &str = "評估完成";
pub const ELIGIBILITY_FAILED: &str = "申請案未通過基本准入規則檢查，請修正後再申請";

const RATE_DECIMALS: i32 = 6;

/// Orchestrates validation, the eligibility gate, scoring, grading, rate composition,
/// amortization, and approval routing for one application at a time.
///
/// Holds no per-request state, so a single engine is shared across request handlers.
pub struct PricingEngine {
    policy: PricingPolicy,
    validator: IntakeValidator,
    gate: EligibilityGate,
    scorer: Arc<dyn PdScorer>,
    grader: RiskGrader,
    composer: RateComposer,
    approvals: ApprovalRouter,
}

impl PricingEngine {
    /// Validates the policy and picks the scorer once: model-backed when an artifact is
    /// supplied, rule-based otherwise.
    pub fn new(
        policy: PricingPolicy,
        artifact: Option<Arc<ScoringArtifact>>,
    ) -> Result<Self, PolicyError> {
        policy.validate()?;

        let grader = RiskGrader::new(policy.grades.clone())?;
        let approvals = ApprovalRouter::new(policy.approvals.clone(), grader.grades())?;
        let scorer = select_scorer(
            artifact,
            policy.fallback_scorer.clone(),
            policy.model_adjustment.clone(),
        );

        Ok(Self {
            validator: IntakeValidator::new(policy.input_limits.clone()),
            gate: EligibilityGate::new(policy.eligibility.clone()),
            composer: RateComposer::new(policy.rates.clone()),
            scorer,
            grader,
            approvals,
            policy,
        })
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    pub fn descriptor(&self) -> ScorerDescriptor {
        self.scorer.descriptor()
    }

    /// Validates a wire request and prices it.
    pub fn quote(
        &self,
        request: LoanApplicationRequest,
    ) -> Result<PredictionResult, ValidationError> {
        let application = self.validator.validate(&request)?;
        Ok(self.price(&application))
    }

    pub fn price(&self, application: &LoanApplication) -> PredictionResult {
        let eligibility = self.gate.evaluate(application);
        if !eligibility.eligible {
            debug!(
                failed_rules = eligibility.failed_rules.len(),
                "application rejected by eligibility gate"
            );
            return PredictionResult {
                is_eligible: false,
                failed_rules: eligibility.failed_rules,
                pricing: None,
                message: ELIGIBILITY_FAILED.to_string(),
            };
        }

        let estimate = self.scorer.score(application);
        let grade = self.grader.grade(estimate.pd);
        let quote = self.composer.compose(application, &estimate, &grade);
        let approval = self.approvals.route(quote.final_rate, &grade);
        let schedule = amortize(
            application.loan_amount_ntd,
            quote.final_rate,
            application.tenor_months,
        );

        debug!(
            pd = estimate.pd,
            risk_grade = grade.grade,
            final_rate = quote.final_rate,
            used_model = estimate.used_model,
            "application priced"
        );

        let final_rate = round_to(quote.final_rate, RATE_DECIMALS);
        let pd_score = round_to(estimate.pd, RATE_DECIMALS);
        let components = quote
            .components
            .into_iter()
            .map(|component| RateComponent {
                rate: round_to(component.rate, RATE_DECIMALS),
                ..component
            })
            .collect();

        PredictionResult {
            is_eligible: true,
            failed_rules: Vec::new(),
            pricing: Some(PricingDetails {
                final_rate,
                final_rate_pct: format_pct(quote.final_rate),
                rate_clamped: quote.clamped,
                pd_score,
                pd_score_pct: format_pct(estimate.pd),
                risk_grade: grade.grade,
                risk_grade_name: grade.name,
                risk_color: grade.color,
                components,
                monthly_payment: schedule.monthly_payment.round(),
                total_payment: schedule.total_payment.round(),
                total_interest: schedule.total_interest.round(),
                approval_decision: approval.decision,
                approval_authority: approval.authority,
                approval_conditions: approval.conditions,
                market_benchmark_rate: grade.market_rate,
                rate_vs_market: round_to(quote.final_rate - grade.market_rate, RATE_DECIMALS),
                ml_model_used: estimate.used_model,
            }),
            message: ASSESSMENT_COMPLETE.to_string(),
        }
    }
}
