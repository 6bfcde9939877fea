//! Loan intake, underwriting, and risk-based pricing.

pub mod approval;
pub mod batch;
pub mod domain;
pub mod eligibility;
pub mod grading;
pub mod policy;
pub mod rate;
pub mod repayment;
pub mod router;
pub mod scoring;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use approval::{ApprovalRecommendation, ApprovalRouter, ApprovalRule};
pub use batch::{price_csv, BatchError, BatchReport, BatchSummary};
pub use domain::{
    DerivedRatios, LoanApplication, PredictionResult, PricingDetails, Sector, SUPPORTED_TENORS,
};
pub use eligibility::{
    EligibilityConfig, EligibilityGate, EligibilityResult, EligibilityRule, FailedRule,
};
pub use grading::{GradeBand, RiskGrade, RiskGrader};
pub use policy::{PolicyError, PricingPolicy};
pub use rate::{ComponentKind, RateComponent, RateComposer, RateConfig, RateQuote};
pub use repayment::{amortize, RepaymentSchedule};
pub use router::pricing_router;
pub use scoring::{
    load_artifact, select_scorer, ArtifactError, PdEstimate, PdScorer, ScorerDescriptor,
    ScorerKind, ScoringArtifact,
};
pub use service::{PricingEngine, ASSESSMENT_COMPLETE, ELIGIBILITY_FAILED};
pub use validation::{
    FieldError, InputLimits, IntakeValidator, LoanApplicationRequest, ValidationError,
};
