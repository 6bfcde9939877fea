use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::pricing::domain::{LoanApplication, Sector};
use crate::pricing::policy::PricingPolicy;
use crate::pricing::scoring::ScoringArtifact;
use crate::pricing::service::PricingEngine;
use crate::pricing::validation::LoanApplicationRequest;

/// Established manufacturer, modest leverage, fully collateralized.
pub(super) fn good_application() -> LoanApplication {
    LoanApplication {
        annual_revenue_ntd: 8_000_000.0,
        years_in_business: 10,
        num_employees: 40,
        business_sector: Sector::Manufacturing,
        credit_score: 750,
        loan_amount_ntd: 2_000_000.0,
        tenor_months: 36,
        collateral_value_ntd: 3_000_000.0,
        is_existing_customer: false,
        has_credit_guarantee: false,
    }
}

/// Retailer with a middling score and under-collateralized loan.
pub(super) fn marginal_application() -> LoanApplication {
    LoanApplication {
        annual_revenue_ntd: 3_000_000.0,
        years_in_business: 5,
        num_employees: 12,
        business_sector: Sector::Retail,
        credit_score: 620,
        loan_amount_ntd: 2_500_000.0,
        tenor_months: 60,
        collateral_value_ntd: 2_000_000.0,
        is_existing_customer: false,
        has_credit_guarantee: false,
    }
}

/// Fails the revenue and credit-score rules and nothing else.
pub(super) fn rejected_application() -> LoanApplication {
    LoanApplication {
        annual_revenue_ntd: 500_000.0,
        years_in_business: 3,
        num_employees: 5,
        business_sector: Sector::Retail,
        credit_score: 380,
        loan_amount_ntd: 2_000_000.0,
        tenor_months: 36,
        collateral_value_ntd: 3_000_000.0,
        is_existing_customer: false,
        has_credit_guarantee: false,
    }
}

pub(super) fn request(application: &LoanApplication) -> LoanApplicationRequest {
    LoanApplicationRequest::from(application)
}

pub(super) fn rule_based_engine() -> PricingEngine {
    PricingEngine::new(PricingPolicy::default(), None).expect("default policy valid")
}

/// Artifact whose single-leaf forest always yields `probability`.
pub(super) fn constant_artifact(probability: f64) -> Arc<ScoringArtifact> {
    let raw = format!(
        r#"{{
            "format_version": 1,
            "model_version": "constant-{probability}",
            "trained_on": "2025-01-31",
            "features": [{{"name": "credit_score", "kind": "numeric"}}],
            "scaler": {{"mean": [0.0], "scale": [1.0]}},
            "ensemble": {{
                "members": [{{"type": "forest", "trees": [{{"nodes": [{{"probability": {probability}}}]}}]}}]
            }},
            "calibration_factor": 1.0
        }}"#
    );
    Arc::new(ScoringArtifact::from_json(&raw).expect("artifact loads"))
}

pub(super) fn model_backed_engine(probability: f64) -> PricingEngine {
    PricingEngine::new(
        PricingPolicy::default(),
        Some(constant_artifact(probability)),
    )
    .expect("default policy valid")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
