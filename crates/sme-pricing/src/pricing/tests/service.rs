use super::common::*;
use crate::pricing::rate::ComponentKind;
use crate::pricing::service::{ASSESSMENT_COMPLETE, ELIGIBILITY_FAILED};
use crate::pricing::validation::LoanApplicationRequest;

#[test]
fn good_applicant_gets_best_grade_and_low_rate() {
    let result = rule_based_engine().price(&good_application());

    assert!(result.is_eligible);
    assert!(result.failed_rules.is_empty());
    assert_eq!(result.message, ASSESSMENT_COMPLETE);

    let pricing = result.pricing.expect("pricing present");
    assert!((0.035..=0.045).contains(&pricing.final_rate));
    assert_eq!(pricing.final_rate, 0.044826);
    assert_eq!(pricing.final_rate_pct, "4.48%");
    assert_eq!(pricing.risk_grade, 1);
    assert_eq!(pricing.risk_grade_name, "優良");
    assert_eq!(pricing.risk_color, "#28a745");
    assert_eq!(pricing.approval_decision, "建議核准");
    assert_eq!(pricing.approval_authority, "分行經理");
    assert_eq!(pricing.market_benchmark_rate, 0.028);
    assert_eq!(pricing.rate_vs_market, 0.016826);
    assert_eq!(pricing.monthly_payment, 59_478.0);
    assert_eq!(pricing.total_payment, 2_141_219.0);
    assert_eq!(pricing.total_interest, 141_219.0);
    assert_eq!(pricing.components.len(), 13);
    assert!(!pricing.rate_clamped);
    assert!(!pricing.ml_model_used);
}

#[test]
fn marginal_applicant_gets_mid_grade() {
    let result = rule_based_engine().price(&marginal_application());

    let pricing = result.pricing.expect("pricing present");
    assert!((0.06..=0.08).contains(&pricing.final_rate));
    assert_eq!(pricing.risk_grade, 4);
    assert_eq!(pricing.risk_grade_name, "普通");
    assert_eq!(pricing.approval_decision, "條件核准");
    assert_eq!(pricing.approval_authority, "區域主管");
    assert_eq!(pricing.approval_conditions, "需額外擔保或保證人");
    assert!((pricing.pd_score - 0.035571).abs() < 1e-6);
    assert_eq!(pricing.pd_score_pct, "3.56%");
}

#[test]
fn rejected_applicant_gets_no_pricing() {
    let result = rule_based_engine().price(&rejected_application());

    assert!(!result.is_eligible);
    assert!(result.pricing.is_none());
    assert_eq!(result.failed_rules.len(), 2);
    assert_eq!(result.message, ELIGIBILITY_FAILED);
}

#[test]
fn pricing_fields_are_serialized_only_when_eligible() {
    let engine = rule_based_engine();

    let eligible = serde_json::to_value(engine.price(&good_application())).expect("serialize");
    assert_eq!(eligible["is_eligible"], true);
    assert_eq!(eligible["risk_grade"], 1);
    assert_eq!(eligible["components"][0]["key"], "market_benchmark");
    assert_eq!(eligible["components"][0]["rate_pct"], "+2.00%");
    assert!(eligible.get("failed_rules").is_none());

    let rejected = serde_json::to_value(engine.price(&rejected_application())).expect("serialize");
    assert_eq!(rejected["is_eligible"], false);
    assert_eq!(rejected["failed_rules"][0]["code"], "minimum_annual_revenue");
    assert_eq!(rejected["failed_rules"][1]["code"], "minimum_credit_score");
    for field in ["final_rate", "pd_score", "risk_grade", "components", "monthly_payment"] {
        assert!(rejected.get(field).is_none(), "{field} leaked into rejection");
    }
}

#[test]
fn pricing_is_idempotent() {
    let engine = rule_based_engine();

    let first = serde_json::to_vec(&engine.price(&marginal_application())).expect("serialize");
    let second = serde_json::to_vec(&engine.price(&marginal_application())).expect("serialize");

    assert_eq!(first, second);

    let model_engine = model_backed_engine(0.04);
    let first = serde_json::to_vec(&model_engine.price(&good_application())).expect("serialize");
    let second = serde_json::to_vec(&model_engine.price(&good_application())).expect("serialize");

    assert_eq!(first, second);
}

#[test]
fn model_backed_engine_marks_result_and_bounds_adjustment() {
    let engine = model_backed_engine(0.04);

    let pricing = engine
        .price(&good_application())
        .pricing
        .expect("pricing present");

    assert!(pricing.ml_model_used);
    assert_eq!(pricing.pd_score, 0.04);
    assert_eq!(pricing.risk_grade, 4);

    let adjustment = pricing
        .components
        .iter()
        .find(|component| component.key == ComponentKind::ModelAdjustment)
        .expect("model adjustment component");
    assert!((adjustment.rate - (0.04 - 0.002025) * 0.1).abs() < 1e-6);
    assert!(adjustment.rate.abs() <= 0.005);
    assert!((pricing.final_rate - 0.0577375).abs() < 1e-6);
}

#[test]
fn quote_validates_before_pricing() {
    let engine = rule_based_engine();

    let mut invalid = request(&good_application());
    invalid.tenor_months = Some(serde_json::json!(18));
    invalid.credit_score = None;
    let err = engine.quote(invalid).expect_err("invalid request");
    let fields: Vec<&str> = err.errors.iter().map(|error| error.field).collect();
    assert_eq!(fields, vec!["credit_score", "tenor_months"]);

    let result = engine
        .quote(request(&good_application()))
        .expect("valid request");
    assert!(result.is_eligible);
}

#[test]
fn quote_rejects_empty_request() {
    let err = rule_based_engine()
        .quote(LoanApplicationRequest::default())
        .expect_err("empty request");
    assert_eq!(err.errors.len(), 8);
}
