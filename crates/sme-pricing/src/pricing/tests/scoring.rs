use super::common::*;
use crate::pricing::domain::Sector;
use crate::pricing::scoring::{
    load_artifact, select_scorer, FallbackWeights, ModelAdjustmentConfig, PdScorer,
    RuleBasedScorer, ScorerKind,
};
use std::path::Path;

fn rule_based() -> RuleBasedScorer {
    RuleBasedScorer::new(FallbackWeights::default())
}

#[test]
fn rule_based_pd_matches_documented_log_odds() {
    let scorer = rule_based();

    // -5.0 - 1.5 * 0.5 + 0.6 * 0.25 + 0.0 - 0.06 * 10
    let z = scorer.log_odds(&good_application());
    assert!((z + 6.2).abs() < 1e-12);

    let estimate = scorer.score(&good_application());
    assert!((estimate.pd - 0.002025).abs() < 1e-6);
    assert_eq!(estimate.model_adjustment, 0.0);
    assert!(!estimate.used_model);
}

#[test]
fn better_credit_lowers_pd() {
    let scorer = rule_based();
    let mut previous = f64::INFINITY;

    for credit_score in (300..=850).step_by(25) {
        let mut application = marginal_application();
        application.credit_score = credit_score;
        let pd = scorer.score(&application).pd;
        assert!(pd < previous, "pd did not fall at score {credit_score}");
        previous = pd;
    }
}

#[test]
fn heavier_leverage_raises_pd() {
    let scorer = rule_based();
    let mut previous = 0.0;

    for loan in [500_000.0, 1_000_000.0, 3_000_000.0, 8_000_000.0, 14_000_000.0] {
        let mut application = marginal_application();
        application.loan_amount_ntd = loan;
        let pd = scorer.score(&application).pd;
        assert!(pd > previous, "pd did not rise at loan {loan}");
        previous = pd;
    }
}

#[test]
fn rule_based_pd_stays_in_unit_interval_at_extremes() {
    let scorer = rule_based();
    let mut application = rejected_application();
    application.annual_revenue_ntd = 0.0;
    application.credit_score = 300;
    application.business_sector = Sector::Agriculture;

    let pd = scorer.score(&application).pd;
    assert!((0.0..=1.0).contains(&pd));
}

#[test]
fn model_backed_scorer_reports_adjustment_against_rule_pd() {
    let scorer = select_scorer(
        Some(constant_artifact(0.04)),
        FallbackWeights::default(),
        ModelAdjustmentConfig::default(),
    );
    let rule_pd = rule_based().probability(&good_application());

    let estimate = scorer.score(&good_application());

    assert!(estimate.used_model);
    assert!((estimate.pd - 0.04).abs() < 1e-12);
    assert!((estimate.model_adjustment - (0.04 - rule_pd) * 0.1).abs() < 1e-12);

    let descriptor = scorer.descriptor();
    assert_eq!(descriptor.kind, ScorerKind::ModelBacked);
    assert_eq!(descriptor.model_version.as_deref(), Some("constant-0.04"));
    assert_eq!(descriptor.features, vec!["credit_score".to_string()]);
}

#[test]
fn missing_artifact_falls_back_to_rule_based() {
    assert!(load_artifact(None).is_none());
    assert!(load_artifact(Some(Path::new("/nonexistent/pd-model.json"))).is_none());

    let scorer = select_scorer(
        None,
        FallbackWeights::default(),
        ModelAdjustmentConfig::default(),
    );
    assert_eq!(scorer.descriptor().kind, ScorerKind::RuleBased);
}
