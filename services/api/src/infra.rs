use metrics_exporter_prometheus::PrometheusHandle;
use sme_pricing::config::EngineConfig;
use sme_pricing::error::AppError;
use sme_pricing::pricing::{load_artifact, PricingEngine, PricingPolicy};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<PricingEngine>,
}

/// Loads the policy (file or built-in), applies the base-rate override, and attaches the
/// scoring artifact when one loads cleanly.
pub(crate) fn build_engine(config: &EngineConfig) -> Result<PricingEngine, AppError> {
    let mut policy = match &config.policy_path {
        Some(path) => {
            let policy = PricingPolicy::from_path(path)?;
            info!(path = %path.display(), "pricing policy loaded");
            policy
        }
        None => PricingPolicy::default(),
    };

    if let Some(base_rate) = config.base_rate_override {
        info!(base_rate, "market benchmark overridden");
        policy = policy.with_base_rate(base_rate);
    }

    let artifact = load_artifact(config.model_path.as_deref());
    Ok(PricingEngine::new(policy, artifact)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sme_pricing::pricing::ScorerKind;
    use std::path::PathBuf;

    #[test]
    fn builds_rule_based_engine_without_artifact() {
        let config = EngineConfig {
            model_path: Some(PathBuf::from("/nonexistent/model.json")),
            policy_path: None,
            base_rate_override: Some(0.0215),
        };

        let engine = build_engine(&config).expect("engine builds");

        assert_eq!(engine.descriptor().kind, ScorerKind::RuleBased);
        assert_eq!(engine.policy().rates.market_benchmark, 0.0215);
    }

    #[test]
    fn missing_policy_file_is_fatal() {
        let config = EngineConfig {
            policy_path: Some(PathBuf::from("/nonexistent/policy.json")),
            ..EngineConfig::default()
        };

        assert!(matches!(build_engine(&config), Err(AppError::Policy(_))));
    }
}
