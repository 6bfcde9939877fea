use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use sme_pricing::pricing::{pricing_router, PricingEngine};
use std::sync::Arc;

pub(crate) fn with_service_routes(engine: Arc<PricingEngine>) -> axum::Router {
    pricing_router(engine)
        .route("/", axum::routing::get(service_info))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/model", axum::routing::get(model_endpoint))
}

pub(crate) async fn service_info() -> Json<serde_json::Value> {
    Json(json!({
        "service": "SME loan pricing engine",
        "version": env!("CARGO_PKG_VERSION"),
        "quote": "/api/v1/loans/quote",
    }))
}

pub(crate) async fn healthcheck(Extension(state): Extension<AppState>) -> Json<serde_json::Value> {
    let descriptor = state.engine.descriptor();
    Json(json!({
        "status": "ok",
        "model_loaded": descriptor.model_version.is_some(),
        "model_version": descriptor.model_version,
        "base_rate": format!("{:.3}", state.engine.policy().rates.market_benchmark),
    }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn model_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    Json(state.engine.descriptor())
}
