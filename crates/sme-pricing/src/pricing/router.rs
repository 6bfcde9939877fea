use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::service::PricingEngine;
use super::validation::LoanApplicationRequest;

/// Router exposing the quote endpoint and its legacy alias.
pub fn pricing_router(engine: Arc<PricingEngine>) -> Router {
    Router::new()
        .route("/api/v1/loans/quote", post(quote_handler))
        .route("/predict", post(quote_handler))
        .with_state(engine)
}

pub(crate) async fn quote_handler(
    State(engine): State<Arc<PricingEngine>>,
    payload: Result<axum::Json<LoanApplicationRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(axum::Json(request)) => request,
        Err(rejection) => {
            let payload = json!({
                "error": rejection.body_text(),
            });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    match engine.quote(request) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => {
            let payload = json!({
                "errors": error.errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}
