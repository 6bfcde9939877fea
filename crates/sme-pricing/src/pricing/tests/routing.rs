use super::common::*;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::pricing::router::{pricing_router, quote_handler};

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("request builds")
}

#[tokio::test]
async fn quote_route_prices_eligible_application() {
    let router = pricing_router(Arc::new(rule_based_engine()));
    let body = serde_json::to_string(&request(&good_application())).expect("serialize");

    let response = router
        .oneshot(post_json("/api/v1/loans/quote", body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["is_eligible"], true);
    assert_eq!(payload["risk_grade"], 1);
    assert_eq!(payload["final_rate_pct"], "4.48%");
    assert_eq!(payload["message"], "評估完成");
}

#[tokio::test]
async fn legacy_predict_route_returns_rejection_with_ok_status() {
    let router = pricing_router(Arc::new(rule_based_engine()));
    let body = serde_json::to_string(&request(&rejected_application())).expect("serialize");

    let response = router
        .oneshot(post_json("/predict", body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["is_eligible"], false);
    assert_eq!(payload["failed_rules"].as_array().map(Vec::len), Some(2));
    assert!(payload.get("final_rate").is_none());
}

#[tokio::test]
async fn quote_route_returns_field_errors() {
    let router = pricing_router(Arc::new(rule_based_engine()));
    let body = json!({
        "annual_revenue_ntd": 8_000_000.0,
        "years_in_business": 10,
        "num_employees": 40,
        "business_sector": "shipping",
        "credit_score": 990,
        "loan_amount_ntd": 2_000_000.0,
        "tenor_months": 36,
        "collateral_value_ntd": 3_000_000.0
    })
    .to_string();

    let response = router
        .oneshot(post_json("/api/v1/loans/quote", body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["errors"][0]["field"], "business_sector");
    assert_eq!(payload["errors"][1]["field"], "credit_score");
}

#[tokio::test]
async fn quote_route_rejects_malformed_body() {
    let router = pricing_router(Arc::new(rule_based_engine()));

    let response = router
        .oneshot(post_json("/api/v1/loans/quote", "{\"credit_score\": ".to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"].is_string());
}

#[tokio::test]
async fn quote_route_lists_every_mistyped_field() {
    let router = pricing_router(Arc::new(rule_based_engine()));
    let body = json!({
        "annual_revenue_ntd": "lots",
        "years_in_business": 10.0,
        "num_employees": 40,
        "business_sector": "manufacturing",
        "credit_score": "excellent",
        "loan_amount_ntd": 2_000_000.0,
        "tenor_months": 36,
        "collateral_value_ntd": 3_000_000.0
    })
    .to_string();

    let response = router
        .oneshot(post_json("/api/v1/loans/quote", body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    let fields: Vec<&str> = payload["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .filter_map(|error| error["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["annual_revenue_ntd", "credit_score"]);
}

#[tokio::test]
async fn quote_route_accepts_integral_floats() {
    let router = pricing_router(Arc::new(rule_based_engine()));
    let mut body = serde_json::to_value(request(&good_application())).expect("serialize");
    body["years_in_business"] = json!(10.0);
    body["tenor_months"] = json!(36.0);

    let response = router
        .oneshot(post_json("/api/v1/loans/quote", body.to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["final_rate_pct"], "4.48%");
}

#[tokio::test]
async fn quote_handler_prices_directly() {
    let engine = Arc::new(model_backed_engine(0.04));

    let response = quote_handler(
        State(engine),
        Ok(axum::Json(request(&marginal_application()))),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["ml_model_used"], true);
}
