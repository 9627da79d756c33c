//! HTTP surface: bearer-token gating, role gating, the response envelope,
//! and query-filter validation.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

async fn body_json(response: axum::http::Response<axum::body::Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body bytes")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/orders", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_coupon_read_needs_no_token() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/coupons", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn status_transition_requires_admin_role() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();

    let product = app.seed_product("SKU-API-1", dec!(10)).await;
    let token = app.user_token(user_id);

    let create = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "items": [{"product_id": product.id, "quantity": 1}]
            })),
        )
        .await;
    assert_eq!(create.status(), StatusCode::CREATED);
    let created = body_json(create).await;
    let order_id = created["data"]["id"].as_str().unwrap().to_string();

    // Customer token: forbidden.
    let forbidden = app
        .request(
            Method::PATCH,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(&token),
            Some(json!({"status": "confirmed"})),
        )
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    // Admin token: allowed.
    let admin_token = app.admin_token(Uuid::new_v4());
    let allowed = app
        .request(
            Method::PATCH,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(&admin_token),
            Some(json!({"status": "confirmed", "details": "confirmed by support"})),
        )
        .await;
    assert_eq!(allowed.status(), StatusCode::OK);
    let body = body_json(allowed).await;
    assert_eq!(body["data"]["status"], json!("confirmed"));
}

#[tokio::test]
async fn order_crud_round_trip_over_http() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let token = app.user_token(user_id);

    let product = app.seed_product("SKU-API-2", dec!(100)).await;

    let create = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "items": [{"product_id": product.id, "quantity": 2}]
            })),
        )
        .await;
    assert_eq!(create.status(), StatusCode::CREATED);
    let created = body_json(create).await;
    assert_eq!(created["success"], json!(true));
    assert_eq!(created["data"]["total_price"], json!("200"));
    let order_id = created["data"]["id"].as_str().unwrap().to_string();

    let fetch = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(fetch.status(), StatusCode::OK);

    let delete = app
        .request(
            Method::DELETE,
            &format!("/api/v1/orders/{}", order_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(delete.status(), StatusCode::OK);

    let refetch = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(refetch.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_is_paid_filter_is_a_client_error() {
    let app = TestApp::new().await;
    let token = app.user_token(Uuid::new_v4());

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders?is_paid=maybe",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid is_paid filter"));
}

#[tokio::test]
async fn coupon_write_is_admin_only() {
    let app = TestApp::new().await;

    let payload = json!({
        "code": "HTTP10",
        "discount_type": "percentage",
        "discount_value": "10",
        "min_order_amount": "0",
        "valid_from": "2026-01-01T00:00:00Z",
        "valid_to": "2027-01-01T00:00:00Z"
    });

    let token = app.user_token(Uuid::new_v4());
    let forbidden = app
        .request(Method::POST, "/api/v1/coupons", Some(&token), Some(payload.clone()))
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let admin_token = app.admin_token(Uuid::new_v4());
    let created = app
        .request(
            Method::POST,
            "/api/v1/coupons",
            Some(&admin_token),
            Some(payload),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
}
