//! Coupon application: discount math against live orders, validity window
//! and minimum-amount gating, and last-write-wins re-application.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{
    entities::coupon::DiscountType,
    errors::ServiceError,
    services::orders::{CreateOrderLine, CreateOrderRequest, OrderResponse},
};
use uuid::Uuid;

async fn order_of(app: &TestApp, user_id: Uuid, unit_price: rust_decimal::Decimal, qty: i32) -> OrderResponse {
    let product = app
        .seed_product(&format!("SKU-{}", Uuid::new_v4()), unit_price)
        .await;
    app.state
        .services
        .orders
        .create_order(
            user_id,
            CreateOrderRequest {
                items: vec![CreateOrderLine {
                    product_id: product.id,
                    quantity: qty,
                }],
            },
        )
        .await
        .expect("order creation")
}

#[tokio::test]
async fn percentage_coupon_discounts_order() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    // 2 × 100 + 1 × 50 worth of goods, built as one 250 order.
    let order = order_of(&app, user_id, dec!(125), 2).await;
    assert_eq!(order.total_price, dec!(250));

    app.seed_coupon("SAVE10", DiscountType::Percentage, dec!(10), None, dec!(0), -1, 30)
        .await;

    let updated = app
        .state
        .services
        .coupons
        .apply_coupon(order.id, user_id, "SAVE10")
        .await
        .unwrap();

    assert_eq!(updated.discount_amount, dec!(25));
    assert_eq!(updated.final_price, dec!(225));
    assert!(updated.coupon_id.is_some());
}

#[tokio::test]
async fn percentage_discount_respects_max_discount_cap() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let order = order_of(&app, user_id, dec!(500), 2).await;
    assert_eq!(order.total_price, dec!(1000));

    app.seed_coupon(
        "HALF",
        DiscountType::Percentage,
        dec!(50),
        Some(dec!(100)),
        dec!(0),
        -1,
        30,
    )
    .await;

    let updated = app
        .state
        .services
        .coupons
        .apply_coupon(order.id, user_id, "HALF")
        .await
        .unwrap();

    assert_eq!(updated.discount_amount, dec!(100));
    assert_eq!(updated.final_price, dec!(900));
}

#[tokio::test]
async fn fixed_coupon_never_drives_final_price_negative() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let order = order_of(&app, user_id, dec!(30), 1).await;

    app.seed_coupon("FLAT50", DiscountType::Fixed, dec!(50), None, dec!(0), -1, 30)
        .await;

    let updated = app
        .state
        .services
        .coupons
        .apply_coupon(order.id, user_id, "FLAT50")
        .await
        .unwrap();

    assert_eq!(updated.discount_amount, dec!(50));
    assert_eq!(updated.final_price, dec!(0));
}

#[tokio::test]
async fn expired_coupon_rejected_regardless_of_amount() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let order = order_of(&app, user_id, dec!(1000), 1).await;

    app.seed_coupon("OLD", DiscountType::Fixed, dec!(10), None, dec!(0), -30, -10)
        .await;

    let err = app
        .state
        .services
        .coupons
        .apply_coupon(order.id, user_id, "OLD")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn coupon_below_minimum_order_amount_rejected() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let order = order_of(&app, user_id, dec!(100), 1).await;

    app.seed_coupon(
        "BIGSPEND",
        DiscountType::Fixed,
        dec!(20),
        None,
        dec!(500),
        -1,
        30,
    )
    .await;

    let err = app
        .state
        .services
        .coupons
        .apply_coupon(order.id, user_id, "BIGSPEND")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn reapplying_a_coupon_replaces_the_previous_discount() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let order = order_of(&app, user_id, dec!(200), 1).await;

    app.seed_coupon("TEN", DiscountType::Percentage, dec!(10), None, dec!(0), -1, 30)
        .await;
    app.seed_coupon("FLAT5", DiscountType::Fixed, dec!(5), None, dec!(0), -1, 30)
        .await;

    let first = app
        .state
        .services
        .coupons
        .apply_coupon(order.id, user_id, "TEN")
        .await
        .unwrap();
    assert_eq!(first.discount_amount, dec!(20));
    assert_eq!(first.final_price, dec!(180));

    // No stacking: the second application overwrites the first.
    let second = app
        .state
        .services
        .coupons
        .apply_coupon(order.id, user_id, "FLAT5")
        .await
        .unwrap();
    assert_eq!(second.discount_amount, dec!(5));
    assert_eq!(second.final_price, dec!(195));
}

#[tokio::test]
async fn unknown_coupon_or_foreign_order_not_found() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let order = order_of(&app, user_id, dec!(100), 1).await;

    let err = app
        .state
        .services
        .coupons
        .apply_coupon(order.id, user_id, "NOPE")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    app.seed_coupon("REAL", DiscountType::Fixed, dec!(5), None, dec!(0), -1, 30)
        .await;
    let err = app
        .state
        .services
        .coupons
        .apply_coupon(order.id, Uuid::new_v4(), "REAL")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
