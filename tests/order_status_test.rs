//! Status state machine: forward single-step transitions, cancellation,
//! no-op semantics, and the append-only audit trail.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use storefront_api::{
    entities::{order::OrderStatus, order_status_history},
    errors::ServiceError,
    services::order_status::UpdateStatusRequest,
    services::orders::{CreateOrderLine, CreateOrderRequest, OrderResponse},
};
use uuid::Uuid;

async fn seed_order(app: &TestApp, user_id: Uuid) -> OrderResponse {
    let product = app
        .seed_product(&format!("SKU-{}", Uuid::new_v4()), dec!(10))
        .await;
    app.state
        .services
        .orders
        .create_order(
            user_id,
            CreateOrderRequest {
                items: vec![CreateOrderLine {
                    product_id: product.id,
                    quantity: 1,
                }],
            },
        )
        .await
        .expect("order creation")
}

async fn history_count(app: &TestApp, order_id: Uuid) -> usize {
    order_status_history::Entity::find()
        .filter(order_status_history::Column::OrderId.eq(order_id))
        .all(&*app.state.db)
        .await
        .unwrap()
        .len()
}

async fn set_status(app: &TestApp, order_id: Uuid, status: OrderStatus) {
    app.state
        .services
        .status
        .update_status(
            order_id,
            UpdateStatusRequest {
                status,
                details: None,
            },
        )
        .await
        .expect("status update");
}

#[tokio::test]
async fn genuine_transition_writes_exactly_one_audit_row() {
    let app = TestApp::new().await;
    let order = seed_order(&app, Uuid::new_v4()).await;

    let updated = app
        .state
        .services
        .status
        .update_status(
            order.id,
            UpdateStatusRequest {
                status: OrderStatus::Confirmed,
                details: Some("Payment received".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, OrderStatus::Confirmed);
    assert_eq!(history_count(&app, order.id).await, 1);
}

#[tokio::test]
async fn same_status_update_is_a_no_op() {
    let app = TestApp::new().await;
    let order = seed_order(&app, Uuid::new_v4()).await;

    let updated = app
        .state
        .services
        .status
        .update_status(
            order.id,
            UpdateStatusRequest {
                status: OrderStatus::Placed,
                details: Some("noise".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, OrderStatus::Placed);
    assert_eq!(history_count(&app, order.id).await, 0);
}

#[tokio::test]
async fn full_forward_walk_appends_one_row_per_step() {
    let app = TestApp::new().await;
    let order = seed_order(&app, Uuid::new_v4()).await;

    set_status(&app, order.id, OrderStatus::Confirmed).await;
    set_status(&app, order.id, OrderStatus::Packaging).await;
    set_status(&app, order.id, OrderStatus::Shipped).await;
    set_status(&app, order.id, OrderStatus::Delivered).await;

    assert_eq!(history_count(&app, order.id).await, 4);

    let rows = order_status_history::Entity::find()
        .filter(order_status_history::Column::OrderId.eq(order.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    let statuses: Vec<OrderStatus> = rows.iter().map(|r| r.status).collect();
    assert!(statuses.contains(&OrderStatus::Confirmed));
    assert!(statuses.contains(&OrderStatus::Delivered));
}

#[tokio::test]
async fn skipping_a_step_is_rejected() {
    let app = TestApp::new().await;
    let order = seed_order(&app, Uuid::new_v4()).await;

    let err = app
        .state
        .services
        .status
        .update_status(
            order.id,
            UpdateStatusRequest {
                status: OrderStatus::Shipped,
                details: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
    assert_eq!(history_count(&app, order.id).await, 0);
}

#[tokio::test]
async fn cancellation_allowed_before_delivery_only() {
    let app = TestApp::new().await;

    let order = seed_order(&app, Uuid::new_v4()).await;
    set_status(&app, order.id, OrderStatus::Confirmed).await;
    set_status(&app, order.id, OrderStatus::Cancelled).await;

    let delivered = seed_order(&app, Uuid::new_v4()).await;
    set_status(&app, delivered.id, OrderStatus::Confirmed).await;
    set_status(&app, delivered.id, OrderStatus::Packaging).await;
    set_status(&app, delivered.id, OrderStatus::Shipped).await;
    set_status(&app, delivered.id, OrderStatus::Delivered).await;

    let err = app
        .state
        .services
        .status
        .update_status(
            delivered.id,
            UpdateStatusRequest {
                status: OrderStatus::Cancelled,
                details: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn history_is_owner_scoped() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let order = seed_order(&app, owner).await;
    set_status(&app, order.id, OrderStatus::Confirmed).await;

    let rows = app
        .state
        .services
        .status
        .history_for_order(order.id, owner, false)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let err = app
        .state
        .services
        .status
        .history_for_order(order.id, stranger, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    // Admins can read any order's trail.
    let rows = app
        .state
        .services
        .status
        .history_for_order(order.id, stranger, true)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}
