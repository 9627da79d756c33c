//! Order creation workflow: catalog snapshots, totals, transactional cart
//! cleanup, and soft-delete visibility.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use storefront_api::{
    entities::{cart_item, order::OrderStatus, order::PaymentMethod},
    errors::ServiceError,
    services::orders::{CreateOrderLine, CreateOrderRequest},
};
use uuid::Uuid;

#[tokio::test]
async fn create_order_snapshots_products_and_totals() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();

    let product_a = app.seed_product("SKU-A", dec!(100)).await;
    let product_b = app.seed_product("SKU-B", dec!(50)).await;

    let order = app
        .state
        .services
        .orders
        .create_order(
            user_id,
            CreateOrderRequest {
                items: vec![
                    CreateOrderLine {
                        product_id: product_a.id,
                        quantity: 2,
                    },
                    CreateOrderLine {
                        product_id: product_b.id,
                        quantity: 1,
                    },
                ],
            },
        )
        .await
        .expect("order creation");

    assert_eq!(order.total_price, dec!(250));
    assert_eq!(order.final_price, dec!(250));
    assert_eq!(order.discount_amount, dec!(0));
    assert_eq!(order.tax_total, dec!(0));
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.payment_method, PaymentMethod::Online);
    assert!(!order.is_paid);

    assert!(order.order_number.starts_with("ORD-"));
    let suffix = &order.order_number["ORD-".len()..];
    assert_eq!(suffix.len(), 8);
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

    // Item snapshots carry the catalog values at order time.
    assert_eq!(order.items.len(), 2);
    let line_a = order
        .items
        .iter()
        .find(|i| i.code == "SKU-A")
        .expect("line for product A");
    assert_eq!(line_a.price, dec!(100));
    assert_eq!(line_a.quantity, 2);
    assert_eq!(line_a.name, product_a.name);
}

#[tokio::test]
async fn order_number_survives_subsequent_saves() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let product = app.seed_product("SKU-STABLE", dec!(10)).await;

    let order = app
        .state
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
        .unwrap();
    let original_number = order.order_number.clone();

    // A status transition saves the row again.
    app.state
        .services
        .status
        .update_status(
            order.id,
            storefront_api::services::order_status::UpdateStatusRequest {
                status: OrderStatus::Confirmed,
                details: None,
            },
        )
        .await
        .unwrap();

    let refetched = app
        .state
        .services
        .orders
        .get_order(order.id, user_id, false)
        .await
        .unwrap();
    assert_eq!(refetched.order_number, original_number);
}

#[tokio::test]
async fn create_order_clears_purchased_cart_lines_only() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();

    let purchased = app.seed_product("SKU-CART-1", dec!(20)).await;
    let kept = app.seed_product("SKU-CART-2", dec!(30)).await;
    app.seed_cart_item(user_id, purchased.id).await;
    app.seed_cart_item(user_id, kept.id).await;

    app.state
        .services
        .orders
        .create_order(
            user_id,
            CreateOrderRequest {
                items: vec![CreateOrderLine {
                    product_id: purchased.id,
                    quantity: 1,
                }],
            },
        )
        .await
        .unwrap();

    let remaining = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].product_id, kept.id);
}

#[tokio::test]
async fn unknown_product_fails_whole_order_and_leaves_cart_untouched() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();

    let product = app.seed_product("SKU-KNOWN", dec!(20)).await;
    app.seed_cart_item(user_id, product.id).await;

    let err = app
        .state
        .services
        .orders
        .create_order(
            user_id,
            CreateOrderRequest {
                items: vec![
                    CreateOrderLine {
                        product_id: product.id,
                        quantity: 1,
                    },
                    CreateOrderLine {
                        product_id: Uuid::new_v4(),
                        quantity: 1,
                    },
                ],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Transactional rollback: no order rows, cart intact.
    let orders = app
        .state
        .services
        .orders
        .list_orders(user_id, false, None, 1, 20)
        .await
        .unwrap();
    assert_eq!(orders.total, 0);

    let cart = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(cart.len(), 1);
}

#[tokio::test]
async fn soft_deleted_orders_hidden_from_users_but_visible_to_admins() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let admin_id = Uuid::new_v4();

    let product = app.seed_product("SKU-DEL", dec!(15)).await;
    let order = app
        .state
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
        .unwrap();

    app.state
        .services
        .orders
        .soft_delete_order(order.id, user_id)
        .await
        .unwrap();

    let user_view = app
        .state
        .services
        .orders
        .list_orders(user_id, false, None, 1, 20)
        .await
        .unwrap();
    assert_eq!(user_view.total, 0);

    let admin_view = app
        .state
        .services
        .orders
        .list_orders(admin_id, true, None, 1, 20)
        .await
        .unwrap();
    assert_eq!(admin_view.total, 1);
    assert!(admin_view.orders[0].is_deleted);
}

#[tokio::test]
async fn other_users_cannot_fetch_or_delete_an_order() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let product = app.seed_product("SKU-OWN", dec!(15)).await;
    let order = app
        .state
        .services
        .orders
        .create_order(
            owner,
            CreateOrderRequest {
                items: vec![CreateOrderLine {
                    product_id: product.id,
                    quantity: 1,
                }],
            },
        )
        .await
        .unwrap();

    let fetch = app
        .state
        .services
        .orders
        .get_order(order.id, stranger, false)
        .await;
    assert!(matches!(fetch, Err(ServiceError::NotFound(_))));

    let delete = app
        .state
        .services
        .orders
        .soft_delete_order(order.id, stranger)
        .await;
    assert!(matches!(delete, Err(ServiceError::NotFound(_))));
}
