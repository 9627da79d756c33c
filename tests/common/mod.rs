#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, Response},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    auth::{AuthConfig, AuthService, roles},
    config::AppConfig,
    db,
    entities::{cart_item, coupon, product, product_type},
    events::{self, EventSender},
    handlers::AppServices,
    notifications::LogNotifier,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Test harness backed by an in-memory SQLite database with the full
/// migration set applied.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub auth: Arc<AuthService>,
    #[allow(dead_code)]
    event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "integration_test_secret_key_that_is_at_least_64_characters_long!!".to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // A single pooled connection keeps the in-memory database alive
        // for the lifetime of the harness.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.cod_charge = 40.0;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool).await.expect("migrations failed");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            &cfg,
            Arc::new(event_sender.clone()),
            Arc::new(LogNotifier),
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        let auth = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_issuer.clone(),
            cfg.jwt_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )));

        let auth_for_layer = auth.clone();
        let router = Router::new()
            .nest("/api/v1", storefront_api::api_v1_routes())
            .layer(axum::middleware::from_fn(
                move |mut req: axum::extract::Request, next: axum::middleware::Next| {
                    let auth = auth_for_layer.clone();
                    async move {
                        req.extensions_mut().insert(auth);
                        next.run(req).await
                    }
                },
            ))
            .with_state(state.clone());

        Self {
            state,
            router,
            auth,
            event_task,
        }
    }

    pub fn user_token(&self, user_id: Uuid) -> String {
        self.auth
            .generate_token(
                user_id,
                Some("Test User".to_string()),
                Some("user@example.com".to_string()),
                vec![roles::CUSTOMER.to_string()],
            )
            .expect("token generation")
    }

    pub fn admin_token(&self, user_id: Uuid) -> String {
        self.auth
            .generate_token(
                user_id,
                Some("Test Admin".to_string()),
                Some("admin@example.com".to_string()),
                vec![roles::ADMIN.to_string()],
            )
            .expect("token generation")
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request build"),
            None => builder.body(Body::empty()).expect("request build"),
        };

        self.router.clone().oneshot(request).await.expect("request")
    }

    /// Inserts a product (and its type) into the catalog tables.
    pub async fn seed_product(&self, code: &str, price: Decimal) -> product::Model {
        let type_model = product_type::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("type-{}", Uuid::new_v4())),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product type");

        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("Product {}", code)),
            code: Set(code.to_string()),
            product_type_id: Set(type_model.id),
            price: Set(price),
            in_stock: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_cart_item(&self, user_id: Uuid, product_id: Uuid) -> cart_item::Model {
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            quantity: Set(1),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed cart item")
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn seed_coupon(
        &self,
        code: &str,
        discount_type: coupon::DiscountType,
        value: Decimal,
        max_discount: Option<Decimal>,
        min_order_amount: Decimal,
        valid_from_days: i64,
        valid_to_days: i64,
    ) -> coupon::Model {
        let now = Utc::now();
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            discount_type: Set(discount_type),
            discount_value: Set(value),
            max_discount: Set(max_discount),
            min_order_amount: Set(min_order_amount),
            valid_from: Set(now + chrono::Duration::days(valid_from_days)),
            valid_to: Set(now + chrono::Duration::days(valid_to_days)),
            created_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed coupon")
    }
}
