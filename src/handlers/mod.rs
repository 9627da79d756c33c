use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    notifications::Notifier,
    services::{
        coupons::CouponService,
        order_status::OrderStatusService,
        orders::OrderService,
        payments::{GatewayClient, PaymentService},
        reviews::ReviewService,
        shipping::{ShippingClient, ShippingService},
    },
};

pub mod coupons;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod shipments;

/// Aggregated services used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub coupons: Arc<CouponService>,
    pub payments: Arc<PaymentService>,
    pub shipping: Arc<ShippingService>,
    pub status: Arc<OrderStatusService>,
    pub reviews: Arc<ReviewService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        config: &AppConfig,
        event_sender: Arc<EventSender>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let gateway = GatewayClient::new(config.gateway.clone());
        let shipping_client = ShippingClient::new(config.shipping.clone());
        let cod_charge = Decimal::from_f64(config.cod_charge).unwrap_or(Decimal::ZERO);

        Self {
            orders: Arc::new(OrderService::new(db.clone(), Some(event_sender.clone()))),
            coupons: Arc::new(CouponService::new(db.clone(), Some(event_sender.clone()))),
            payments: Arc::new(PaymentService::new(
                db.clone(),
                gateway,
                cod_charge,
                Some(event_sender.clone()),
            )),
            shipping: Arc::new(ShippingService::new(
                db.clone(),
                shipping_client,
                config.shipping.clone(),
                Some(event_sender.clone()),
            )),
            status: Arc::new(OrderStatusService::new(
                db.clone(),
                notifier,
                Some(event_sender.clone()),
            )),
            reviews: Arc::new(ReviewService::new(db, Some(event_sender))),
        }
    }
}
