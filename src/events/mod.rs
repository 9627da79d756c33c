use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Events emitted by the order workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderSoftDeleted(Uuid),
    OrderCancelled(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Payment events
    CheckoutCreated {
        order_id: Uuid,
        gateway_order_id: String,
    },
    CodCheckoutCreated(Uuid),
    PaymentVerified {
        order_id: Uuid,
        gateway_payment_id: String,
    },

    // Coupon events
    CouponApplied {
        order_id: Uuid,
        coupon_id: Uuid,
    },

    // Shipment events
    ShipmentCreated {
        order_id: Uuid,
        shipment_id: String,
    },
    TrackingAssigned {
        order_id: Uuid,
        tracking_code: String,
    },

    // Review events
    ReviewCreated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event.
///
/// Runs until every sender half has been dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        debug!(?event, "Processing event");
    }
    info!("Event processor stopped");
}
