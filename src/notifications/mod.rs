use crate::entities::order::OrderStatus;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument};

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("recipient address missing")]
    MissingRecipient,
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Customer-facing message for an order status change. The subject and body
/// are derived from the order number and the new status; delivery mechanics
/// belong to the implementing transport.
#[derive(Debug, Clone)]
pub struct StatusNotification {
    pub recipient: Option<String>,
    pub order_number: String,
    pub status: OrderStatus,
    pub details: Option<String>,
}

impl StatusNotification {
    pub fn subject(&self) -> String {
        format!("Order {} is now {}", self.order_number, self.status)
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "Your order {} has been updated to status: {}.",
            self.order_number, self.status
        );
        if let Some(details) = &self.details {
            body.push(' ');
            body.push_str(details);
        }
        body
    }
}

/// Outbound notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_status_update(
        &self,
        notification: &StatusNotification,
    ) -> Result<(), NotificationError>;
}

/// Transport that records the message in the log stream. Stands in for the
/// mail service in development and tests.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    #[instrument(skip(self, notification), fields(order_number = %notification.order_number))]
    async fn send_status_update(
        &self,
        notification: &StatusNotification,
    ) -> Result<(), NotificationError> {
        let recipient = notification
            .recipient
            .as_deref()
            .ok_or(NotificationError::MissingRecipient)?;

        info!(
            recipient = %recipient,
            subject = %notification.subject(),
            body = %notification.body(),
            "Status notification dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> StatusNotification {
        StatusNotification {
            recipient: Some("asha@example.com".to_string()),
            order_number: "ORD-AB12CD34".to_string(),
            status: OrderStatus::Shipped,
            details: Some("Courier picked up the parcel.".to_string()),
        }
    }

    #[test]
    fn subject_and_body_derive_from_order_and_status() {
        let n = notification();
        assert_eq!(n.subject(), "Order ORD-AB12CD34 is now shipped");
        assert!(n.body().contains("ORD-AB12CD34"));
        assert!(n.body().contains("shipped"));
        assert!(n.body().contains("Courier picked up the parcel."));
    }

    #[tokio::test]
    async fn log_notifier_requires_recipient() {
        let mut n = notification();
        n.recipient = None;

        let err = LogNotifier.send_status_update(&n).await.unwrap_err();
        assert!(matches!(err, NotificationError::MissingRecipient));
    }

    #[tokio::test]
    async fn log_notifier_delivers() {
        assert!(LogNotifier.send_status_update(&notification()).await.is_ok());
    }
}
