use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        OrderStatus,
    },
    entities::order_status_history::{
        self, ActiveModel as HistoryActiveModel, Entity as HistoryEntity, Model as HistoryModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{Notifier, StatusNotification},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub details: Option<String>,
}

/// Validates whether a status transition is allowed.
///
/// Fulfillment advances one step at a time; cancellation is reachable from
/// any state that has not been delivered. Same-status transitions are
/// treated as no-ops by the caller, not validated here.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (Placed, Confirmed) => true,
        (Confirmed, Packaging) => true,
        (Packaging, Shipped) => true,
        (Shipped, Delivered) => true,
        (Placed | Confirmed | Packaging | Shipped, Cancelled) => true,
        _ => false,
    }
}

/// Admin-driven order status transitions with an append-only audit trail.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DbPool>,
    notifier: Arc<dyn Notifier>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderStatusService {
    pub fn new(
        db: Arc<DbPool>,
        notifier: Arc<dyn Notifier>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            notifier,
            event_sender,
        }
    }

    /// Transitions an order to a new status.
    ///
    /// A genuine transition writes exactly one history row and triggers one
    /// customer notification; setting the current status again does neither.
    #[instrument(skip(self, request), fields(order_id = %order_id, new_status = %request.status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<OrderModel, ServiceError> {
        let db = &*self.db;

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        let new_status = request.status;

        if old_status == new_status {
            info!(order_id = %order_id, status = %old_status, "Status unchanged; skipping audit and notification");
            return Ok(order);
        }

        if !is_valid_transition(old_status, new_status) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot transition order from '{}' to '{}'",
                old_status, new_status
            )));
        }

        let now = Utc::now();
        let recipient = order.email.clone();
        let order_number = order.order_number.clone();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to begin status transaction");
            ServiceError::DatabaseError(e)
        })?;

        let mut active: OrderActiveModel = order.into();
        active.status = Set(new_status);
        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await?;

        HistoryActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(new_status),
            details: Set(request.details.clone()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit status transition");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            old_status = %old_status,
            new_status = %new_status,
            "Order status updated"
        );

        // Notification failures must not fail the transition.
        let notification = StatusNotification {
            recipient,
            order_number,
            status: new_status,
            details: request.details,
        };
        if let Err(e) = self.notifier.send_status_update(&notification).await {
            warn!(error = %e, order_id = %order_id, "Status notification failed");
        }

        if let Some(event_sender) = &self.event_sender {
            let event = if new_status == OrderStatus::Cancelled {
                Event::OrderCancelled(order_id)
            } else {
                Event::OrderStatusChanged {
                    order_id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                }
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, order_id = %order_id, "Failed to send status changed event");
            }
        }

        Ok(updated)
    }

    /// Audit trail for one order, oldest first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn history_for_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<Vec<HistoryModel>, ServiceError> {
        let db = &*self.db;

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !is_admin && order.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }

        let rows = HistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(rows)
    }

    /// Audit trail across the caller's orders; admins see every order.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn history_for_user(
        &self,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<Vec<HistoryModel>, ServiceError> {
        let db = &*self.db;

        if is_admin {
            let rows = HistoryEntity::find()
                .order_by_desc(order_status_history::Column::CreatedAt)
                .all(db)
                .await?;
            return Ok(rows);
        }

        let order_ids: Vec<Uuid> = OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|o| o.id)
            .collect();

        let rows = HistoryEntity::find()
            .filter(order_status_history::Column::OrderId.is_in(order_ids))
            .order_by_desc(order_status_history::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn forward_single_steps_are_allowed() {
        assert!(is_valid_transition(Placed, Confirmed));
        assert!(is_valid_transition(Confirmed, Packaging));
        assert!(is_valid_transition(Packaging, Shipped));
        assert!(is_valid_transition(Shipped, Delivered));
    }

    #[test]
    fn skipping_and_backward_steps_are_rejected() {
        assert!(!is_valid_transition(Placed, Packaging));
        assert!(!is_valid_transition(Placed, Delivered));
        assert!(!is_valid_transition(Shipped, Confirmed));
        assert!(!is_valid_transition(Delivered, Placed));
    }

    #[test]
    fn cancellation_reachable_from_any_undelivered_state() {
        assert!(is_valid_transition(Placed, Cancelled));
        assert!(is_valid_transition(Confirmed, Cancelled));
        assert!(is_valid_transition(Packaging, Cancelled));
        assert!(is_valid_transition(Shipped, Cancelled));
        assert!(!is_valid_transition(Delivered, Cancelled));
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(!is_valid_transition(Cancelled, Placed));
        assert!(!is_valid_transition(Cancelled, Confirmed));
        assert!(!is_valid_transition(Cancelled, Delivered));
    }
}
