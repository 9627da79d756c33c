use crate::{
    db::DbPool,
    entities::order::{Entity as OrderEntity, OrderStatus},
    entities::order_item::Entity as OrderItemEntity,
    entities::product_review::{
        self, ActiveModel as ReviewActiveModel, Entity as ReviewEntity, Model as ReviewModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub product_id: Uuid,
    pub order_item_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// Aggregate rating for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub product_id: Uuid,
    pub review_count: u64,
    pub average_rating: Option<f64>,
}

/// Read-only review aggregate lookup.
///
/// The catalog read path depends on this interface; the review module
/// implements it. Keeps the dependency direction catalog → reviews without
/// a cycle back into catalog internals.
#[async_trait]
pub trait ReviewSummaryProvider: Send + Sync {
    async fn review_summary(&self, product_id: Uuid) -> Result<ReviewSummary, ServiceError>;
}

/// Post-purchase review creation, gated on delivered orders.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ReviewService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a review for a purchased line.
    ///
    /// The line must reference the supplied product, the caller must own
    /// the order, and the order must be DELIVERED. A second review for the
    /// same (user, order item) is a conflict.
    #[instrument(skip(self, request), fields(user_id = %user_id, product_id = %request.product_id))]
    pub async fn create_review(
        &self,
        user_id: Uuid,
        request: CreateReviewRequest,
    ) -> Result<ReviewModel, ServiceError> {
        request.validate()?;

        let db = &*self.db;

        let item = OrderItemEntity::find_by_id(request.order_item_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order item {} not found", request.order_item_id))
            })?;

        if item.product_id != request.product_id {
            return Err(ServiceError::InvalidOperation(
                "Order item does not reference this product".to_string(),
            ));
        }

        let order = OrderEntity::find_by_id(item.order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if order.user_id != user_id {
            return Err(ServiceError::InvalidOperation(
                "Only the purchaser can review this item".to_string(),
            ));
        }

        if order.status != OrderStatus::Delivered {
            return Err(ServiceError::InvalidOperation(
                "Reviews are allowed only after delivery".to_string(),
            ));
        }

        let existing = ReviewEntity::find()
            .filter(product_review::Column::UserId.eq(user_id))
            .filter(product_review::Column::OrderItemId.eq(request.order_item_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "A review for this purchase already exists".to_string(),
            ));
        }

        let review = ReviewActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(request.product_id),
            order_item_id: Set(Some(request.order_item_id)),
            rating: Set(request.rating),
            comment: Set(request.comment),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        info!(review_id = %review.id, product_id = %review.product_id, "Review created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::ReviewCreated(review.id)).await {
                warn!(error = %e, review_id = %review.id, "Failed to send review created event");
            }
        }

        Ok(review)
    }

    #[instrument(skip(self, request), fields(review_id = %review_id, user_id = %user_id))]
    pub async fn update_review(
        &self,
        review_id: Uuid,
        user_id: Uuid,
        request: UpdateReviewRequest,
    ) -> Result<ReviewModel, ServiceError> {
        request.validate()?;

        let db = &*self.db;
        let review = ReviewEntity::find_by_id(review_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))?;

        if review.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Review belongs to another user".to_string(),
            ));
        }

        let mut active: ReviewActiveModel = review.into();
        if let Some(rating) = request.rating {
            active.rating = Set(rating);
        }
        if let Some(comment) = request.comment {
            active.comment = Set(Some(comment));
        }
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;

        Ok(updated)
    }

    #[instrument(skip(self), fields(review_id = %review_id, user_id = %user_id))]
    pub async fn delete_review(&self, review_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        let review = ReviewEntity::find_by_id(review_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))?;

        if review.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Review belongs to another user".to_string(),
            ));
        }

        ReviewEntity::delete_by_id(review_id).exec(db).await?;
        info!(review_id = %review_id, "Review deleted");
        Ok(())
    }

    /// Reviews for one product, newest first.
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<ReviewModel>, ServiceError> {
        let db = &*self.db;
        let reviews = ReviewEntity::find()
            .filter(product_review::Column::ProductId.eq(product_id))
            .order_by_desc(product_review::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(reviews)
    }
}

#[async_trait]
impl ReviewSummaryProvider for ReviewService {
    async fn review_summary(&self, product_id: Uuid) -> Result<ReviewSummary, ServiceError> {
        let reviews = self.list_for_product(product_id).await?;
        let review_count = reviews.len() as u64;
        let average_rating = if reviews.is_empty() {
            None
        } else {
            let total: i64 = reviews.iter().map(|r| r.rating as i64).sum();
            Some(total as f64 / review_count as f64)
        };

        Ok(ReviewSummary {
            product_id,
            review_count,
            average_rating,
        })
    }
}
