use crate::{
    db::DbPool,
    entities::coupon::{
        self, ActiveModel as CouponActiveModel, DiscountType, Entity as CouponEntity,
        Model as CouponModel,
    },
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::OrderResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 50, message = "Code must be between 1 and 50 characters"))]
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub min_order_amount: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

/// Computes the discount a coupon grants against an order total.
///
/// Percentage discounts are capped by `max_discount` when present; fixed
/// discounts apply verbatim. The non-negative clamp on the order's final
/// price happens at the caller.
pub fn compute_discount(coupon: &CouponModel, total_price: Decimal) -> Decimal {
    match coupon.discount_type {
        DiscountType::Percentage => {
            let discount = total_price * coupon.discount_value / Decimal::from(100);
            match coupon.max_discount {
                Some(cap) => discount.min(cap),
                None => discount,
            }
        }
        DiscountType::Fixed => coupon.discount_value,
    }
}

/// Recomputes the payable amount after a discount or surcharge change.
pub fn recompute_final_price(
    total_price: Decimal,
    discount_amount: Decimal,
    cod_charge: Decimal,
) -> Decimal {
    (total_price - discount_amount).max(Decimal::ZERO) + cod_charge
}

/// Validates and applies discount codes to orders, and owns coupon CRUD.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CouponService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_coupon(
        &self,
        request: CreateCouponRequest,
    ) -> Result<CouponModel, ServiceError> {
        request.validate()?;

        if request.valid_to <= request.valid_from {
            return Err(ServiceError::ValidationError(
                "Coupon validity window is empty".to_string(),
            ));
        }
        if request.discount_value <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Discount value must be positive".to_string(),
            ));
        }

        let db = &*self.db;

        let existing = CouponEntity::find()
            .filter(coupon::Column::Code.eq(request.code.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                request.code
            )));
        }

        let model = CouponActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(request.code),
            discount_type: Set(request.discount_type),
            discount_value: Set(request.discount_value),
            max_discount: Set(request.max_discount),
            min_order_amount: Set(request.min_order_amount),
            valid_from: Set(request.valid_from),
            valid_to: Set(request.valid_to),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        info!(coupon_id = %model.id, code = %model.code, "Coupon created");
        Ok(model)
    }

    #[instrument(skip(self), fields(coupon_id = %coupon_id))]
    pub async fn delete_coupon(&self, coupon_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;

        let coupon = CouponEntity::find_by_id(coupon_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", coupon_id)))?;

        CouponEntity::delete_by_id(coupon.id).exec(db).await?;
        info!(coupon_id = %coupon_id, "Coupon deleted");
        Ok(())
    }

    pub async fn list_coupons(&self) -> Result<Vec<CouponModel>, ServiceError> {
        let db = &*self.db;
        let coupons = CouponEntity::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(coupons)
    }

    pub async fn get_coupon(&self, coupon_id: Uuid) -> Result<CouponModel, ServiceError> {
        let db = &*self.db;
        CouponEntity::find_by_id(coupon_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", coupon_id)))
    }

    /// Applies a coupon code to the caller's order.
    ///
    /// Exactly one coupon may be attached per order; re-applying replaces
    /// the prior discount.
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user_id, code = %code))]
    pub async fn apply_coupon(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        code: &str,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;

        let order = OrderEntity::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::IsDeleted.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let coupon = CouponEntity::find()
            .filter(coupon::Column::Code.eq(code))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))?;

        let now = Utc::now();
        if now < coupon.valid_from || now > coupon.valid_to {
            return Err(ServiceError::InvalidOperation(
                "Coupon is outside its validity window".to_string(),
            ));
        }

        if order.total_price < coupon.min_order_amount {
            return Err(ServiceError::InvalidOperation(format!(
                "Order total {} is below the coupon minimum of {}",
                order.total_price, coupon.min_order_amount
            )));
        }

        let discount = compute_discount(&coupon, order.total_price);
        let final_price = recompute_final_price(order.total_price, discount, order.cod_charge);

        let coupon_id = coupon.id;
        let total_price = order.total_price;
        let mut active: OrderActiveModel = order.into();
        active.coupon_id = Set(Some(coupon_id));
        active.discount_amount = Set(discount);
        active.final_price = Set(final_price);
        active.updated_at = Set(Some(now));
        let updated = active.update(db).await?;

        info!(
            order_id = %order_id,
            coupon_id = %coupon_id,
            total = %total_price,
            discount = %discount,
            final_price = %final_price,
            "Coupon applied"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::CouponApplied {
                    order_id,
                    coupon_id,
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send coupon applied event");
            }
        }

        let items = crate::entities::order_item::Entity::find()
            .filter(crate::entities::order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await?;
        Ok(OrderResponse::from_models(updated, items))
    }
}
