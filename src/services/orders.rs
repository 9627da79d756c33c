use crate::{
    db::DbPool,
    entities::cart_item::{self, Entity as CartItemEntity},
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        OrderStatus, PaymentMethod,
    },
    entities::order_item::{
        self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
        Model as OrderItemModel,
    },
    entities::product::Entity as ProductEntity,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the order service
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<CreateOrderLine>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderLine {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateOrderItemRequest {
    #[validate(url(message = "reference_image_url must be a valid URL"))]
    pub reference_image_url: Option<String>,
    #[validate(url(message = "design_url must be a valid URL"))]
    pub design_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub code: String,
    pub price: Decimal,
    pub quantity: i32,
    pub reference_image_url: Option<String>,
    pub design_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub user_id: Uuid,
    pub total_price: Decimal,
    pub tax_total: Decimal,
    pub is_deleted: bool,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub cod_charge: Decimal,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
    pub coupon_id: Option<Uuid>,
    pub tracking_code: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub landmark: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderResponse {
    pub fn from_models(order: OrderModel, items: Vec<OrderItemModel>) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            user_id: order.user_id,
            total_price: order.total_price,
            tax_total: order.tax_total,
            is_deleted: order.is_deleted,
            payment_method: order.payment_method,
            is_paid: order.is_paid,
            cod_charge: order.cod_charge,
            discount_amount: order.discount_amount,
            final_price: order.final_price,
            coupon_id: order.coupon_id,
            tracking_code: order.tracking_code,
            name: order.name,
            email: order.email,
            phone_number: order.phone_number,
            state: order.state,
            city: order.city,
            address: order.address,
            pincode: order.pincode,
            landmark: order.landmark,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            name: model.name,
            code: model.code,
            price: model.price,
            quantity: model.quantity,
            reference_image_url: model.reference_image_url,
            design_url: model.design_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Generates a public order number: fixed prefix plus an 8-character
/// uppercase hexadecimal suffix.
pub fn generate_order_number() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("ORD-{}", suffix)
}

/// Service for managing orders.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a new order from (product, quantity) lines.
    ///
    /// Product name/code/price/type are snapshotted onto the order items so
    /// later catalog edits cannot change historical orders. The order row,
    /// its items, and the cart cleanup commit in one transaction.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        for line in &request.items {
            line.validate()?;
        }

        let db = &*self.db;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        // Resolve every referenced product up front; one missing product
        // fails the whole operation.
        let mut total_price = Decimal::ZERO;
        let mut item_models: Vec<OrderItemActiveModel> = Vec::with_capacity(request.items.len());
        let mut purchased_product_ids: Vec<Uuid> = Vec::with_capacity(request.items.len());

        for line in &request.items {
            let product = ProductEntity::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    warn!(product_id = %line.product_id, "Order references unknown product");
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;

            total_price += product.price * Decimal::from(line.quantity);
            purchased_product_ids.push(product.id);

            item_models.push(OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                name: Set(product.name),
                code: Set(product.code),
                product_type_id: Set(product.product_type_id),
                price: Set(product.price),
                quantity: Set(line.quantity),
                reference_image_url: Set(None),
                design_url: Set(None),
                created_at: Set(now),
            });
        }

        let order_active_model = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(generate_order_number()),
            status: Set(OrderStatus::Placed),
            user_id: Set(user_id),
            total_price: Set(total_price),
            tax_total: Set(Decimal::ZERO),
            is_deleted: Set(false),
            payment_method: Set(PaymentMethod::Online),
            gateway_order_id: Set(None),
            gateway_payment_id: Set(None),
            is_paid: Set(false),
            shipping_order_id: Set(None),
            shipment_id: Set(None),
            tracking_code: Set(None),
            cod_charge: Set(Decimal::ZERO),
            name: Set(None),
            email: Set(None),
            phone_number: Set(None),
            state: Set(None),
            city: Set(None),
            address: Set(None),
            pincode: Set(None),
            landmark: Set(None),
            coupon_id: Set(None),
            discount_amount: Set(Decimal::ZERO),
            final_price: Set(total_price),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let order_model = order_active_model.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        let mut inserted_items = Vec::with_capacity(item_models.len());
        for item in item_models {
            inserted_items.push(item.insert(&txn).await?);
        }

        // Clear the purchased lines from the user's cart inside the same
        // transaction, so a failure here rolls the order back too.
        CartItemEntity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.is_in(purchased_product_ids))
            .exec(&txn)
            .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, user_id = %user_id, total = %total_price, "Order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order created event");
            }
        }

        Ok(OrderResponse::from_models(order_model, inserted_items))
    }

    /// Fetches one order scoped to its owner; admins may fetch any order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;

        let mut query = OrderEntity::find_by_id(order_id);
        if !is_admin {
            query = query
                .filter(order::Column::UserId.eq(user_id))
                .filter(order::Column::IsDeleted.eq(false));
        }

        let order = query
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = self.get_order_items(order.id).await?;
        Ok(OrderResponse::from_models(order, items))
    }

    /// Lists orders newest-first. Admins see every order including
    /// soft-deleted ones; users see only their own live orders.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        user_id: Uuid,
        is_admin: bool,
        is_paid: Option<bool>,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db;

        let mut query = OrderEntity::find();
        if !is_admin {
            query = query
                .filter(order::Column::UserId.eq(user_id))
                .filter(order::Column::IsDeleted.eq(false));
        }
        if let Some(paid) = is_paid {
            query = query.filter(order::Column::IsPaid.eq(paid));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.get_order_items(order.id).await?;
            responses.push(OrderResponse::from_models(order, items));
        }

        Ok(OrderListResponse {
            orders: responses,
            total,
            page,
            per_page,
        })
    }

    /// Invoice view: the caller's orders with item and address detail.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_invoices(&self, user_id: Uuid) -> Result<Vec<OrderResponse>, ServiceError> {
        let db = &*self.db;

        let orders = OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(db)
            .await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.get_order_items(order.id).await?;
            responses.push(OrderResponse::from_models(order, items));
        }
        Ok(responses)
    }

    /// Soft-deletes an order. The row stays queryable by admins; it is
    /// excluded from user listings by the explicit filter in `list_orders`.
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn soft_delete_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;

        let order = OrderEntity::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::IsDeleted.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let mut active: OrderActiveModel = order.into();
        active.is_deleted = Set(true);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await?;

        info!(order_id = %order_id, "Order soft-deleted");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderSoftDeleted(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order deleted event");
            }
        }

        Ok(())
    }

    /// Attaches buyer-supplied reference material to a purchased line.
    #[instrument(skip(self, request), fields(item_id = %item_id, user_id = %user_id))]
    pub async fn update_order_item(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        request: UpdateOrderItemRequest,
    ) -> Result<OrderItemResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db;

        let item = OrderItemEntity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {} not found", item_id)))?;

        let order = OrderEntity::find_by_id(item.order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        if order.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Order item belongs to another user".to_string(),
            ));
        }

        let mut active: order_item::ActiveModel = item.into();
        if let Some(url) = request.reference_image_url {
            active.reference_image_url = Set(Some(url));
        }
        if let Some(url) = request.design_url {
            active.design_url = Set(Some(url));
        }
        let updated = active.update(db).await?;

        Ok(OrderItemResponse::from(updated))
    }

    /// Items for one order, in insertion order.
    pub async fn get_order_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemModel>, ServiceError> {
        let db = &*self.db;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_has_fixed_prefix_and_hex_suffix() {
        let number = generate_order_number();
        assert!(number.starts_with("ORD-"));

        let suffix = &number["ORD-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn order_numbers_are_unique_across_generations() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generate_order_number()));
        }
    }
}
