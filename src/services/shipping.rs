use crate::{
    config::ShippingConfig,
    db::DbPool,
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        PaymentMethod,
    },
    entities::order_item::Model as OrderItemModel,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Classified shipping provider failure.
///
/// Callers can distinguish "provider unreachable" from "provider rejected
/// the request" instead of collapsing both into an empty result.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("shipping provider login returned no token")]
    Unauthenticated,
    #[error("shipping provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("shipping provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<ShippingError> for ServiceError {
    fn from(err: ShippingError) -> Self {
        ServiceError::ExternalServiceError(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct LoginPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShipmentItemPayload {
    pub name: String,
    pub sku: String,
    pub units: i32,
    pub selling_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ShipmentPayload {
    pub order_id: String,
    pub order_date: String,
    pub pickup_location: String,
    pub billing_customer_name: String,
    pub billing_address: String,
    pub billing_city: String,
    pub billing_pincode: String,
    pub billing_state: String,
    pub billing_country: String,
    pub billing_email: String,
    pub billing_phone: String,
    pub shipping_is_billing: bool,
    pub order_items: Vec<ShipmentItemPayload>,
    pub payment_method: String,
    pub sub_total: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ShipmentCreated {
    pub order_id: i64,
    pub shipment_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AwbAssigned {
    pub awb_code: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TrackingStatus {
    #[serde(default)]
    pub tracking_data: serde_json::Value,
}

/// Maps the internal payment method onto the provider's vocabulary.
pub fn provider_payment_method(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cod => "COD",
        PaymentMethod::Online => "Prepaid",
    }
}

/// HTTP client for the shipping provider.
#[derive(Clone)]
pub struct ShippingClient {
    http: reqwest::Client,
    config: ShippingConfig,
}

impl ShippingClient {
    pub fn new(config: ShippingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn rejected(response: reqwest::Response) -> ShippingError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ShippingError::Rejected { status, body }
    }

    /// Exchanges the stored credentials for a bearer token.
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<String, ShippingError> {
        let url = format!("{}/external/auth/login", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .json(&LoginPayload {
                email: &self.config.email,
                password: &self.config.password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let login: LoginResponse = response.json().await?;
        login.token.ok_or(ShippingError::Unauthenticated)
    }

    /// Creates an adhoc shipment order with the provider.
    #[instrument(skip(self, token, payload), fields(order_id = %payload.order_id))]
    pub async fn create_shipment(
        &self,
        token: &str,
        payload: &ShipmentPayload,
    ) -> Result<ShipmentCreated, ShippingError> {
        let url = format!("{}/external/orders/create/adhoc", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 && status.as_u16() != 201 {
            return Err(Self::rejected(response).await);
        }

        Ok(response.json().await?)
    }

    /// Requests an AWB (tracking) code for a shipment.
    #[instrument(skip(self, token))]
    pub async fn assign_awb(
        &self,
        token: &str,
        shipment_id: &str,
    ) -> Result<AwbAssigned, ShippingError> {
        let url = format!("{}/external/courier/assign/awb", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "shipment_id": shipment_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        Ok(response.json().await?)
    }

    /// Fetches the current carrier status for a tracking code.
    #[instrument(skip(self, token))]
    pub async fn track(&self, token: &str, awb_code: &str) -> Result<TrackingStatus, ShippingError> {
        let url = format!(
            "{}/external/courier/track/awb/{}",
            self.config.base_url, awb_code
        );
        let response = self.http.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        Ok(response.json().await?)
    }
}

/// Builds the provider payload from an order and its item snapshots.
pub fn build_shipment_payload(
    config: &ShippingConfig,
    order: &OrderModel,
    items: &[OrderItemModel],
) -> Result<ShipmentPayload, ServiceError> {
    let require = |field: &Option<String>, name: &str| -> Result<String, ServiceError> {
        field
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "Order {} has no {} on file; checkout must run first",
                    order.order_number, name
                ))
            })
    };

    let payable = if order.final_price > Decimal::ZERO {
        order.final_price
    } else {
        order.total_price
    };

    Ok(ShipmentPayload {
        order_id: order.order_number.clone(),
        order_date: order.created_at.format("%Y-%m-%d").to_string(),
        pickup_location: config.pickup_location.clone(),
        billing_customer_name: require(&order.name, "recipient name")?,
        billing_address: require(&order.address, "address")?,
        billing_city: require(&order.city, "city")?,
        billing_pincode: require(&order.pincode, "pincode")?,
        billing_state: require(&order.state, "state")?,
        billing_country: config.country.clone(),
        billing_email: require(&order.email, "email")?,
        billing_phone: require(&order.phone_number, "phone number")?,
        shipping_is_billing: true,
        order_items: items
            .iter()
            .map(|item| ShipmentItemPayload {
                name: item.name.clone(),
                sku: item.code.clone(),
                units: item.quantity,
                selling_price: item.price,
            })
            .collect(),
        payment_method: provider_payment_method(order.payment_method).to_string(),
        sub_total: payable,
    })
}

/// Orchestrates shipment creation and tracking against the provider.
#[derive(Clone)]
pub struct ShippingService {
    db: Arc<DbPool>,
    client: ShippingClient,
    config: ShippingConfig,
    event_sender: Option<Arc<EventSender>>,
}

impl ShippingService {
    pub fn new(
        db: Arc<DbPool>,
        client: ShippingClient,
        config: ShippingConfig,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            client,
            config,
            event_sender,
        }
    }

    async fn load_order(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .filter(order::Column::IsDeleted.eq(false))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Creates a provider shipment for an order and stores the returned
    /// provider identifiers.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_shipment(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        let order = self.load_order(order_id).await?;

        let items = crate::entities::order_item::Entity::find()
            .filter(crate::entities::order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        let payload = build_shipment_payload(&self.config, &order, &items)?;

        let token = self.client.authenticate().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Shipping authentication failed");
            ServiceError::from(e)
        })?;

        let created = self.client.create_shipment(&token, &payload).await?;
        let shipment_id = created.shipment_id.to_string();

        let mut active: OrderActiveModel = order.into();
        active.shipping_order_id = Set(Some(created.order_id.to_string()));
        active.shipment_id = Set(Some(shipment_id.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        info!(order_id = %order_id, shipment_id = %shipment_id, "Shipment created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::ShipmentCreated {
                    order_id,
                    shipment_id,
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send shipment created event");
            }
        }

        Ok(updated)
    }

    /// Assigns an AWB tracking code to the order's shipment.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn assign_tracking(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        let order = self.load_order(order_id).await?;

        let shipment_id = order.shipment_id.clone().ok_or_else(|| {
            ServiceError::InvalidOperation(format!(
                "Order {} has no shipment; create one first",
                order.order_number
            ))
        })?;

        let token = self.client.authenticate().await?;
        let assigned = self.client.assign_awb(&token, &shipment_id).await?;
        let tracking_code = assigned.awb_code;

        let mut active: OrderActiveModel = order.into();
        active.tracking_code = Set(Some(tracking_code.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        info!(order_id = %order_id, tracking_code = %tracking_code, "Tracking assigned");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::TrackingAssigned {
                    order_id,
                    tracking_code,
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send tracking assigned event");
            }
        }

        Ok(updated)
    }

    /// Fetches the current carrier status for an order's tracking code.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn track(&self, order_id: Uuid) -> Result<TrackingStatus, ServiceError> {
        let order = self.load_order(order_id).await?;

        let awb_code = order.tracking_code.ok_or_else(|| {
            ServiceError::InvalidOperation(format!(
                "Order {} has no tracking code assigned",
                order.order_number
            ))
        })?;

        let token = self.client.authenticate().await?;
        let status = self.client.track(&token, &awb_code).await?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::order::OrderStatus;
    use rust_decimal_macros::dec;

    fn order_with_address() -> OrderModel {
        OrderModel {
            id: Uuid::new_v4(),
            order_number: "ORD-AB12CD34".to_string(),
            status: OrderStatus::Confirmed,
            user_id: Uuid::new_v4(),
            total_price: dec!(250),
            tax_total: Decimal::ZERO,
            is_deleted: false,
            payment_method: PaymentMethod::Cod,
            gateway_order_id: None,
            gateway_payment_id: None,
            is_paid: false,
            shipping_order_id: None,
            shipment_id: None,
            tracking_code: None,
            cod_charge: dec!(40),
            name: Some("Asha".to_string()),
            email: Some("asha@example.com".to_string()),
            phone_number: Some("+911234567890".to_string()),
            state: Some("MH".to_string()),
            city: Some("Mumbai".to_string()),
            address: Some("1 Main St".to_string()),
            pincode: Some("400001".to_string()),
            landmark: None,
            coupon_id: None,
            discount_amount: Decimal::ZERO,
            final_price: dec!(290),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn payment_method_maps_to_provider_vocabulary() {
        assert_eq!(provider_payment_method(PaymentMethod::Cod), "COD");
        assert_eq!(provider_payment_method(PaymentMethod::Online), "Prepaid");
    }

    #[test]
    fn payload_uses_final_price_and_item_snapshots() {
        let order = order_with_address();
        let items = vec![OrderItemModel {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: Uuid::new_v4(),
            name: "Mug".to_string(),
            code: "MUG-01".to_string(),
            product_type_id: Uuid::new_v4(),
            price: dec!(125),
            quantity: 2,
            reference_image_url: None,
            design_url: None,
            created_at: Utc::now(),
        }];

        let payload = build_shipment_payload(&ShippingConfig::default(), &order, &items).unwrap();
        assert_eq!(payload.order_id, "ORD-AB12CD34");
        assert_eq!(payload.payment_method, "COD");
        assert_eq!(payload.sub_total, dec!(290));
        assert_eq!(payload.order_items.len(), 1);
        assert_eq!(payload.order_items[0].sku, "MUG-01");
        assert_eq!(payload.order_items[0].units, 2);
    }

    #[test]
    fn payload_requires_checkout_address() {
        let mut order = order_with_address();
        order.pincode = None;

        let err = build_shipment_payload(&ShippingConfig::default(), &order, &[]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }
}
