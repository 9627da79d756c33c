use crate::{
    config::GatewayConfig,
    db::DbPool,
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        PaymentMethod,
    },
    entities::order_status_history::ActiveModel as HistoryActiveModel,
    errors::ServiceError,
    events::{Event, EventSender},
    services::coupons::recompute_final_price,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Shipping address collected at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub landmark: Option<String>,
}

impl CheckoutRequest {
    /// All address fields except the landmark are required at checkout.
    fn missing_required_field(&self) -> bool {
        [
            &self.name,
            &self.email,
            &self.phone_number,
            &self.state,
            &self.city,
            &self.address,
            &self.pincode,
        ]
        .iter()
        .any(|field| field.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CodCheckoutResponse {
    pub order_id: Uuid,
    pub payment_method: PaymentMethod,
    pub cod_charge: Decimal,
    pub payable: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
}

/// Converts a decimal amount into the gateway's smallest currency unit.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::from(100))
        .trunc()
        .to_i64()
        .ok_or_else(|| {
            ServiceError::InternalError(format!("Amount {} out of gateway range", amount))
        })
}

/// Verifies the gateway callback signature: HMAC-SHA256 over
/// `"{gateway_order_id}|{gateway_payment_id}"` with the shared secret.
pub fn verify_gateway_signature(
    secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(format!("{}|{}", gateway_order_id, gateway_payment_id).as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, signature)
}

/// Computes the signature a well-behaved gateway would send. Test helper.
pub fn sign_gateway_payload(
    secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}|{}", gateway_order_id, gateway_payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[derive(Debug, Serialize)]
struct GatewayOrderPayload<'a> {
    amount: i64,
    currency: &'a str,
    receipt: String,
    payment_capture: u8,
}

#[derive(Debug, Deserialize)]
struct GatewayOrderCreated {
    id: String,
}

/// HTTP client for the online payment gateway.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    pub fn secret(&self) -> &str {
        &self.config.key_secret
    }

    /// Creates a payment intent with the gateway.
    ///
    /// Provider failures surface with the provider's message attached so
    /// the caller can report them.
    #[instrument(skip(self), fields(amount = amount_minor))]
    pub async fn create_gateway_order(
        &self,
        amount_minor: i64,
        receipt: String,
    ) -> Result<String, ServiceError> {
        let url = format!("{}/orders", self.config.base_url);
        let payload = GatewayOrderPayload {
            amount: amount_minor,
            currency: &self.config.currency,
            receipt,
            payment_capture: 1,
        };

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Payment gateway unreachable");
                ServiceError::ExternalServiceError(format!("Payment gateway unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Payment gateway rejected order creation");
            return Err(ServiceError::ExternalServiceError(format!(
                "Payment gateway error ({}): {}",
                status, body
            )));
        }

        let created: GatewayOrderCreated = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Invalid gateway response: {}", e))
        })?;

        Ok(created.id)
    }
}

/// Orchestrates online checkout, COD checkout, and payment verification.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DbPool>,
    gateway: GatewayClient,
    cod_charge: Decimal,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(
        db: Arc<DbPool>,
        gateway: GatewayClient,
        cod_charge: Decimal,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            gateway,
            cod_charge,
            event_sender,
        }
    }

    async fn checkout_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        request: &CheckoutRequest,
    ) -> Result<OrderModel, ServiceError> {
        if request.missing_required_field() {
            return Err(ServiceError::Forbidden(
                "All address fields are required at checkout".to_string(),
            ));
        }

        let db = &*self.db;
        let order = OrderEntity::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::IsDeleted.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::Forbidden("Order not found".to_string()))?;

        if order.is_paid {
            return Err(ServiceError::Forbidden(
                "Order is already paid".to_string(),
            ));
        }

        Ok(order)
    }

    fn capture_address(active: &mut OrderActiveModel, request: &CheckoutRequest) {
        active.name = Set(request.name.clone());
        active.email = Set(request.email.clone());
        active.phone_number = Set(request.phone_number.clone());
        active.state = Set(request.state.clone());
        active.city = Set(request.city.clone());
        active.address = Set(request.address.clone());
        active.pincode = Set(request.pincode.clone());
        active.landmark = Set(request.landmark.clone());
    }

    /// Creates a payment intent with the gateway and captures the shipping
    /// address onto the order.
    #[instrument(skip(self, request), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn create_checkout(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        request: CheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        let order = self.checkout_order(order_id, user_id, &request).await?;

        // A coupon locks the payable to the discounted final price.
        let payable = if order.coupon_id.is_some() {
            order.final_price
        } else {
            order.total_price
        };
        let amount_minor = to_minor_units(payable)?;

        let gateway_order_id = self
            .gateway
            .create_gateway_order(amount_minor, format!("order_{}", order.id))
            .await?;

        let db = &*self.db;
        let mut active: OrderActiveModel = order.into();
        active.gateway_order_id = Set(Some(gateway_order_id.clone()));
        Self::capture_address(&mut active, &request);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await?;

        info!(
            order_id = %order_id,
            gateway_order_id = %gateway_order_id,
            amount = amount_minor,
            "Checkout created"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::CheckoutCreated {
                    order_id,
                    gateway_order_id: gateway_order_id.clone(),
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send checkout event");
            }
        }

        Ok(CheckoutResponse {
            order_id,
            gateway_order_id,
            amount: amount_minor,
            currency: self.gateway.currency().to_string(),
        })
    }

    /// Marks the order for cash-on-delivery fulfillment: no gateway call,
    /// no payment signature; the configured surcharge lands on the payable.
    #[instrument(skip(self, request), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn cod_checkout(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        request: CheckoutRequest,
    ) -> Result<CodCheckoutResponse, ServiceError> {
        let order = self.checkout_order(order_id, user_id, &request).await?;

        let final_price =
            recompute_final_price(order.total_price, order.discount_amount, self.cod_charge);

        let db = &*self.db;
        let cod_charge = self.cod_charge;
        let mut active: OrderActiveModel = order.into();
        active.payment_method = Set(PaymentMethod::Cod);
        active.cod_charge = Set(cod_charge);
        active.final_price = Set(final_price);
        Self::capture_address(&mut active, &request);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;

        info!(order_id = %order_id, payable = %final_price, "COD checkout created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::CodCheckoutCreated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send COD checkout event");
            }
        }

        Ok(CodCheckoutResponse {
            order_id,
            payment_method: updated.payment_method,
            cod_charge: updated.cod_charge,
            payable: updated.final_price,
        })
    }

    /// Verifies the gateway's payment callback.
    ///
    /// On signature mismatch the order is left untouched: no paid flag, no
    /// audit row. On success the paid flag and the history append commit in
    /// one transaction.
    #[instrument(skip(self, request), fields(gateway_order_id = %request.gateway_order_id))]
    pub async fn verify_payment(
        &self,
        request: VerifyPaymentRequest,
    ) -> Result<OrderModel, ServiceError> {
        let db = &*self.db;

        let order = OrderEntity::find()
            .filter(order::Column::GatewayOrderId.eq(request.gateway_order_id.clone()))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment order not found".to_string()))?;

        if !verify_gateway_signature(
            self.gateway.secret(),
            &request.gateway_order_id,
            &request.gateway_payment_id,
            &request.gateway_signature,
        ) {
            warn!(order_id = %order.id, "Payment signature verification failed");
            return Err(ServiceError::InvalidOperation(
                "Payment signature verification failed".to_string(),
            ));
        }

        let order_id = order.id;
        let current_status = order.status;
        let now = Utc::now();

        let txn = db.begin().await?;

        let mut active: OrderActiveModel = order.into();
        active.is_paid = Set(true);
        active.gateway_payment_id = Set(Some(request.gateway_payment_id.clone()));
        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await?;

        // Payment success records an audit entry at the order's current
        // status; it does not transition the status itself.
        HistoryActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(current_status),
            details: Set(Some(format!(
                "Payment {} captured via gateway",
                request.gateway_payment_id
            ))),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit payment verification");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, "Payment verified");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PaymentVerified {
                    order_id,
                    gateway_payment_id: request.gateway_payment_id,
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send payment verified event");
            }
        }

        Ok(updated)
    }
}
