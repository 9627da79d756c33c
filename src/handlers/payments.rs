use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::payments::{
        CheckoutRequest, CheckoutResponse, CodCheckoutResponse, VerifyPaymentRequest,
    },
    services::orders::OrderResponse,
    ApiResponse, AppState,
};

/// Create an online-payment checkout for an order.
pub async fn create_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<ApiResponse<CheckoutResponse>>, ServiceError> {
    let checkout = state
        .services
        .payments
        .create_checkout(id, auth_user.user_id, request)
        .await?;
    Ok(Json(ApiResponse::success(checkout)))
}

/// Create a cash-on-delivery checkout for an order.
pub async fn cod_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<ApiResponse<CodCheckoutResponse>>, ServiceError> {
    let checkout = state
        .services
        .payments
        .cod_checkout(id, auth_user.user_id, request)
        .await?;
    Ok(Json(ApiResponse::success(checkout)))
}

/// Verify a gateway payment callback signature.
pub async fn verify_payment(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.payments.verify_payment(request).await?;
    let items = state.services.orders.get_order_items(order.id).await?;
    Ok(Json(ApiResponse::success(OrderResponse::from_models(
        order, items,
    ))))
}
