use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::orders::OrderResponse,
    services::shipping::TrackingStatus,
    ApiResponse, AppState,
};

/// Create a provider shipment for an order. Admin only (route-gated).
pub async fn create_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.shipping.create_shipment(id).await?;
    let items = state.services.orders.get_order_items(order.id).await?;
    Ok(Json(ApiResponse::success(OrderResponse::from_models(
        order, items,
    ))))
}

/// Assign an AWB tracking code to the order's shipment. Admin only.
pub async fn assign_tracking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.shipping.assign_tracking(id).await?;
    let items = state.services.orders.get_order_items(order.id).await?;
    Ok(Json(ApiResponse::success(OrderResponse::from_models(
        order, items,
    ))))
}

/// Fetch carrier tracking status for an order.
pub async fn track_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<TrackingStatus>>, ServiceError> {
    // The tracking view is owner-scoped; admins may look at any order.
    let _ = state
        .services
        .orders
        .get_order(id, auth_user.user_id, auth_user.is_admin())
        .await?;
    let status = state.services.shipping.track(id).await?;
    Ok(Json(ApiResponse::success(status)))
}
