use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::order_status_history::Model as HistoryModel,
    errors::ServiceError,
    services::order_status::UpdateStatusRequest,
    services::orders::{
        CreateOrderRequest, OrderItemResponse, OrderListResponse, OrderResponse,
        UpdateOrderItemRequest,
    },
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub is_paid: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// The filter arrives as a string; anything other than true/false is a
// client error, not an empty result.
fn parse_is_paid(raw: Option<&str>) -> Result<Option<bool>, ServiceError> {
    match raw {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(ServiceError::ValidationError(format!(
            "Invalid is_paid filter: {}",
            other
        ))),
    }
}

/// List orders for the caller; admins see every order.
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let is_paid = parse_is_paid(query.is_paid.as_deref())?;
    let result = state
        .services
        .orders
        .list_orders(
            auth_user.user_id,
            auth_user.is_admin(),
            is_paid,
            query.page,
            query.limit,
        )
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Create an order from (product, quantity) lines.
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state
        .services
        .orders
        .create_order(auth_user.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// Fetch one order.
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state
        .services
        .orders
        .get_order(id, auth_user.user_id, auth_user.is_admin())
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Soft-delete an order.
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .orders
        .soft_delete_order(id, auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::message("Order deleted successfully")))
}

/// Invoice listing for the caller.
pub async fn list_invoices(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let invoices = state.services.orders.list_invoices(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(invoices)))
}

/// Attach buyer-supplied reference material to a purchased line.
pub async fn update_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateOrderItemRequest>,
) -> Result<Json<ApiResponse<OrderItemResponse>>, ServiceError> {
    let item = state
        .services
        .orders
        .update_order_item(id, auth_user.user_id, request)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Admin status transition with audit and notification.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.status.update_status(id, request).await?;
    let items = state.services.orders.get_order_items(order.id).await?;
    Ok(Json(ApiResponse::success(OrderResponse::from_models(
        order, items,
    ))))
}

/// Audit trail for one order.
pub async fn order_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<HistoryModel>>>, ServiceError> {
    let rows = state
        .services
        .status
        .history_for_order(id, auth_user.user_id, auth_user.is_admin())
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Audit trail across the caller's orders.
pub async fn all_order_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<HistoryModel>>>, ServiceError> {
    let rows = state
        .services
        .status
        .history_for_user(auth_user.user_id, auth_user.is_admin())
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
