use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::coupon::Model as CouponModel,
    errors::ServiceError,
    services::coupons::{ApplyCouponRequest, CreateCouponRequest},
    services::orders::OrderResponse,
    ApiResponse, AppState,
};

/// Apply a discount code to the caller's order.
pub async fn apply_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<ApplyCouponRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state
        .services
        .coupons
        .apply_coupon(id, auth_user.user_id, &request.code)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// List all coupons. Public read.
pub async fn list_coupons(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CouponModel>>>, ServiceError> {
    let coupons = state.services.coupons.list_coupons().await?;
    Ok(Json(ApiResponse::success(coupons)))
}

/// Fetch one coupon. Public read.
pub async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CouponModel>>, ServiceError> {
    let coupon = state.services.coupons.get_coupon(id).await?;
    Ok(Json(ApiResponse::success(coupon)))
}

/// Create a coupon. Admin only (route-gated).
pub async fn create_coupon(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CouponModel>>), ServiceError> {
    let coupon = state.services.coupons.create_coupon(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(coupon))))
}

/// Delete a coupon. Admin only (route-gated).
pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.coupons.delete_coupon(id).await?;
    Ok(Json(ApiResponse::message("Coupon deleted successfully")))
}
