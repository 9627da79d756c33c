use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::product_review::Model as ReviewModel,
    errors::ServiceError,
    services::reviews::{
        CreateReviewRequest, ReviewSummary, ReviewSummaryProvider, UpdateReviewRequest,
    },
    ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub struct ProductReviewsResponse {
    pub summary: ReviewSummary,
    pub reviews: Vec<ReviewModel>,
}

/// Create a review for a delivered purchase.
pub async fn create_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewModel>>), ServiceError> {
    let review = state
        .services
        .reviews
        .create_review(auth_user.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(review))))
}

/// Update the caller's review.
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewModel>>, ServiceError> {
    let review = state
        .services
        .reviews
        .update_review(id, auth_user.user_id, request)
        .await?;
    Ok(Json(ApiResponse::success(review)))
}

/// Delete the caller's review.
pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .reviews
        .delete_review(id, auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::message("Review deleted successfully")))
}

/// Reviews and aggregate rating for a product. Public read.
pub async fn product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductReviewsResponse>>, ServiceError> {
    let reviews = state.services.reviews.list_for_product(product_id).await?;
    let summary = state.services.reviews.review_summary(product_id).await?;
    Ok(Json(ApiResponse::success(ProductReviewsResponse {
        summary,
        reviews,
    })))
}
