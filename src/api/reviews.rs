//! Review submission.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::auth::AuthUser;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::ApiJson;
use super::validation::{validate_rating, validate_required, validate_review_content};
use crate::db::{now_timestamp, CreateReviewRequest, Review, ReviewStatus};
use crate::AppState;

fn validate_create_request(req: &CreateReviewRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors.check("businessId", validate_required(&req.business_id, "Business id", 64));
    errors.check("content", validate_review_content(&req.content));
    errors.check("qualityRating", validate_rating(req.quality_rating));
    errors.check("serviceRating", validate_rating(req.service_rating));
    errors.check("valueRating", validate_rating(req.value_rating));
    errors.check("overallRating", validate_rating(req.overall_rating));

    errors.finish()
}

/// Submit a review. It stays PENDING until an admin moderates it.
///
/// POST /api/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> Result<Json<Review>, ApiError> {
    validate_create_request(&req)?;

    let business_id = req.business_id.trim().to_string();
    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM businesses WHERE id = ?")
        .bind(&business_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("Business not found"));
    }

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        content: req.content.trim().to_string(),
        quality_rating: req.quality_rating,
        service_rating: req.service_rating,
        value_rating: req.value_rating,
        overall_rating: req.overall_rating,
        status: ReviewStatus::Pending.as_str().to_string(),
        created_at: now_timestamp(),
        user_id: auth.user_id,
        business_id,
    };

    sqlx::query(
        r#"
        INSERT INTO reviews (
            id, content, quality_rating, service_rating, value_rating, overall_rating,
            status, created_at, user_id, business_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&review.id)
    .bind(&review.content)
    .bind(review.quality_rating)
    .bind(review.service_rating)
    .bind(review.value_rating)
    .bind(review.overall_rating)
    .bind(&review.status)
    .bind(&review.created_at)
    .bind(&review.user_id)
    .bind(&review.business_id)
    .execute(&state.db)
    .await?;

    tracing::info!(
        review_id = %review.id,
        business_id = %review.business_id,
        user_id = %review.user_id,
        "Review submitted for moderation"
    );

    Ok(Json(review))
}
