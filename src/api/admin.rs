//! Review moderation endpoints (admin only).

use axum::{extract::State, Json};
use std::sync::Arc;

use super::auth::AuthUser;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use crate::db::{PendingReview, PendingReviewRow, Review, ReviewStatus, UpdateReviewStatusRequest};
use crate::AppState;

/// Parse a requested moderation status. Only terminal states can be requested.
fn parse_target_status(status: &str) -> Result<ReviewStatus, ApiError> {
    match status.parse::<ReviewStatus>() {
        Ok(target) if target.is_terminal() => Ok(target),
        _ => Err(ApiError::validation_field(
            "status",
            "Status must be one of: APPROVED, REJECTED",
        )),
    }
}

/// List reviews waiting for moderation, newest first
///
/// GET /api/admin/reviews
pub async fn list_pending_reviews(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PendingReview>>, ApiError> {
    let rows = sqlx::query_as::<_, PendingReviewRow>(
        r#"
        SELECT r.*, u.name AS user_name, u.email AS user_email, b.name AS business_name
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        JOIN businesses b ON b.id = r.business_id
        WHERE r.status = 'PENDING'
        ORDER BY r.created_at DESC, r.rowid DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows.into_iter().map(PendingReview::from).collect()))
}

/// Approve or reject a pending review
///
/// PATCH /api/admin/reviews/:id
pub async fn update_review_status(
    State(state): State<Arc<AppState>>,
    admin: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateReviewStatusRequest>,
) -> Result<Json<Review>, ApiError> {
    let target = parse_target_status(&req.status)?;

    let mut review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    let current = review
        .status_enum()
        .ok_or_else(|| ApiError::internal("Review has an unknown status"))?;

    if !current.can_transition_to(target) {
        return Err(ApiError::conflict(format!(
            "Review has already been {}",
            current.as_str().to_lowercase()
        )));
    }

    if current != target {
        sqlx::query("UPDATE reviews SET status = ? WHERE id = ?")
            .bind(target.as_str())
            .bind(&id)
            .execute(&state.db)
            .await?;
        review.status = target.as_str().to_string();

        tracing::info!(
            review_id = %id,
            status = %target,
            admin_id = %admin.user_id,
            "Review moderated"
        );
    }

    Ok(Json(review))
}
