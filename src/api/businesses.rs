//! Business listing, detail and creation endpoints.

use axum::{extract::State, Json};
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::AuthUser;
use super::error::{is_unique_violation, ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::{validate_image_url, validate_optional_len, validate_required};
use crate::db::{
    now_timestamp, Business, BusinessDetail, BusinessQuery, BusinessWithRating,
    CreateBusinessRequest, ReviewWithUser, ReviewWithUserRow,
};
use crate::rating::RatingSummary;
use crate::AppState;

/// Shared WHERE clause: `?1` is the category (or NULL), `?2` the lower-cased search term (or NULL)
const BUSINESS_FILTER: &str = r#"
    (?1 IS NULL OR b.category = ?1)
    AND (?2 IS NULL OR instr(lower(b.name), ?2) > 0 OR instr(lower(b.location), ?2) > 0)
"#;

fn validate_create_request(req: &CreateBusinessRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors.check("name", validate_required(&req.name, "Business name", 100));
    errors.check("category", validate_required(&req.category, "Category", 50));
    errors.check("description", validate_optional_len(&req.description, "Description", 2000));
    errors.check("location", validate_optional_len(&req.location, "Location", 200));
    errors.check("imageUrl", validate_image_url(&req.image_url));

    errors.finish()
}

/// List businesses with their aggregated ratings
///
/// GET /api/businesses?category=&search=
pub async fn list_businesses(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<BusinessQuery>,
) -> Result<Json<Vec<BusinessWithRating>>, ApiError> {
    let category = query.category();
    let search = query.search_term();

    let businesses = sqlx::query_as::<_, Business>(&format!(
        "SELECT b.* FROM businesses b WHERE {} ORDER BY b.name",
        BUSINESS_FILTER
    ))
    .bind(category)
    .bind(search.as_deref())
    .fetch_all(&state.db)
    .await?;

    // Approved overall ratings for the same set of businesses, in one round trip
    let ratings: Vec<(String, i64)> = sqlx::query_as(&format!(
        r#"
        SELECT r.business_id, r.overall_rating
        FROM reviews r
        JOIN businesses b ON b.id = r.business_id
        WHERE r.status = 'APPROVED' AND {}
        "#,
        BUSINESS_FILTER
    ))
    .bind(category)
    .bind(search.as_deref())
    .fetch_all(&state.db)
    .await?;

    let mut by_business: HashMap<String, Vec<i64>> = HashMap::new();
    for (business_id, rating) in ratings {
        by_business.entry(business_id).or_default().push(rating);
    }

    let results = businesses
        .into_iter()
        .map(|business| {
            let rating = by_business
                .get(&business.id)
                .map(|r| RatingSummary::from_ratings(r))
                .unwrap_or_default();
            BusinessWithRating { business, rating }
        })
        .collect();

    Ok(Json(results))
}

/// Get a business with its approved reviews, newest first
///
/// GET /api/businesses/:id
pub async fn get_business(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<BusinessDetail>, ApiError> {
    let business = sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Business not found"))?;

    let rows = sqlx::query_as::<_, ReviewWithUserRow>(
        r#"
        SELECT r.*, u.name AS user_name
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        WHERE r.business_id = ? AND r.status = 'APPROVED'
        ORDER BY r.created_at DESC, r.rowid DESC
        "#,
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    let overall: Vec<i64> = rows.iter().map(|row| row.review.overall_rating).collect();
    let reviews: Vec<ReviewWithUser> = rows.into_iter().map(ReviewWithUser::from).collect();

    Ok(Json(BusinessDetail {
        business,
        rating: RatingSummary::from_ratings(&overall),
        reviews,
    }))
}

/// Create a new business (admin only)
///
/// POST /api/admin/businesses
pub async fn create_business(
    State(state): State<Arc<AppState>>,
    admin: AuthUser,
    ApiJson(req): ApiJson<CreateBusinessRequest>,
) -> Result<Json<Business>, ApiError> {
    validate_create_request(&req)?;

    let business = Business {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        description: req.description.trim().to_string(),
        category: req.category.trim().to_string(),
        location: req.location.trim().to_string(),
        image_url: req.image_url.filter(|u| !u.is_empty()),
        created_at: now_timestamp(),
    };

    sqlx::query(
        r#"
        INSERT INTO businesses (id, name, description, category, location, image_url, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&business.id)
    .bind(&business.name)
    .bind(&business.description)
    .bind(&business.category)
    .bind(&business.location)
    .bind(&business.image_url)
    .bind(&business.created_at)
    .execute(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("A business with this name already exists")
        } else {
            ApiError::from(e)
        }
    })?;

    tracing::info!(
        business_id = %business.id,
        name = %business.name,
        admin_id = %admin.user_id,
        "Business created"
    );

    Ok(Json(business))
}
