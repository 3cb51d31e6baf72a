//! Business models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::review::ReviewWithUser;
use crate::rating::RatingSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub image_url: Option<String>,
    pub created_at: String,
}

/// Business with its aggregated rating for list view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessWithRating {
    #[serde(flatten)]
    pub business: Business,
    #[serde(flatten)]
    pub rating: RatingSummary,
}

/// Business with its approved reviews for detail view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessDetail {
    #[serde(flatten)]
    pub business: Business,
    #[serde(flatten)]
    pub rating: RatingSummary,
    pub reviews: Vec<ReviewWithUser>,
}

/// Query parameters for `GET /api/businesses`
#[derive(Debug, Default, Deserialize)]
pub struct BusinessQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl BusinessQuery {
    /// Category filter, with empty strings treated as absent
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Lower-cased search term, with empty strings treated as absent
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_url: Option<String>,
}
