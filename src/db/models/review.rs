//! Review models and the moderation state machine.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Moderation status of a review.
///
/// Reviews start out `Pending`. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "PENDING",
            ReviewStatus::Approved => "APPROVED",
            ReviewStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }

    /// Whether a moderator may move a review from `self` to `target`.
    /// Re-applying the current terminal status is allowed and is a no-op.
    pub fn can_transition_to(&self, target: ReviewStatus) -> bool {
        match (self, target) {
            (_, ReviewStatus::Pending) => false,
            (ReviewStatus::Pending, _) => true,
            (current, target) => *current == target,
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(ReviewStatus::Pending),
            "APPROVED" => Ok(ReviewStatus::Approved),
            "REJECTED" => Ok(ReviewStatus::Rejected),
            _ => Err(format!("Unknown review status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub content: String,
    pub quality_rating: i64,
    pub service_rating: i64,
    pub value_rating: i64,
    pub overall_rating: i64,
    pub status: String,
    pub created_at: String,
    pub user_id: String,
    pub business_id: String,
}

impl Review {
    /// Parsed status. The schema only admits known values.
    pub fn status_enum(&self) -> Option<ReviewStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAuthor {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAuthorContact {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewBusinessRef {
    pub name: String,
}

/// Review joined with its author's display name
#[derive(Debug, Clone, FromRow)]
pub struct ReviewWithUserRow {
    #[sqlx(flatten)]
    pub review: Review,
    pub user_name: String,
}

/// A public review as shown on a business detail page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewWithUser {
    #[serde(flatten)]
    pub review: Review,
    pub user: ReviewAuthor,
}

impl From<ReviewWithUserRow> for ReviewWithUser {
    fn from(row: ReviewWithUserRow) -> Self {
        Self {
            review: row.review,
            user: ReviewAuthor {
                name: row.user_name,
            },
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PendingReviewRow {
    #[sqlx(flatten)]
    pub review: Review,
    pub user_name: String,
    pub user_email: String,
    pub business_name: String,
}

/// A review waiting for moderation, with enough context for an admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReview {
    #[serde(flatten)]
    pub review: Review,
    pub user: ReviewAuthorContact,
    pub business: ReviewBusinessRef,
}

impl From<PendingReviewRow> for PendingReview {
    fn from(row: PendingReviewRow) -> Self {
        Self {
            review: row.review,
            user: ReviewAuthorContact {
                name: row.user_name,
                email: row.user_email,
            },
            business: ReviewBusinessRef {
                name: row.business_name,
            },
        }
    }
}

/// Body of `POST /api/reviews`. Any `status` or `userId` field is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub business_id: String,
    pub content: String,
    pub quality_rating: i64,
    pub service_rating: i64,
    pub value_rating: i64,
    pub overall_rating: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewStatusRequest {
    pub status: String,
}
