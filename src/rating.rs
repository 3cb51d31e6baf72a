//! Read-time rating aggregation.
//!
//! Averages are never stored; they are recomputed from the approved
//! reviews of a business on every read.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: i64,
}

impl RatingSummary {
    /// Summarize a set of overall ratings.
    ///
    /// The mean is rounded half-up to one decimal place; an empty set
    /// averages to 0.
    pub fn from_ratings(ratings: &[i64]) -> Self {
        let count = ratings.len() as i64;
        if count == 0 {
            return Self::default();
        }

        let sum: i64 = ratings.iter().sum();
        Self {
            average_rating: round_tenths(sum, count),
            review_count: count,
        }
    }
}

/// `floor(sum / count * 10 + 0.5) / 10`, computed in integers so that
/// exact halves are never lost to float error.
fn round_tenths(sum: i64, count: i64) -> f64 {
    let tenths = (20 * sum + count).div_euclid(2 * count);
    tenths as f64 / 10.0
}
