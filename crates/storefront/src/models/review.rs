//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clothify_core::{Email, ProductId, ReviewId};

/// Lowest and highest star rating.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Longest comment accepted, in characters.
const MAX_COMMENT_CHARS: usize = 2000;

const fn default_rating() -> u8 {
    5
}

/// A stored review. Shown with the reviewer's email.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_email: Email,
    pub comment: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

/// Review form submission. The rating defaults to five stars.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub comment: String,
    #[serde(default = "default_rating")]
    pub rating: u8,
}

impl NewReview {
    /// Trim the comment and check the rating.
    ///
    /// # Errors
    ///
    /// Returns a message describing the invalid field.
    pub fn validate(mut self) -> Result<Self, String> {
        self.comment = self.comment.trim().to_string();

        if self.comment.is_empty() {
            return Err("Review comment is required".to_string());
        }
        if self.comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(format!("Review comment cannot exceed {MAX_COMMENT_CHARS} characters"));
        }
        if !RATING_RANGE.contains(&self.rating) {
            return Err("Rating must be between 1 and 5".to_string());
        }
        Ok(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn review(comment: &str, rating: u8) -> NewReview {
        NewReview {
            comment: comment.to_string(),
            rating,
        }
    }

    #[test]
    fn test_rating_defaults_to_five() {
        let parsed: NewReview = serde_json::from_str(r#"{"comment":"Soft fabric"}"#).unwrap();
        assert_eq!(parsed.rating, 5);
    }

    #[test]
    fn test_validate_trims_comment() {
        let valid = review("  Fits well \n", 4).validate().unwrap();
        assert_eq!(valid.comment, "Fits well");
        assert_eq!(valid.rating, 4);
    }

    #[test]
    fn test_validate_rating_bounds() {
        assert!(review("ok", 1).validate().is_ok());
        assert!(review("ok", 5).validate().is_ok());
        assert_eq!(
            review("ok", 0).validate().unwrap_err(),
            "Rating must be between 1 and 5"
        );
        assert!(review("ok", 6).validate().is_err());
    }

    #[test]
    fn test_validate_comment_required_and_bounded() {
        assert_eq!(
            review("   ", 3).validate().unwrap_err(),
            "Review comment is required"
        );
        assert!(review(&"a".repeat(2000), 3).validate().is_ok());
        assert!(review(&"a".repeat(2001), 3).validate().is_err());
    }
}
