//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use printshop_core::{ProductId, ReviewId, ReviewStatus, UserId};

pub const MAX_TITLE_CHARS: usize = 120;
pub const MAX_BODY_CHARS: usize = 5000;

/// A review with its author's display name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub author_name: Option<String>,
    pub rating: i16,
    pub title: String,
    pub body: String,
    pub status: ReviewStatus,
    pub verified_purchase: bool,
    pub created_at: DateTime<Utc>,
}

/// Review submission payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i16,
    #[serde(default)]
    pub title: String,
    pub body: String,
}

impl NewReview {
    /// Trim and validate the submission.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message for the first invalid field.
    pub fn validate(self) -> Result<Self, String> {
        if !(1..=5).contains(&self.rating) {
            return Err("rating must be between 1 and 5".to_string());
        }

        let title = self.title.trim().to_string();
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            ));
        }

        let body = self.body.trim().to_string();
        if body.is_empty() {
            return Err("review text is required".to_string());
        }
        if body.chars().count() > MAX_BODY_CHARS {
            return Err(format!(
                "review text must be at most {MAX_BODY_CHARS} characters"
            ));
        }

        Ok(Self {
            rating: self.rating,
            title,
            body,
        })
    }
}
