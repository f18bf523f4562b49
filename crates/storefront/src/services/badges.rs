//! Badge evaluation.
//!
//! Stats are read fresh, the earned set is computed with
//! [`earned_badges`], and anything not yet recorded is awarded. Awarding is
//! idempotent, so evaluation can run after any activity.

use sqlx::PgPool;
use tracing::{info, instrument, warn};

use printshop_core::UserId;

use crate::db::{BadgeRepository, RepositoryError};
use crate::models::badge::earned_badges;
use crate::services::push::{PushClient, PushMessage};

/// Evaluates and awards badges for one user at a time.
pub struct BadgeService<'a> {
    pool: &'a PgPool,
    push: &'a PushClient,
}

impl<'a> BadgeService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, push: &'a PushClient) -> Self {
        Self { pool, push }
    }

    /// Award every badge the user has earned but not yet received.
    ///
    /// Returns the codes awarded by this call.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn evaluate(&self, user_id: UserId) -> Result<Vec<String>, RepositoryError> {
        let repo = BadgeRepository::new(self.pool);
        let stats = repo.user_stats(user_id).await?;
        let earned = earned_badges(&stats);
        if earned.is_empty() {
            return Ok(Vec::new());
        }

        let awarded = repo.award(user_id, &earned).await?;
        if !awarded.is_empty() {
            info!(user_id = %user_id, badges = ?awarded, "Badges awarded");
            let message = PushMessage::new("New badge unlocked", badge_message(&awarded));
            self.push.notify_user(self.pool, user_id, &message).await;
        }
        Ok(awarded)
    }

    /// [`Self::evaluate`] for side-effect call sites: errors are logged.
    pub async fn refresh(&self, user_id: UserId) {
        if let Err(e) = self.evaluate(user_id).await {
            warn!(user_id = %user_id, error = %e, "Badge evaluation failed");
        }
    }
}

fn badge_message(codes: &[String]) -> String {
    let names: Vec<String> = codes.iter().map(|c| c.replace('_', " ")).collect();
    match names.as_slice() {
        [one] => format!("You earned the {one} badge!"),
        _ => format!("You earned {} badges: {}", names.len(), names.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_message() {
        assert_eq!(
            badge_message(&["first_order".to_string()]),
            "You earned the first order badge!"
        );
        assert_eq!(
            badge_message(&["first_order".to_string(), "curator".to_string()]),
            "You earned 2 badges: first order, curator"
        );
    }
}
