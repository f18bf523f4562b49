//! Gamification badges.
//!
//! Which badges a user has earned is a pure function of [`UserStats`];
//! the database only records when each badge was first awarded.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Badge codes, matching the rows seeded in `storefront.badges`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCode {
    FirstOrder,
    LoyalCustomer,
    FirstReview,
    TopCritic,
    Curator,
    Ambassador,
}

impl BadgeCode {
    pub const ALL: [Self; 6] = [
        Self::FirstOrder,
        Self::LoyalCustomer,
        Self::FirstReview,
        Self::TopCritic,
        Self::Curator,
        Self::Ambassador,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstOrder => "first_order",
            Self::LoyalCustomer => "loyal_customer",
            Self::FirstReview => "first_review",
            Self::TopCritic => "top_critic",
            Self::Curator => "curator",
            Self::Ambassador => "ambassador",
        }
    }

    /// Whether `stats` meet this badge's threshold.
    #[must_use]
    pub const fn is_earned(self, stats: &UserStats) -> bool {
        match self {
            Self::FirstOrder => stats.order_count >= 1,
            Self::LoyalCustomer => stats.order_count >= 5,
            Self::FirstReview => stats.review_count >= 1,
            Self::TopCritic => stats.review_count >= 10,
            Self::Curator => stats.wishlist_count >= 10,
            Self::Ambassador => stats.referred_buyers >= 3,
        }
    }
}

/// Activity counts that badges are computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct UserStats {
    /// Orders that count as purchases.
    pub order_count: i64,
    pub review_count: i64,
    pub wishlist_count: i64,
    /// Referred users with at least one purchase.
    pub referred_buyers: i64,
}

/// Every badge code earned for the given stats.
#[must_use]
pub fn earned_badges(stats: &UserStats) -> Vec<BadgeCode> {
    BadgeCode::ALL
        .into_iter()
        .filter(|code| code.is_earned(stats))
        .collect()
}

/// A badge as shown on the account page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Badge {
    pub code: String,
    pub name: String,
    pub description: String,
    pub awarded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_activity_no_badges() {
        assert!(earned_badges(&UserStats::default()).is_empty());
    }

    #[test]
    fn test_thresholds() {
        let stats = UserStats {
            order_count: 5,
            review_count: 1,
            wishlist_count: 9,
            referred_buyers: 3,
        };
        assert_eq!(
            earned_badges(&stats),
            vec![
                BadgeCode::FirstOrder,
                BadgeCode::LoyalCustomer,
                BadgeCode::FirstReview,
                BadgeCode::Ambassador,
            ]
        );

        let stats = UserStats {
            order_count: 4,
            review_count: 10,
            wishlist_count: 10,
            referred_buyers: 2,
        };
        assert_eq!(
            earned_badges(&stats),
            vec![
                BadgeCode::FirstOrder,
                BadgeCode::FirstReview,
                BadgeCode::TopCritic,
                BadgeCode::Curator,
            ]
        );
    }

    #[test]
    fn test_codes_are_snake_case() {
        for code in BadgeCode::ALL {
            assert_eq!(
                serde_json::to_string(&code).unwrap_or_default(),
                format!("\"{}\"", code.as_str())
            );
        }
    }
}
