//! User account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use printshop_core::{Email, UserId, UserRole};

/// A storefront account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub referral_code: String,
    pub referred_by: Option<UserId>,
    pub marketing_opt_in: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name used in greetings: the display name, else the email local part.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub marketing_opt_in: Option<bool>,
}

/// Referral program overview for the account page.
#[derive(Debug, Clone, Serialize)]
pub struct ReferralSummary {
    pub code: String,
    pub share_url: String,
    pub referred_count: i64,
    pub referred_buyers: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(display_name: Option<&str>) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("sam@example.com").unwrap(),
            display_name: display_name.map(String::from),
            role: UserRole::Customer,
            referral_code: "ABCD2345".to_string(),
            referred_by: None,
            marketing_opt_in: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_greeting_name() {
        assert_eq!(user(Some("Sam P")).greeting_name(), "Sam P");
        assert_eq!(user(None).greeting_name(), "sam");
        assert_eq!(user(Some("  ")).greeting_name(), "sam");
    }
}
