//! User domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bookstore_core::{Email, LoyaltyTier, Role, UserId};

/// A bookstore account (without the password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: Role,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub loyalty_points: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Premium is held and has not lapsed at `now`.
    ///
    /// A premium flag with no end date never lapses.
    #[must_use]
    pub fn premium_active(&self, now: DateTime<Utc>) -> bool {
        self.is_premium && self.premium_until.is_none_or(|until| until > now)
    }

    #[must_use]
    pub const fn loyalty_tier(&self) -> LoyaltyTier {
        LoyaltyTier::for_points(self.loyalty_points)
    }
}

/// User row joined with its password hash, for login.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserWithPassword {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Profile as returned by `GET /auth/profile` and the admin user endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: Role,
    pub is_premium: bool,
    pub premium_active: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub loyalty_points: i64,
    pub loyalty_tier: LoyaltyTier,
    pub loyalty_discount: Decimal,
    pub points_to_next_tier: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Build the profile view of `user` as of `now`.
    #[must_use]
    pub fn from_user(user: User, now: DateTime<Utc>) -> Self {
        let tier = user.loyalty_tier();
        Self {
            premium_active: user.premium_active(now),
            loyalty_tier: tier,
            loyalty_discount: tier.discount(),
            points_to_next_tier: LoyaltyTier::points_to_next(user.loyalty_points),
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_premium: user.is_premium,
            premium_until: user.premium_until,
            loyalty_points: user.loyalty_points,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
