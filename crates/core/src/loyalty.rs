//! Loyalty tiers.
//!
//! Customers earn one point per whole currency unit spent (pre-discount). The
//! accumulated balance selects a tier, and the tier selects a discount:
//!
//! | Tier     | Points         | Discount |
//! |----------|----------------|----------|
//! | Bronze   | 0 - 499        | 0%       |
//! | Silver   | 500 - 1 499    | 2%       |
//! | Gold     | 1 500 - 4 999  | 5%       |
//! | Platinum | 5 000+         | 10%      |
//!
//! Negative balances are treated as zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A loyalty band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    /// All tiers, lowest first.
    pub const ALL: [Self; 4] = [Self::Bronze, Self::Silver, Self::Gold, Self::Platinum];

    /// Tier for a point balance.
    ///
    /// ```
    /// use bookstore_core::LoyaltyTier;
    ///
    /// assert_eq!(LoyaltyTier::for_points(-20), LoyaltyTier::Bronze);
    /// assert_eq!(LoyaltyTier::for_points(1500), LoyaltyTier::Gold);
    /// ```
    #[must_use]
    pub const fn for_points(points: i64) -> Self {
        match points {
            i64::MIN..500 => Self::Bronze,
            500..1500 => Self::Silver,
            1500..5000 => Self::Gold,
            _ => Self::Platinum,
        }
    }

    /// Display name of the tier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        }
    }

    /// Discount fraction granted by the tier (`0.05` is 5%).
    #[must_use]
    pub const fn discount(self) -> Decimal {
        match self {
            Self::Bronze => Decimal::ZERO,
            Self::Silver => Decimal::from_parts(2, 0, 0, false, 2),
            Self::Gold => Decimal::from_parts(5, 0, 0, false, 2),
            Self::Platinum => Decimal::from_parts(10, 0, 0, false, 2),
        }
    }

    /// Lowest balance that qualifies for the tier.
    #[must_use]
    pub const fn min_points(self) -> i64 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 500,
            Self::Gold => 1500,
            Self::Platinum => 5000,
        }
    }

    /// The tier above this one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Bronze => Some(Self::Silver),
            Self::Silver => Some(Self::Gold),
            Self::Gold => Some(Self::Platinum),
            Self::Platinum => None,
        }
    }

    /// Points still needed to reach the next tier, `None` at the top.
    #[must_use]
    pub fn points_to_next(points: i64) -> Option<i64> {
        let points = points.max(0);
        Self::for_points(points)
            .next()
            .map(|next| next.min_points() - points)
    }
}

impl std::fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
