//! Status and classification enums for bookstore entities.
//!
//! Each enum maps to a `PostgreSQL` enum type in the `bookstore` schema when the
//! `postgres` feature is enabled, and to lowercase strings in JSON.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// User role. Ordered by privilege: `Customer < Moderator < Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bookstore.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular shopper.
    #[default]
    Customer,
    /// Catalog maintainer with read-only access to admin reports.
    Moderator,
    /// Full access.
    Admin,
}

impl Role {
    /// Moderators and admins.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }

    /// Admins only.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownVariant {
                kind: "role",
                value: s.to_owned(),
            }),
        }
    }
}

/// Order lifecycle status.
///
/// ```text
/// pending ──(admin)──────────► completed
///    │
///    └──(admin / owner)──────► cancelled
/// ```
///
/// `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bookstore.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

/// Rejected order status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move order from {from} to {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed | Self::Cancelled)
        )
    }

    /// Validate a transition and return the new status.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for anything other than leaving `pending`
    /// for a terminal state.
    pub const fn transition(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(UnknownVariant {
                kind: "order status",
                value: s.to_owned(),
            }),
        }
    }
}

/// Shipping progress of an order. Orders with no physical lines start as
/// `not_required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bookstore.delivery_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    NotRequired,
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Returned,
}

impl DeliveryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotRequired => "not_required",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Returned => "returned",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchasable variant of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bookstore.format_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    /// Printed copy, shipped.
    Physical,
    /// Download / online reading.
    Digital,
    /// Printed copy bundled with digital access.
    Both,
}

impl FormatType {
    /// Purchases of this format receive a time-boxed library access URL.
    #[must_use]
    pub const fn grants_digital_access(self) -> bool {
        matches!(self, Self::Digital | Self::Both)
    }

    /// Purchases of this format need shipping.
    #[must_use]
    pub const fn requires_delivery(self) -> bool {
        matches!(self, Self::Physical | Self::Both)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Digital => "digital",
            Self::Both => "both",
        }
    }
}

impl std::fmt::Display for FormatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FormatType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "physical" => Ok(Self::Physical),
            "digital" => Ok(Self::Digital),
            "both" => Ok(Self::Both),
            _ => Err(UnknownVariant {
                kind: "format type",
                value: s.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_privilege_order() {
        assert!(Role::Customer < Role::Moderator);
        assert!(Role::Moderator < Role::Admin);
        assert!(!Role::Customer.is_staff());
        assert!(Role::Moderator.is_staff());
        assert!(!Role::Moderator.is_admin());
        assert!(Role::Admin.is_admin());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" moderator ".parse::<Role>().unwrap(), Role::Moderator);
        let err = "owner".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "role");
    }

    #[test]
    fn test_pending_transitions() {
        assert_eq!(
            OrderStatus::Pending.transition(OrderStatus::Completed),
            Ok(OrderStatus::Completed)
        );
        assert_eq!(
            OrderStatus::Pending.transition(OrderStatus::Cancelled),
            Ok(OrderStatus::Cancelled)
        );
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for from in [OrderStatus::Completed, OrderStatus::Cancelled] {
            assert!(from.is_terminal());
            for to in [
                OrderStatus::Pending,
                OrderStatus::Completed,
                OrderStatus::Cancelled,
            ] {
                assert_eq!(
                    from.transition(to),
                    Err(InvalidTransition { from, to }),
                    "{from} -> {to} must be rejected"
                );
            }
        }
    }

    #[test]
    fn test_second_cancel_is_rejected() {
        let cancelled = OrderStatus::Pending
            .transition(OrderStatus::Cancelled)
            .unwrap();
        assert!(cancelled.transition(OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_order_status_accepts_us_spelling() {
        assert_eq!(
            "Canceled".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn test_format_capabilities() {
        assert!(!FormatType::Physical.grants_digital_access());
        assert!(FormatType::Digital.grants_digital_access());
        assert!(FormatType::Both.grants_digital_access());
        assert!(FormatType::Physical.requires_delivery());
        assert!(!FormatType::Digital.requires_delivery());
        assert!(FormatType::Both.requires_delivery());
    }

    #[test]
    fn test_json_representation() {
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::NotRequired).unwrap(),
            "\"not_required\""
        );
        assert_eq!(
            serde_json::from_str::<FormatType>("\"both\"").unwrap(),
            FormatType::Both
        );
        assert!(serde_json::from_str::<FormatType>("\"audio\"").is_err());
    }
}
