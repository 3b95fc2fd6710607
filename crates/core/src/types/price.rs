//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are positive amounts with at most two decimal places. Arithmetic on
//! order totals happens on the inner [`Decimal`]; this type only guards the
//! values that are stored on a book format and snapshotted onto order items.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Price is zero or negative.
    #[error("price must be greater than zero (got {0})")]
    NotPositive(Decimal),
    /// Price has sub-cent precision.
    #[error("price must have at most {max} decimal places (got {0})", max = Price::SCALE)]
    TooPrecise(Decimal),
}

/// A positive unit price.
///
/// ```
/// use bookstore_core::Price;
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(1299, 2)).unwrap();
/// assert_eq!(price.to_string(), "12.99");
///
/// assert!(Price::new(Decimal::ZERO).is_err());
/// assert!(Price::new(Decimal::new(12_999, 3)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of decimal places.
    pub const SCALE: u32 = 2;

    /// Create a price, rejecting non-positive or sub-cent amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if the amount is not strictly positive or has
    /// more than two significant decimal places.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive(amount));
        }
        let normalized = amount.normalize();
        if normalized.scale() > Self::SCALE {
            return Err(PriceError::TooPrecise(amount));
        }
        let mut value = normalized;
        value.rescale(Self::SCALE);
        Ok(Self(value))
    }

    /// Get the amount as a decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price multiplied by a quantity, or `None` on overflow.
    #[must_use]
    pub fn checked_total(&self, quantity: u32) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rescales_to_cents() {
        let price = Price::new(Decimal::new(125, 1)).unwrap();
        assert_eq!(price.to_string(), "12.50");
        assert_eq!(price.amount(), Decimal::new(1250, 2));
    }

    #[test]
    fn test_new_accepts_trailing_zeros() {
        // 9.9900 normalizes to 9.99
        let price = Price::new(Decimal::new(99_900, 4)).unwrap();
        assert_eq!(price.amount(), Decimal::new(999, 2));
    }

    #[test]
    fn test_new_rejects_non_positive() {
        assert!(matches!(
            Price::new(Decimal::ZERO),
            Err(PriceError::NotPositive(_))
        ));
        assert!(matches!(
            Price::new(Decimal::new(-100, 2)),
            Err(PriceError::NotPositive(_))
        ));
    }

    #[test]
    fn test_new_rejects_sub_cent() {
        assert!(matches!(
            Price::new(Decimal::new(1001, 3)),
            Err(PriceError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_checked_total() {
        let price = Price::new(Decimal::new(1999, 2)).unwrap();
        assert_eq!(price.checked_total(3), Some(Decimal::new(5997, 2)));
    }

    #[test]
    fn test_deserialize_from_number_and_string() {
        let from_number: Price = serde_json::from_str("24.5").unwrap();
        let from_string: Price = serde_json::from_str("\"24.50\"").unwrap();
        assert_eq!(from_number, from_string);
        assert!(serde_json::from_str::<Price>("0").is_err());
    }
}
