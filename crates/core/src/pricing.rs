//! Order validation and pricing.
//!
//! [`OrderPlan::build`] takes the requested lines, a [`CatalogSnapshot`] of the
//! books they reference and the purchaser's standing, and either rejects the
//! order or returns everything needed to persist it: per-line price snapshots,
//! totals, the loyalty award and the library access grants. Nothing here
//! touches storage; the caller writes the plan in one transaction.
//!
//! # Discount stacking
//!
//! Premium and loyalty discounts stack multiplicatively: loyalty applies to
//! what remains after the premium discount.
//!
//! ```text
//! final = premium + loyalty * (1 - premium)
//! ```
//!
//! With a 10% premium and a 5% loyalty discount a 100.00 order costs 85.50.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::loyalty::LoyaltyTier;
use crate::types::{BookId, FormatId, FormatType, OrderId, Price};

/// Discount for customers with an active premium subscription (10%).
pub const PREMIUM_DISCOUNT: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// How long a digital access grant lasts.
pub const DIGITAL_ACCESS_DAYS: i64 = 365;

/// Upper bound on the quantity of a single line.
pub const MAX_LINE_QUANTITY: u32 = 1000;

/// Upper bound on the number of lines in one order.
pub const MAX_ORDER_LINES: usize = 100;

/// Combine a premium and a loyalty discount.
///
/// ```
/// use bookstore_core::pricing::stacked_discount;
/// use rust_decimal::Decimal;
///
/// let d = stacked_discount(Decimal::new(10, 2), Decimal::new(5, 2));
/// assert_eq!(d, Decimal::new(145, 3));
/// ```
#[must_use]
pub fn stacked_discount(premium: Decimal, loyalty: Decimal) -> Decimal {
    premium + loyalty * (Decimal::ONE - premium)
}

/// Apply a discount fraction to an amount, rounding to cents (half away from zero).
#[must_use]
pub fn apply_discount(amount: Decimal, discount: Decimal) -> Decimal {
    (amount * (Decimal::ONE - discount))
        .round_dp_with_strategy(Price::SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Who is buying, as far as pricing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchaser {
    /// Premium is held and not yet expired.
    pub premium_active: bool,
    /// Current loyalty balance (before this order).
    pub loyalty_points: i64,
}

impl Purchaser {
    /// Combined discount fraction for this purchaser.
    #[must_use]
    pub fn discount(&self) -> Decimal {
        let premium = if self.premium_active {
            PREMIUM_DISCOUNT
        } else {
            Decimal::ZERO
        };
        stacked_discount(premium, LoyaltyTier::for_points(self.loyalty_points).discount())
    }
}

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub book_id: BookId,
    pub format_type: FormatType,
    pub quantity: i32,
}

/// A purchasable format as currently stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockedFormat {
    pub book_id: BookId,
    pub format_id: FormatId,
    pub format_type: FormatType,
    pub price: Price,
    pub stock_quantity: i32,
}

/// The books and formats an order refers to, as read before pricing.
///
/// A book can be present with no formats; that distinguishes "unknown book"
/// from "book exists but is not sold in this format".
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    books: HashMap<BookId, Vec<StockedFormat>>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a book exists.
    pub fn insert_book(&mut self, book_id: BookId) {
        self.books.entry(book_id).or_default();
    }

    /// Record a format (and implicitly its book).
    pub fn insert_format(&mut self, format: StockedFormat) {
        self.books.entry(format.book_id).or_default().push(format);
    }

    fn find(&self, book_id: BookId, format_type: FormatType) -> Result<&StockedFormat, PlanError> {
        let formats = self
            .books
            .get(&book_id)
            .ok_or(PlanError::BookNotFound(book_id))?;
        formats
            .iter()
            .find(|f| f.format_type == format_type)
            .ok_or(PlanError::InvalidFormat {
                book_id,
                format_type,
            })
    }
}

/// Why an order cannot be placed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("order must contain at least one item")]
    Empty,

    #[error("order cannot contain more than {max} items", max = MAX_ORDER_LINES)]
    TooManyLines,

    #[error("quantity for book {book_id} must be between 1 and {max} (got {quantity})", max = MAX_LINE_QUANTITY)]
    InvalidQuantity { book_id: BookId, quantity: i32 },

    #[error("book {0} not found")]
    BookNotFound(BookId),

    #[error("book {book_id} is not available as {format_type}")]
    InvalidFormat {
        book_id: BookId,
        format_type: FormatType,
    },

    #[error(
        "insufficient stock for book {book_id} ({format_type}): requested {requested}, available {available}"
    )]
    InsufficientStock {
        book_id: BookId,
        format_type: FormatType,
        requested: i64,
        available: i32,
    },

    #[error("order total is out of range")]
    Overflow,
}

/// A validated, priced order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLine {
    pub book_id: BookId,
    pub format_id: FormatId,
    pub format_type: FormatType,
    pub quantity: i32,
    /// Format price at the time of planning.
    pub unit_price: Price,
    pub line_total: Decimal,
}

/// A library access record to create for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub book_id: BookId,
    pub format_id: FormatId,
    pub format_type: FormatType,
    /// `None` means the grant never expires (physical purchases).
    pub expires_at: Option<DateTime<Utc>>,
    /// Empty for physical purchases.
    pub access_url: String,
}

/// A fully validated and priced order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub lines: Vec<PlannedLine>,
    /// Sum of `unit_price * quantity` over all lines.
    pub raw_total: Decimal,
    /// Combined discount fraction.
    pub discount: Decimal,
    /// `raw_total * (1 - discount)`, rounded to cents.
    pub final_total: Decimal,
    /// `floor(raw_total)`.
    pub points_awarded: i64,
    /// Sum of line quantities.
    pub item_count: i32,
}

impl OrderPlan {
    /// Validate and price an order.
    ///
    /// Stock is checked against the cumulative quantity per format, so two
    /// lines for the same format cannot jointly oversell it.
    ///
    /// # Errors
    ///
    /// Returns the first `PlanError` encountered, in line order.
    pub fn build(
        requests: &[LineRequest],
        catalog: &CatalogSnapshot,
        purchaser: Purchaser,
    ) -> Result<Self, PlanError> {
        if requests.is_empty() {
            return Err(PlanError::Empty);
        }
        if requests.len() > MAX_ORDER_LINES {
            return Err(PlanError::TooManyLines);
        }

        let mut lines = Vec::with_capacity(requests.len());
        let mut requested_per_format: HashMap<FormatId, i64> = HashMap::new();
        let mut raw_total = Decimal::ZERO;
        let mut item_count: i32 = 0;

        for request in requests {
            let quantity = u32::try_from(request.quantity)
                .ok()
                .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q))
                .ok_or(PlanError::InvalidQuantity {
                    book_id: request.book_id,
                    quantity: request.quantity,
                })?;

            let format = catalog.find(request.book_id, request.format_type)?;

            let requested = requested_per_format.entry(format.format_id).or_insert(0);
            *requested += i64::from(quantity);
            if *requested > i64::from(format.stock_quantity) {
                return Err(PlanError::InsufficientStock {
                    book_id: request.book_id,
                    format_type: request.format_type,
                    requested: *requested,
                    available: format.stock_quantity,
                });
            }

            let line_total = format
                .price
                .checked_total(quantity)
                .ok_or(PlanError::Overflow)?;
            raw_total = raw_total
                .checked_add(line_total)
                .ok_or(PlanError::Overflow)?;
            item_count = item_count
                .checked_add(request.quantity)
                .ok_or(PlanError::Overflow)?;

            lines.push(PlannedLine {
                book_id: format.book_id,
                format_id: format.format_id,
                format_type: format.format_type,
                quantity: request.quantity,
                unit_price: format.price,
                line_total,
            });
        }

        let discount = purchaser.discount();
        let final_total = apply_discount(raw_total, discount);
        let points_awarded = raw_total.floor().to_i64().ok_or(PlanError::Overflow)?;

        Ok(Self {
            lines,
            raw_total,
            discount,
            final_total,
            points_awarded,
            item_count,
        })
    }

    /// Whether any line needs shipping.
    #[must_use]
    pub fn requires_delivery(&self) -> bool {
        self.lines.iter().any(|l| l.format_type.requires_delivery())
    }

    /// Library grants for the order, one per line.
    ///
    /// Digital and bundled lines expire after [`DIGITAL_ACCESS_DAYS`] and link to
    /// `{library_base_url}/{order_id}/{format_id}`. Physical lines never expire
    /// and carry no URL.
    #[must_use]
    pub fn access_grants(
        &self,
        order_id: OrderId,
        library_base_url: &str,
        granted_at: DateTime<Utc>,
    ) -> Vec<AccessGrant> {
        let base = library_base_url.trim_end_matches('/');
        self.lines
            .iter()
            .map(|line| {
                if line.format_type.grants_digital_access() {
                    AccessGrant {
                        book_id: line.book_id,
                        format_id: line.format_id,
                        format_type: line.format_type,
                        expires_at: Some(granted_at + Duration::days(DIGITAL_ACCESS_DAYS)),
                        access_url: format!("{base}/{order_id}/{}", line.format_id),
                    }
                } else {
                    AccessGrant {
                        book_id: line.book_id,
                        format_id: line.format_id,
                        format_type: line.format_type,
                        expires_at: None,
                        access_url: String::new(),
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const BASE_URL: &str = "https://library.bookstore.com/access";

    fn price(cents: i64) -> Price {
        Price::new(Decimal::new(cents, 2)).unwrap()
    }

    fn format(book_id: BookId, format_type: FormatType, cents: i64, stock: i32) -> StockedFormat {
        StockedFormat {
            book_id,
            format_id: FormatId::generate(),
            format_type,
            price: price(cents),
            stock_quantity: stock,
        }
    }

    fn line(book_id: BookId, format_type: FormatType, quantity: i32) -> LineRequest {
        LineRequest {
            book_id,
            format_type,
            quantity,
        }
    }

    const NOBODY: Purchaser = Purchaser {
        premium_active: false,
        loyalty_points: 0,
    };

    #[test]
    fn test_premium_and_gold_on_one_hundred() {
        let book = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_format(format(book, FormatType::Physical, 10_000, 5));

        let purchaser = Purchaser {
            premium_active: true,
            loyalty_points: 1500,
        };
        let plan =
            OrderPlan::build(&[line(book, FormatType::Physical, 1)], &catalog, purchaser).unwrap();

        assert_eq!(plan.raw_total, Decimal::new(100, 0));
        assert_eq!(plan.discount, Decimal::new(145, 3));
        assert_eq!(plan.final_total, Decimal::new(8550, 2));
        assert_eq!(plan.points_awarded, 100);
    }

    #[test]
    fn test_stacking_is_not_additive() {
        let stacked = stacked_discount(PREMIUM_DISCOUNT, LoyaltyTier::Platinum.discount());
        // 0.10 + 0.10 * 0.90, not 0.20
        assert_eq!(stacked, Decimal::new(19, 2));
    }

    #[test]
    fn test_no_discount_without_premium_or_points() {
        assert_eq!(NOBODY.discount(), Decimal::ZERO);
    }

    #[test]
    fn test_loyalty_only_discount() {
        let purchaser = Purchaser {
            premium_active: false,
            loyalty_points: 700,
        };
        assert_eq!(purchaser.discount(), Decimal::new(2, 2));
    }

    #[test]
    fn test_raw_total_is_sum_of_snapshots() {
        let a = BookId::generate();
        let b = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_format(format(a, FormatType::Physical, 1999, 10));
        catalog.insert_format(format(a, FormatType::Digital, 999, 10));
        catalog.insert_format(format(b, FormatType::Both, 2450, 10));

        let purchaser = Purchaser {
            premium_active: true,
            loyalty_points: 600,
        };
        let plan = OrderPlan::build(
            &[
                line(a, FormatType::Physical, 2),
                line(a, FormatType::Digital, 1),
                line(b, FormatType::Both, 3),
            ],
            &catalog,
            purchaser,
        )
        .unwrap();

        let sum: Decimal = plan
            .lines
            .iter()
            .map(|l| l.unit_price.amount() * Decimal::from(l.quantity))
            .sum();
        assert_eq!(sum, plan.raw_total);
        assert_eq!(plan.raw_total, Decimal::new(12_347, 2));
        assert_eq!(plan.item_count, 6);
        assert_eq!(plan.points_awarded, 123);
        assert_eq!(
            plan.final_total,
            apply_discount(plan.raw_total, purchaser.discount())
        );
    }

    #[test]
    fn test_final_total_rounds_half_away_from_zero() {
        // 10.99 * (1 - 0.145) = 9.39645
        assert_eq!(
            apply_discount(Decimal::new(1099, 2), Decimal::new(145, 3)),
            Decimal::new(940, 2)
        );
        // 0.05 * 0.9 = 0.045
        assert_eq!(
            apply_discount(Decimal::new(5, 2), PREMIUM_DISCOUNT),
            Decimal::new(5, 2)
        );
    }

    #[test]
    fn test_points_floor_raw_total() {
        let book = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_format(format(book, FormatType::Digital, 4999, 3));

        let purchaser = Purchaser {
            premium_active: true,
            loyalty_points: 0,
        };
        let plan =
            OrderPlan::build(&[line(book, FormatType::Digital, 1)], &catalog, purchaser).unwrap();
        assert_eq!(plan.points_awarded, 49);
        assert_eq!(plan.final_total, Decimal::new(4499, 2));
    }

    #[test]
    fn test_unknown_book() {
        let catalog = CatalogSnapshot::new();
        let missing = BookId::generate();
        let err = OrderPlan::build(&[line(missing, FormatType::Digital, 1)], &catalog, NOBODY)
            .unwrap_err();
        assert_eq!(err, PlanError::BookNotFound(missing));
    }

    #[test]
    fn test_book_without_requested_format() {
        let book = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_book(book);
        catalog.insert_format(format(book, FormatType::Physical, 1000, 4));

        let err =
            OrderPlan::build(&[line(book, FormatType::Digital, 1)], &catalog, NOBODY).unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidFormat {
                book_id: book,
                format_type: FormatType::Digital
            }
        );
    }

    #[test]
    fn test_quantity_above_stock() {
        let book = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_format(format(book, FormatType::Physical, 1000, 2));

        let err =
            OrderPlan::build(&[line(book, FormatType::Physical, 3)], &catalog, NOBODY).unwrap_err();
        assert!(matches!(
            err,
            PlanError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_lines_share_stock() {
        let book = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_format(format(book, FormatType::Physical, 1000, 3));

        let err = OrderPlan::build(
            &[
                line(book, FormatType::Physical, 2),
                line(book, FormatType::Physical, 2),
            ],
            &catalog,
            NOBODY,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PlanError::InsufficientStock { requested: 4, .. }
        ));
    }

    #[test]
    fn test_exact_stock_is_allowed() {
        let book = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_format(format(book, FormatType::Physical, 1000, 3));

        let plan =
            OrderPlan::build(&[line(book, FormatType::Physical, 3)], &catalog, NOBODY).unwrap();
        assert_eq!(plan.item_count, 3);
    }

    #[test]
    fn test_rejects_empty_and_bad_quantities() {
        let book = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_format(format(book, FormatType::Physical, 1000, 3));

        assert_eq!(
            OrderPlan::build(&[], &catalog, NOBODY).unwrap_err(),
            PlanError::Empty
        );
        for quantity in [0, -1, 1001] {
            let err = OrderPlan::build(&[line(book, FormatType::Physical, quantity)], &catalog, NOBODY)
                .unwrap_err();
            assert!(matches!(err, PlanError::InvalidQuantity { .. }), "{quantity}");
        }
    }

    #[test]
    fn test_access_grants_per_format() {
        let book = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_format(format(book, FormatType::Physical, 1500, 5));
        catalog.insert_format(format(book, FormatType::Digital, 900, 5));
        catalog.insert_format(format(book, FormatType::Both, 2000, 5));

        let plan = OrderPlan::build(
            &[
                line(book, FormatType::Physical, 1),
                line(book, FormatType::Digital, 1),
                line(book, FormatType::Both, 1),
            ],
            &catalog,
            NOBODY,
        )
        .unwrap();

        let order_id = OrderId::generate();
        let now = Utc::now();
        let grants = plan.access_grants(order_id, &format!("{BASE_URL}/"), now);
        assert_eq!(grants.len(), 3);

        let physical = &grants[0];
        assert_eq!(physical.expires_at, None);
        assert!(physical.access_url.is_empty());

        for grant in &grants[1..] {
            assert_eq!(grant.expires_at, Some(now + Duration::days(365)));
            assert_eq!(
                grant.access_url,
                format!("{BASE_URL}/{order_id}/{}", grant.format_id)
            );
        }
        assert!(plan.requires_delivery());
    }

    #[test]
    fn test_digital_only_order_needs_no_delivery() {
        let book = BookId::generate();
        let mut catalog = CatalogSnapshot::new();
        catalog.insert_format(format(book, FormatType::Digital, 900, 5));

        let plan =
            OrderPlan::build(&[line(book, FormatType::Digital, 2)], &catalog, NOBODY).unwrap();
        assert!(!plan.requires_delivery());
    }
}
