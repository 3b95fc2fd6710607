//! Aggregate counts for the admin dashboard.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// Store-wide totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AdminStats {
    pub total_users: i64,
    pub premium_users: i64,
    pub admins: i64,
    pub moderators: i64,
    pub customers: i64,
    pub total_books: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    pub cancelled_orders: i64,
    /// Sum of `total_amount` over completed orders.
    pub total_revenue: Decimal,
}

/// Repository for reporting queries.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Compute all dashboard counts in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self) -> Result<AdminStats, RepositoryError> {
        let stats = sqlx::query_as::<_, AdminStats>(
            r"
            SELECT
                (SELECT COUNT(*) FROM bookstore.users) AS total_users,
                (SELECT COUNT(*) FROM bookstore.users
                    WHERE is_premium AND (premium_until IS NULL OR premium_until > NOW()))
                    AS premium_users,
                (SELECT COUNT(*) FROM bookstore.users WHERE role = 'admin') AS admins,
                (SELECT COUNT(*) FROM bookstore.users WHERE role = 'moderator') AS moderators,
                (SELECT COUNT(*) FROM bookstore.users WHERE role = 'customer') AS customers,
                (SELECT COUNT(*) FROM bookstore.books) AS total_books,
                (SELECT COUNT(*) FROM bookstore.orders) AS total_orders,
                (SELECT COUNT(*) FROM bookstore.orders WHERE status = 'pending') AS pending_orders,
                (SELECT COUNT(*) FROM bookstore.orders WHERE status = 'completed')
                    AS completed_orders,
                (SELECT COUNT(*) FROM bookstore.orders WHERE status = 'cancelled')
                    AS cancelled_orders,
                (SELECT COALESCE(SUM(total_amount), 0) FROM bookstore.orders
                    WHERE status = 'completed') AS total_revenue
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }
}
