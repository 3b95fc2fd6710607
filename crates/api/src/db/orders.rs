//! Order repository.
//!
//! Reads and admin updates go through [`OrderRepository`]. Placing an order
//! is a sequence of writes that must commit together, so those steps are free
//! functions taking the caller's transaction connection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use bookstore_core::{
    AccessGrant, BookId, CatalogSnapshot, DeliveryStatus, FormatId, OrderId, OrderPlan,
    OrderStatus, PlannedLine, StockedFormat, UserId,
};

use super::users::USER_COLUMNS;
use super::{LIST_LIMIT, RepositoryError};
use crate::models::book::BookFormat;
use crate::models::order::{Order, OrderItem, OrderWithItems};
use crate::models::user::User;

const ORDER_COLUMNS: &str = "id, user_id, status, total_amount, item_count, delivery_status, \
     delivery_address, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, book_id, format_id, format_type, quantity, price, created_at";

/// Repository for order reads and status changes.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's full order history with items, newest first. Unlike the
    /// admin listing this is not capped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM bookstore.orders \
             WHERE user_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// All orders with their items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM bookstore.orders ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(LIST_LIMIT)
        .fetch_all(self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// Get an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM bookstore.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match order {
            Some(order) => Ok(self.with_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Move a pending order to `next`.
    ///
    /// Returns `None` if the order is no longer pending (or was deleted), so
    /// two concurrent transitions cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn transition_from_pending(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE bookstore.orders SET status = $2 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(next)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Set the delivery status, and the address when one is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn update_delivery(
        &self,
        id: OrderId,
        status: DeliveryStatus,
        address: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE bookstore.orders \
             SET delivery_status = $2, delivery_address = COALESCE($3, delivery_address) \
             WHERE id = $1 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(address)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn with_items(
        &self,
        orders: Vec<Order>,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bookstore.order_items \
             WHERE order_id = ANY($1) \
             ORDER BY created_at, id"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderWithItems {
                items: by_order.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }
}

// =============================================================================
// Order placement steps (run inside one transaction)
// =============================================================================

/// Read and lock the purchaser's row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_purchaser(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<User>, RepositoryError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM bookstore.users WHERE id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

/// Load every referenced book and its formats.
///
/// Books that don't exist are simply absent from the snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn load_catalog(
    conn: &mut PgConnection,
    book_ids: &[BookId],
) -> Result<CatalogSnapshot, RepositoryError> {
    let existing: Vec<BookId> =
        sqlx::query_scalar("SELECT id FROM bookstore.books WHERE id = ANY($1)")
            .bind(book_ids)
            .fetch_all(&mut *conn)
            .await?;

    let formats = sqlx::query_as::<_, BookFormat>(
        "SELECT id, book_id, format_type, price, stock_quantity \
         FROM bookstore.book_formats WHERE book_id = ANY($1)",
    )
    .bind(book_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut catalog = CatalogSnapshot::new();
    for id in existing {
        catalog.insert_book(id);
    }
    for format in formats {
        catalog.insert_format(StockedFormat {
            book_id: format.book_id,
            format_id: format.id,
            format_type: format.format_type,
            price: format.price,
            stock_quantity: format.stock_quantity,
        });
    }
    Ok(catalog)
}

/// Insert the order header.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    order_id: OrderId,
    user_id: UserId,
    plan: &OrderPlan,
    delivery_address: Option<&str>,
) -> Result<Order, RepositoryError> {
    let delivery_status = if plan.requires_delivery() {
        DeliveryStatus::Pending
    } else {
        DeliveryStatus::NotRequired
    };

    let order = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO bookstore.orders \
             (id, user_id, status, total_amount, item_count, delivery_status, delivery_address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(user_id)
    .bind(OrderStatus::Pending)
    .bind(plan.final_total)
    .bind(plan.item_count)
    .bind(delivery_status)
    .bind(delivery_address)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Insert one item per planned line, snapshotting the unit price.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    lines: &[PlannedLine],
) -> Result<(), RepositoryError> {
    for line in lines {
        sqlx::query(
            "INSERT INTO bookstore.order_items \
                 (order_id, book_id, format_id, format_type, quantity, price) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order_id)
        .bind(line.book_id)
        .bind(line.format_id)
        .bind(line.format_type)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Add loyalty points to a user.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user doesn't exist.
pub async fn award_points(
    conn: &mut PgConnection,
    user_id: UserId,
    points: i64,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE bookstore.users SET loyalty_points = loyalty_points + $2 WHERE id = $1",
    )
    .bind(user_id)
    .bind(points)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Insert the library grants for an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_grants(
    conn: &mut PgConnection,
    user_id: UserId,
    order_id: OrderId,
    granted_at: DateTime<Utc>,
    grants: &[AccessGrant],
) -> Result<(), RepositoryError> {
    for grant in grants {
        sqlx::query(
            "INSERT INTO bookstore.digital_access \
                 (user_id, book_id, format_id, format_type, order_id, \
                  access_granted_at, expires_at, access_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user_id)
        .bind(grant.book_id)
        .bind(grant.format_id)
        .bind(grant.format_type)
        .bind(order_id)
        .bind(granted_at)
        .bind(grant.expires_at)
        .bind(&grant.access_url)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Take `quantity` units from a format if that many are in stock.
///
/// Returns `false` without changing anything when stock is short.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    format_id: FormatId,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE bookstore.book_formats \
         SET stock_quantity = stock_quantity - $2 \
         WHERE id = $1 AND stock_quantity >= $2",
    )
    .bind(format_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Current stock of a format, for error reporting after a failed decrement.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn current_stock(
    conn: &mut PgConnection,
    format_id: FormatId,
) -> Result<i32, RepositoryError> {
    let stock: Option<i32> =
        sqlx::query_scalar("SELECT stock_quantity FROM bookstore.book_formats WHERE id = $1")
            .bind(format_id)
            .fetch_optional(conn)
            .await?;
    Ok(stock.unwrap_or(0))
}
