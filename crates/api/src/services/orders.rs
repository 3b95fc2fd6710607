//! Order placement and lifecycle.
//!
//! Placing an order validates and prices it with [`OrderPlan`], then writes
//! the order, its items, the loyalty award, the library grants and the stock
//! decrements in one transaction. If any step fails nothing is committed.

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;

use bookstore_core::{
    BookId, DeliveryStatus, InvalidTransition, OrderId, OrderPlan, OrderStatus, PlanError,
    Purchaser,
};

use crate::db::RepositoryError;
use crate::db::orders::{self as steps, OrderRepository};
use crate::models::order::{CreateOrderRequest, Order, OrderWithItems, PlacedOrder};
use crate::models::session::AuthContext;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested lines cannot be priced or fulfilled.
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("order not found")]
    NotFound,

    /// The caller neither owns the order nor has the role to act on it.
    #[error("you do not have access to this order")]
    NotOwner,

    /// The purchasing account no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// The purchasing account is deactivated.
    #[error("account is deactivated")]
    AccountDisabled,

    #[error("{0}")]
    InvalidState(#[from] InvalidTransition),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
    library_base_url: &'a str,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, library_base_url: &'a str) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
            library_base_url,
        }
    }

    /// Validate, price and persist an order for the caller.
    ///
    /// Premium and loyalty standing are read from the caller's row under a
    /// lock, never from the token.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Plan` for empty, unknown, unavailable or
    /// out-of-stock lines and `OrderError::Repository` if a write fails. No
    /// write survives an error.
    pub async fn place(
        &self,
        ctx: &AuthContext,
        request: &CreateOrderRequest,
    ) -> Result<PlacedOrder, OrderError> {
        if request.items.is_empty() {
            return Err(PlanError::Empty.into());
        }
        let book_ids: Vec<BookId> = request
            .items
            .iter()
            .map(|line| line.book_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let delivery_address = request
            .delivery_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());

        let mut tx = self.pool.begin().await?;

        let user = steps::lock_purchaser(&mut tx, ctx.user_id)
            .await?
            .ok_or(OrderError::UserNotFound)?;
        if !user.is_active {
            return Err(OrderError::AccountDisabled);
        }

        let now = Utc::now();
        let catalog = steps::load_catalog(&mut tx, &book_ids).await?;
        let purchaser = Purchaser {
            premium_active: user.premium_active(now),
            loyalty_points: user.loyalty_points,
        };
        let plan = OrderPlan::build(&request.items, &catalog, purchaser)?;

        let order_id = OrderId::generate();
        steps::insert_order(&mut tx, order_id, user.id, &plan, delivery_address).await?;
        steps::insert_items(&mut tx, order_id, &plan.lines).await?;
        steps::award_points(&mut tx, user.id, plan.points_awarded).await?;

        let grants = plan.access_grants(order_id, self.library_base_url, now);
        steps::insert_grants(&mut tx, user.id, order_id, now, &grants).await?;

        for line in &plan.lines {
            if !steps::decrement_stock(&mut tx, line.format_id, line.quantity).await? {
                let available = steps::current_stock(&mut tx, line.format_id).await?;
                tracing::warn!(
                    order_id = %order_id,
                    format_id = %line.format_id,
                    requested = line.quantity,
                    available,
                    "Stock changed while placing order"
                );
                return Err(PlanError::InsufficientStock {
                    book_id: line.book_id,
                    format_type: line.format_type,
                    requested: i64::from(line.quantity),
                    available,
                }
                .into());
            }
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            user_id = %user.id,
            total = %plan.final_total,
            raw_total = %plan.raw_total,
            points = plan.points_awarded,
            "Order placed"
        );

        Ok(PlacedOrder {
            order_id,
            total_amount: plan.final_total,
            raw_total: plan.raw_total,
            discount: plan.discount,
            points_awarded: plan.points_awarded,
            item_count: plan.item_count,
        })
    }

    /// The caller's own orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_mine(&self, ctx: &AuthContext) -> Result<Vec<OrderWithItems>, OrderError> {
        Ok(self.orders.list_for_user(ctx.user_id).await?)
    }

    /// Every order (staff view).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderWithItems>, OrderError> {
        Ok(self.orders.list_all().await?)
    }

    /// One order, visible to its owner and to staff.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::NotOwner`.
    pub async fn get(&self, ctx: &AuthContext, id: OrderId) -> Result<OrderWithItems, OrderError> {
        let order = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        if !ctx.can_view(order.order.user_id) {
            return Err(OrderError::NotOwner);
        }
        Ok(order)
    }

    /// Cancel one of the caller's own pending orders.
    ///
    /// Stock is not restored and library grants stay in place.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`, `OrderError::NotOwner`, or
    /// `OrderError::InvalidState` if the order is no longer pending.
    pub async fn cancel(&self, ctx: &AuthContext, id: OrderId) -> Result<Order, OrderError> {
        let current = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        if !ctx.owns(current.order.user_id) {
            return Err(OrderError::NotOwner);
        }

        let order = self.transition(current.order, OrderStatus::Cancelled).await?;
        tracing::info!(order_id = %id, user_id = %ctx.user_id, "Order cancelled by customer");
        Ok(order)
    }

    /// Move a pending order to `next` (admin).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::InvalidState`.
    pub async fn set_status(&self, id: OrderId, next: OrderStatus) -> Result<Order, OrderError> {
        let current = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        let order = self.transition(current.order, next).await?;
        tracing::info!(order_id = %id, status = %next, "Order status updated");
        Ok(order)
    }

    /// Update shipping progress (admin).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist.
    pub async fn update_delivery(
        &self,
        id: OrderId,
        status: DeliveryStatus,
        address: Option<&str>,
    ) -> Result<Order, OrderError> {
        let address = address.map(str::trim).filter(|a| !a.is_empty());
        let order = self
            .orders
            .update_delivery(id, status, address)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound,
                other => other.into(),
            })?;
        tracing::info!(order_id = %id, delivery_status = %status, "Delivery status updated");
        Ok(order)
    }

    async fn transition(&self, current: Order, next: OrderStatus) -> Result<Order, OrderError> {
        current.status.transition(next)?;

        match self.orders.transition_from_pending(current.id, next).await? {
            Some(order) => Ok(order),
            None => {
                // Lost a race with another transition; report what won.
                let latest = self
                    .orders
                    .get(current.id)
                    .await?
                    .ok_or(OrderError::NotFound)?;
                Err(InvalidTransition {
                    from: latest.order.status,
                    to: next,
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message() {
        let err = OrderError::from(InvalidTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Cancelled,
        });
        assert_eq!(err.to_string(), "cannot move order from cancelled to cancelled");
    }

    #[test]
    fn test_plan_errors_pass_through() {
        let err = OrderError::from(PlanError::Empty);
        assert_eq!(err.to_string(), "order must contain at least one item");
    }
}
