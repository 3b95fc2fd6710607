//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstore_core::{
    BookId, DeliveryStatus, FormatId, FormatType, LineRequest, OrderId, OrderItemId, OrderStatus,
    Price, UserId,
};

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub item_count: i32,
    pub delivery_status: DeliveryStatus,
    pub delivery_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order; `price` is the unit price when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub book_id: BookId,
    pub format_id: FormatId,
    pub format_type: FormatType,
    pub quantity: i32,
    pub price: Price,
    pub created_at: DateTime<Utc>,
}

/// An order with its lines, as returned by the order endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineRequest>,
    pub delivery_address: Option<String>,
}

/// Result of a successful `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total_amount: Decimal,
    pub raw_total: Decimal,
    pub discount: Decimal,
    pub points_awarded: i64,
    pub item_count: i32,
}
