//! Customer order route handlers.

use axum::{extract::State, http::StatusCode};
use serde::Serialize;
use tracing::instrument;

use bookstore_core::OrderId;

use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::order::{CreateOrderRequest, Order, OrderWithItems, PlacedOrder};
use crate::services::OrderService;
use crate::state::AppState;

/// Result of a cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: &'static str,
    pub order: Order,
}

/// `POST /orders`
#[instrument(skip_all, fields(user_id = %ctx.user_id, lines = request.items.len()))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(ctx): RequireAuth,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let service = OrderService::new(state.pool(), &state.config().library_base_url);
    let placed = service.place(&ctx, &request).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// `GET /orders`
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(ctx): RequireAuth,
) -> Result<Json<Vec<OrderWithItems>>> {
    let service = OrderService::new(state.pool(), &state.config().library_base_url);
    Ok(Json(service.list_mine(&ctx).await?))
}

/// `GET /orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(ctx): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    let service = OrderService::new(state.pool(), &state.config().library_base_url);
    Ok(Json(service.get(&ctx, id).await?))
}

/// `DELETE /orders/{id}`
#[instrument(skip_all, fields(user_id = %ctx.user_id, order_id = %id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(ctx): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<CancelResponse>> {
    let service = OrderService::new(state.pool(), &state.config().library_base_url);
    let order = service.cancel(&ctx, id).await?;
    Ok(Json(CancelResponse {
        message: "Order cancelled successfully",
        order,
    }))
}
