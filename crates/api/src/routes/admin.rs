//! Staff back-office route handlers.
//!
//! Reads (`stats`, user and order listings) are open to moderators and
//! admins. Every mutation of users and orders is admin-only.

use axum::extract::State;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bookstore_core::{DeliveryStatus, OrderId, OrderStatus, Role, UserId};

use crate::db::{AdminStats, RepositoryError, StatsRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::{RequireAdmin, RequireStaff};
use crate::models::order::{Order, OrderWithItems};
use crate::models::user::UserProfile;
use crate::services::OrderService;
use crate::state::AppState;

/// Longest premium grant, in days.
pub const MAX_PREMIUM_DAYS: i64 = 3650;

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct PremiumRequest {
    pub days: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoyaltyRequest {
    pub points: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryRequest {
    pub delivery_status: DeliveryStatus,
    pub delivery_address: Option<String>,
}

fn user_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("User not found".to_owned()),
        other => other.into(),
    }
}

/// `GET /admin/stats`
pub async fn stats(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
) -> Result<Json<AdminStats>> {
    Ok(Json(StatsRepository::new(state.pool()).get().await?))
}

/// `GET /admin/users`
pub async fn list_users(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
) -> Result<Json<Vec<UserProfile>>> {
    let now = Utc::now();
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(
        users
            .into_iter()
            .map(|user| UserProfile::from_user(user, now))
            .collect(),
    ))
}

/// `GET /admin/users/{id}`
pub async fn show_user(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>> {
    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(|user| Json(UserProfile::from_user(user, Utc::now())))
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))
}

/// `PUT /admin/users/{id}/role`
#[instrument(skip_all, fields(admin_id = %admin.user_id, user_id = %id, role = %request.role))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<UserProfile>> {
    let user = UserRepository::new(state.pool())
        .set_role(id, request.role)
        .await
        .map_err(user_error)?;
    tracing::info!("User role changed");
    Ok(Json(UserProfile::from_user(user, Utc::now())))
}

/// `PUT /admin/users/{id}/premium`
#[instrument(skip_all, fields(admin_id = %admin.user_id, user_id = %id, days = request.days))]
pub async fn grant_premium(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(request): Json<PremiumRequest>,
) -> Result<Json<UserProfile>> {
    if !(1..=MAX_PREMIUM_DAYS).contains(&request.days) {
        return Err(AppError::Validation(format!(
            "days must be between 1 and {MAX_PREMIUM_DAYS}"
        )));
    }

    let until = Utc::now() + Duration::days(request.days);
    let user = UserRepository::new(state.pool())
        .grant_premium(id, until)
        .await
        .map_err(user_error)?;
    tracing::info!(premium_until = %until, "Premium granted");
    Ok(Json(UserProfile::from_user(user, Utc::now())))
}

/// `PUT /admin/users/{id}/deactivate`
#[instrument(skip_all, fields(admin_id = %admin.user_id, user_id = %id))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>> {
    let user = UserRepository::new(state.pool())
        .deactivate(id)
        .await
        .map_err(user_error)?;
    tracing::info!("User deactivated");
    Ok(Json(UserProfile::from_user(user, Utc::now())))
}

/// `PUT /admin/users/{id}/loyalty`
#[instrument(skip_all, fields(admin_id = %admin.user_id, user_id = %id, points = request.points))]
pub async fn set_loyalty(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(request): Json<LoyaltyRequest>,
) -> Result<Json<UserProfile>> {
    if request.points < 0 {
        return Err(AppError::Validation(
            "points must not be negative".to_owned(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .set_loyalty_points(id, request.points)
        .await
        .map_err(user_error)?;
    tracing::info!("Loyalty points overridden");
    Ok(Json(UserProfile::from_user(user, Utc::now())))
}

/// `DELETE /admin/users/{id}`
#[instrument(skip_all, fields(admin_id = %admin.user_id, user_id = %id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<Value>> {
    if admin.user_id == id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_owned(),
        ));
    }

    UserRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(user_error)?;
    tracing::info!("User deleted");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// `GET /admin/orders`
pub async fn list_orders(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
) -> Result<Json<Vec<OrderWithItems>>> {
    let service = OrderService::new(state.pool(), &state.config().library_base_url);
    Ok(Json(service.list_all().await?))
}

/// `PUT /admin/orders/{id}/status`
#[instrument(skip_all, fields(admin_id = %admin.user_id, order_id = %id))]
pub async fn set_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Order>> {
    let service = OrderService::new(state.pool(), &state.config().library_base_url);
    Ok(Json(service.set_status(id, request.status).await?))
}

/// `PUT /admin/orders/{id}/delivery`
#[instrument(skip_all, fields(admin_id = %admin.user_id, order_id = %id))]
pub async fn update_delivery(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(request): Json<DeliveryRequest>,
) -> Result<Json<Order>> {
    let service = OrderService::new(state.pool(), &state.config().library_base_url);
    let order = service
        .update_delivery(id, request.delivery_status, request.delivery_address.as_deref())
        .await?;
    Ok(Json(order))
}
