//! Account route handlers: registration, login and the caller's profile.

use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookstore_core::{Email, Role, UserId};

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::models::user::UserProfile;
use crate::services::AuthService;
use crate::state::AppState;

/// Registration form.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Result of a registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: Role,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Result of a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Profile changes. Absent or blank fields are left as they are.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// `POST /auth/register`
#[instrument(skip_all, fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let user = auth
        .register(&request.username, &request.email, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }),
    ))
}

/// `POST /auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let (token, user) = auth.login(&request.email, &request.password).await?;

    Ok(Json(LoginResponse {
        token,
        user: UserProfile::from_user(user, Utc::now()),
    }))
}

/// `GET /auth/profile`
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(ctx): RequireAuth,
) -> Result<Json<UserProfile>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let user = auth.profile(ctx.user_id).await?;
    Ok(Json(UserProfile::from_user(user, Utc::now())))
}

/// `PUT /auth/profile`
#[instrument(skip_all, fields(user_id = %ctx.user_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(ctx): RequireAuth,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let user = auth
        .update_profile(
            ctx.user_id,
            request.username.as_deref(),
            request.email.as_deref(),
        )
        .await?;

    tracing::info!("Profile updated");
    Ok(Json(UserProfile::from_user(user, Utc::now())))
}
