//! Authentication extractors.
//!
//! Handlers declare what they need by taking one of these extractors:
//!
//! - [`RequireAuth`] - any valid bearer token
//! - [`RequireStaff`] - moderator or admin
//! - [`RequireAdmin`] - admin only
//!
//! The decoded [`AuthContext`] is handed to the handler by value; nothing is
//! stashed in global or task-local state.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use tracing::Span;

use crate::error::{AppError, set_sentry_user};
use crate::models::session::AuthContext;
use crate::services::auth::{TokenError, extract_bearer};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(ctx): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", ctx.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

/// Extractor that requires a moderator or admin token.
#[derive(Debug, Clone)]
pub struct RequireStaff(pub AuthContext);

/// Extractor that requires an admin token.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthContext);

/// Error returned when a request lacks the required identity or role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// Token failed validation.
    InvalidToken,
    /// Token has expired.
    ExpiredToken,
    /// Valid token, insufficient role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let error = match self {
            Self::MissingToken => AppError::Unauthorized("Authorization token required".to_owned()),
            Self::InvalidToken => AppError::Unauthorized("Invalid token".to_owned()),
            Self::ExpiredToken => AppError::Unauthorized("Token has expired".to_owned()),
            Self::Forbidden => AppError::Forbidden("Insufficient permissions".to_owned()),
        };
        error.into_response()
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(extract_bearer)
            .ok_or(AuthRejection::MissingToken)?;

        let claims = state.tokens().validate(token).map_err(|e| match e {
            TokenError::Expired => AuthRejection::ExpiredToken,
            TokenError::Invalid(_) | TokenError::Signing(_) => AuthRejection::InvalidToken,
        })?;

        let ctx = AuthContext::from(claims);

        Span::current().record("user_id", tracing::field::display(ctx.user_id));
        set_sentry_user(&ctx.user_id, Some(&ctx.email));

        Ok(Self(ctx))
    }
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(ctx) = RequireAuth::from_request_parts(parts, state).await?;

        if !ctx.role.is_staff() {
            tracing::warn!(user_id = %ctx.user_id, role = %ctx.role, "Staff access denied");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(ctx))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(ctx) = RequireAuth::from_request_parts(parts, state).await?;

        if !ctx.role.is_admin() {
            tracing::warn!(user_id = %ctx.user_id, role = %ctx.role, "Admin access denied");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(ctx))
    }
}
