//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error body is `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use bookstore_core::PlanError;

use crate::db::RepositoryError;
use crate::db::books::PatchError;
use crate::models::book::CatalogError;
use crate::models::library::AccessLookupError;
use crate::services::auth::{AuthError, TokenError};
use crate::services::orders::OrderError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Malformed or missing request fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate resource.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Illegal state transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository_response(err),
            Self::Auth(err) => auth_response(err),
            Self::Order(err) => order_response(err),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::InvalidState(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(_) => internal(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_owned(),
    )
}

fn repository_response(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => internal(),
    }
}

fn auth_response(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_owned(),
        ),
        AuthError::Token(TokenError::Signing(_)) => internal(),
        AuthError::Token(TokenError::Expired | TokenError::Invalid(_)) => (
            StatusCode::UNAUTHORIZED,
            "Invalid or expired token".to_owned(),
        ),
        AuthError::AccountDisabled => (
            StatusCode::FORBIDDEN,
            "Account is deactivated".to_owned(),
        ),
        AuthError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_owned()),
        AuthError::UserAlreadyExists(msg) => (StatusCode::CONFLICT, msg.clone()),
        AuthError::WeakPassword(msg) | AuthError::InvalidUsername(msg) => {
            (StatusCode::BAD_REQUEST, msg.clone())
        }
        AuthError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "Invalid email address".to_owned()),
        AuthError::EmptyPassword => (StatusCode::BAD_REQUEST, err.to_string()),
        AuthError::Repository(inner) => repository_response(inner),
        AuthError::PasswordHash => internal(),
    }
}

fn order_response(err: &OrderError) -> (StatusCode, String) {
    match err {
        OrderError::Plan(plan) => {
            let status = match plan {
                PlanError::BookNotFound(_) => StatusCode::NOT_FOUND,
                PlanError::InsufficientStock { .. } => StatusCode::CONFLICT,
                PlanError::Overflow
                | PlanError::Empty
                | PlanError::TooManyLines
                | PlanError::InvalidQuantity { .. }
                | PlanError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,
            };
            (status, plan.to_string())
        }
        OrderError::NotFound => (StatusCode::NOT_FOUND, "Order not found".to_owned()),
        OrderError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_owned()),
        OrderError::NotOwner => (
            StatusCode::FORBIDDEN,
            "You do not have access to this order".to_owned(),
        ),
        OrderError::AccountDisabled => (
            StatusCode::FORBIDDEN,
            "Account is deactivated".to_owned(),
        ),
        OrderError::InvalidState(transition) => (
            StatusCode::BAD_REQUEST,
            format!("Order cannot be changed: {transition}"),
        ),
        OrderError::Repository(inner) => repository_response(inner),
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PatchError> for AppError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::Invalid(e) => e.into(),
            PatchError::Repository(RepositoryError::NotFound) => {
                Self::NotFound("Book not found".to_owned())
            }
            PatchError::Repository(e) => e.into(),
        }
    }
}

impl From<AccessLookupError> for AppError {
    fn from(err: AccessLookupError) -> Self {
        match err {
            AccessLookupError::NotFound => Self::NotFound(err.to_string()),
            AccessLookupError::Expired => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
