//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! bookstore-cli user create -u admin -e admin@example.com -p 'S3cure!pass' -r admin
//! ```
//!
//! # Environment Variables
//!
//! - `BOOKSTORE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use std::time::Duration;

use bookstore_api::db;
use bookstore_api::services::{AuthError, NewAccount, create_account};
use bookstore_core::Role;
use thiserror::Error;

use super::migrate::{MigrationError, database_url};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserCommandError {
    /// Database URL could not be resolved.
    #[error("{0}")]
    Config(#[from] MigrationError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: customer, moderator, admin")]
    InvalidRole(String),

    /// Account could not be created.
    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Create a user with the given role.
///
/// Applies the same username, email and password rules as registration,
/// before connecting to the database.
///
/// # Errors
///
/// Returns `UserCommandError` if the role is unknown, the input is invalid,
/// or the username or email is taken.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<(), UserCommandError> {
    let role: Role = role
        .parse()
        .map_err(|_| UserCommandError::InvalidRole(role.to_owned()))?;
    let account = NewAccount::new(username, email, password)?;

    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url, Duration::from_secs(30)).await?;

    let user = create_account(&pool, &account, role).await?;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        email = %user.email,
        role = %user.role,
        "User created"
    );
    Ok(())
}
