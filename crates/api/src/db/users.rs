//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bookstore_core::{Email, Role, UserId};

use super::{LIST_LIMIT, RepositoryError, map_unique_violation};
use crate::models::user::{User, UserWithPassword};

pub(crate) const USER_COLUMNS: &str = "id, username, email, role, is_premium, premium_until, \
     loyalty_points, is_active, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username or email is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        username: &str,
        email: &Email,
        password_hash: &str,
        role: Role,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO bookstore.users (username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(map_unique_violation)
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM bookstore.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<UserWithPassword>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPassword>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM bookstore.users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Update username and/or email. `None` keeps the stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new username or email is taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        username: Option<&str>,
        email: Option<&Email>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE bookstore.users \
             SET username = COALESCE($2, username), email = COALESCE($3, email) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(username)
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(map_unique_violation)?
        .ok_or(RepositoryError::NotFound)
    }

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM bookstore.users ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(LIST_LIMIT)
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        self.update_returning("role = $2", id, role).await
    }

    /// Mark a user premium until `until`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn grant_premium(
        &self,
        id: UserId,
        until: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        self.update_returning("is_premium = TRUE, premium_until = $2", id, until)
            .await
    }

    /// Deactivate a user. Deactivated users cannot log in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn deactivate(&self, id: UserId) -> Result<User, RepositoryError> {
        self.update_returning("is_active = $2", id, false).await
    }

    /// Overwrite a user's loyalty balance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_loyalty_points(
        &self,
        id: UserId,
        points: i64,
    ) -> Result<User, RepositoryError> {
        self.update_returning("loyalty_points = $2", id, points)
            .await
    }

    /// Delete a user. Their orders and grants are removed with them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bookstore.users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_returning<T>(
        &self,
        assignments: &str,
        id: UserId,
        value: T,
    ) -> Result<User, RepositoryError>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send + 'static,
    {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE bookstore.users SET {assignments} WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(value)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
