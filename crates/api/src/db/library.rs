//! Library repository: a user's access grants.

use sqlx::PgPool;
use uuid::Uuid;

use bookstore_core::UserId;

use super::RepositoryError;
use crate::models::library::LibraryItem;

const LIBRARY_SELECT: &str = "SELECT a.id, a.book_id, a.format_id, a.format_type, \
            COALESCE(b.title, '') AS title, COALESCE(b.author, '') AS author, \
            a.order_id, a.access_granted_at, a.expires_at, a.access_url \
     FROM bookstore.digital_access a \
     LEFT JOIN bookstore.books b ON b.id = a.book_id";

/// Repository for library reads.
pub struct LibraryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LibraryRepository<'a> {
    /// Create a new library repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's unexpired grants, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn personal_library(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LibraryItem>, RepositoryError> {
        let items = sqlx::query_as::<_, LibraryItem>(&format!(
            "{LIBRARY_SELECT} \
             WHERE a.user_id = $1 AND (a.expires_at IS NULL OR a.expires_at > NOW()) \
             ORDER BY a.access_granted_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Every grant of a user (expired or not) matching a book id or a
    /// format id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn grants_matching(
        &self,
        user_id: UserId,
        book_or_format_id: Uuid,
    ) -> Result<Vec<LibraryItem>, RepositoryError> {
        let items = sqlx::query_as::<_, LibraryItem>(&format!(
            "{LIBRARY_SELECT} \
             WHERE a.user_id = $1 AND (a.book_id = $2 OR a.format_id = $2)"
        ))
        .bind(user_id)
        .bind(book_or_format_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }
}
