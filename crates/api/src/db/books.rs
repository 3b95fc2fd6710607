//! Catalog repository: books and their formats.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use bookstore_core::BookId;

use super::{LIST_LIMIT, RepositoryError, escape_like, map_unique_violation};
use crate::models::book::{Book, BookFormat, BookPatch, CreateBookRequest, DigitalCatalogEntry};

const BOOK_COLUMNS: &str = "id, title, author, description, image_url, published_year, isbn, \
     category, rating, created_at, updated_at";

const FORMAT_COLUMNS: &str = "id, book_id, format_type, price, stock_quantity";

/// Failure while applying a catalog patch.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error(transparent)]
    Invalid(#[from] crate::models::book::CatalogError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Repository for catalog database operations.
pub struct BookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookRepository<'a> {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List books, newest first, optionally filtered by a case-insensitive
    /// substring of the title or author.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Book>, RepositoryError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let mut books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM bookstore.books \
             WHERE $1::text IS NULL OR title ILIKE $1 OR author ILIKE $1 \
             ORDER BY created_at DESC \
             LIMIT $2"
        ))
        .bind(pattern)
        .bind(LIST_LIMIT)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<BookId> = books.iter().map(|b| b.id).collect();
        let formats = sqlx::query_as::<_, BookFormat>(&format!(
            "SELECT {FORMAT_COLUMNS} FROM bookstore.book_formats \
             WHERE book_id = ANY($1) \
             ORDER BY format_type"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_book: HashMap<BookId, Vec<BookFormat>> = HashMap::new();
        for format in formats {
            by_book.entry(format.book_id).or_default().push(format);
        }
        for book in &mut books {
            book.formats = by_book.remove(&book.id).unwrap_or_default();
        }
        Ok(books)
    }

    /// Get a book with its formats.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_book(&mut conn, id, false).await
    }

    /// Create a book and its formats in one transaction.
    ///
    /// The request must already be validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn create(&self, request: &CreateBookRequest) -> Result<Book, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut book = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO bookstore.books \
                 (title, author, description, image_url, published_year, isbn, category, rating) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(request.title.trim())
        .bind(request.author.trim())
        .bind(request.description.trim())
        .bind(request.image_url.trim())
        .bind(request.published_year)
        .bind(request.isbn.trim())
        .bind(request.category.trim())
        .bind(request.rating)
        .fetch_one(&mut *tx)
        .await?;

        for format in &request.formats {
            let row = sqlx::query_as::<_, BookFormat>(&format!(
                "INSERT INTO bookstore.book_formats (book_id, format_type, price, stock_quantity) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING {FORMAT_COLUMNS}"
            ))
            .bind(book.id)
            .bind(format.format_type)
            .bind(format.price)
            .bind(format.stock_quantity)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_unique_violation)?;
            book.formats.push(row);
        }

        tx.commit().await?;
        Ok(book)
    }

    /// Apply a partial update under row locks so concurrent orders cannot
    /// interleave with the stock rewrite.
    ///
    /// # Errors
    ///
    /// Returns `PatchError::Invalid` if the patch is rejected and
    /// `RepositoryError::NotFound` if the book doesn't exist.
    pub async fn update(&self, id: BookId, patch: &BookPatch) -> Result<Book, PatchError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let mut book = fetch_book(&mut tx, id, true)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        patch.apply(&mut book)?;

        let updated = sqlx::query_as::<_, Book>(&format!(
            "UPDATE bookstore.books \
             SET title = $2, author = $3, description = $4, image_url = $5, \
                 published_year = $6, isbn = $7, category = $8, rating = $9 \
             WHERE id = $1 \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(&book.image_url)
        .bind(book.published_year)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(book.rating)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        let mut formats = Vec::with_capacity(book.formats.len());
        for format in &book.formats {
            let row = sqlx::query_as::<_, BookFormat>(&format!(
                "INSERT INTO bookstore.book_formats (id, book_id, format_type, price, stock_quantity) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (book_id, format_type) \
                 DO UPDATE SET price = EXCLUDED.price, stock_quantity = EXCLUDED.stock_quantity \
                 RETURNING {FORMAT_COLUMNS}"
            ))
            .bind(format.id)
            .bind(format.book_id)
            .bind(format.format_type)
            .bind(format.price)
            .bind(format.stock_quantity)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_unique_violation)?;
            formats.push(row);
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(Book { formats, ..updated })
    }

    /// Delete a book and its formats.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book doesn't exist.
    pub async fn delete(&self, id: BookId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bookstore.books WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Digital and bundled formats with stock, by title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_available_digital(&self) -> Result<Vec<DigitalCatalogEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, DigitalCatalogEntry>(
            "SELECT b.id AS book_id, b.title, b.author, b.image_url, \
                    f.id AS format_id, f.format_type, f.price, f.stock_quantity \
             FROM bookstore.book_formats f \
             JOIN bookstore.books b ON b.id = f.book_id \
             WHERE f.format_type IN ('digital', 'both') AND f.stock_quantity > 0 \
             ORDER BY b.title, f.format_type",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(entries)
    }
}

/// Load a book and its formats on an existing connection, optionally
/// locking the rows for update.
async fn fetch_book(
    conn: &mut PgConnection,
    id: BookId,
    for_update: bool,
) -> Result<Option<Book>, RepositoryError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };

    let Some(mut book) = sqlx::query_as::<_, Book>(&format!(
        "SELECT {BOOK_COLUMNS} FROM bookstore.books WHERE id = $1{lock}"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    book.formats = sqlx::query_as::<_, BookFormat>(&format!(
        "SELECT {FORMAT_COLUMNS} FROM bookstore.book_formats \
         WHERE book_id = $1 ORDER BY format_type{lock}"
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(book))
}
