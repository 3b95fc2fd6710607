//! Catalog route handlers.
//!
//! Browsing is public; creating, editing and deleting books needs a staff
//! token.

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use bookstore_core::BookId;

use crate::db::{BookRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireStaff;
use crate::models::book::{Book, BookPatch, CreateBookRequest, DigitalCatalogEntry};
use crate::state::AppState;

/// Query parameters for the catalog listing.
#[derive(Debug, Default, Deserialize)]
pub struct BookQuery {
    pub search: Option<String>,
}

/// Catalog listing.
#[derive(Debug, Serialize)]
pub struct BookList {
    pub books: Vec<Book>,
    pub count: usize,
}

/// `GET /books`
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Result<Json<BookList>> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let books = BookRepository::new(state.pool()).list(search).await?;
    Ok(Json(BookList {
        count: books.len(),
        books,
    }))
}

/// `GET /books/{id}`
pub async fn show(State(state): State<AppState>, Path(id): Path<BookId>) -> Result<Json<Book>> {
    BookRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Book not found".to_owned()))
}

/// `GET /digital-books`
pub async fn digital(State(state): State<AppState>) -> Result<Json<Vec<DigitalCatalogEntry>>> {
    let entries = BookRepository::new(state.pool())
        .list_available_digital()
        .await?;
    Ok(Json(entries))
}

/// `POST /admin/books`
#[instrument(skip_all, fields(staff_id = %staff.user_id, title = %request.title))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(request): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<Book>)> {
    request.validate()?;

    let book = BookRepository::new(state.pool()).create(&request).await?;
    tracing::info!(book_id = %book.id, "Book created");

    Ok((StatusCode::CREATED, Json(book)))
}

/// `PUT /admin/books/{id}`
#[instrument(skip_all, fields(staff_id = %staff.user_id, book_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<BookId>,
    Json(patch): Json<BookPatch>,
) -> Result<Json<Book>> {
    let book = BookRepository::new(state.pool()).update(id, &patch).await?;
    tracing::info!("Book updated");
    Ok(Json(book))
}

/// `DELETE /admin/books/{id}`
#[instrument(skip_all, fields(staff_id = %staff.user_id, book_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<BookId>,
) -> Result<Json<Value>> {
    BookRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Book not found".to_owned()),
            other => other.into(),
        })?;

    tracing::info!("Book deleted");
    Ok(Json(json!({ "message": "Book deleted successfully" })))
}
