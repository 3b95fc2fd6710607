//! Personal library route handlers.

use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::LibraryRepository;
use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::library::{LibraryItem, select_access};
use crate::state::AppState;

/// The caller's library.
#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub items: Vec<LibraryItem>,
    pub count: usize,
}

/// `GET /library`
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(ctx): RequireAuth,
) -> Result<Json<LibraryResponse>> {
    let items = LibraryRepository::new(state.pool())
        .personal_library(ctx.user_id)
        .await?;
    Ok(Json(LibraryResponse {
        count: items.len(),
        items,
    }))
}

/// `GET /library/{id}`
///
/// `id` may be a book id or a format id.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(ctx): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<LibraryItem>> {
    let candidates = LibraryRepository::new(state.pool())
        .grants_matching(ctx.user_id, id)
        .await?;
    Ok(Json(select_access(candidates, Utc::now())?))
}
