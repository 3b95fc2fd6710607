//! Personal library entries (access grants joined with their book).

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use bookstore_core::{AccessId, BookId, FormatId, FormatType, OrderId};

/// One access grant, with the book's title and author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct LibraryItem {
    pub id: AccessId,
    pub book_id: BookId,
    pub format_id: FormatId,
    pub format_type: FormatType,
    pub title: String,
    pub author: String,
    pub order_id: Option<OrderId>,
    pub access_granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub access_url: String,
}

impl LibraryItem {
    /// No expiry, or an expiry still in the future.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Why a single library lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessLookupError {
    #[error("No access found for this book")]
    NotFound,

    #[error("Access has expired")]
    Expired,
}

/// Pick the grant to return from every grant matching a lookup.
///
/// Current grants win over expired ones. Among current grants, one with an
/// access URL beats one without, then the longest-lived wins.
///
/// # Errors
///
/// `NotFound` when there are no candidates, `Expired` when every candidate
/// has lapsed.
pub fn select_access(
    candidates: Vec<LibraryItem>,
    now: DateTime<Utc>,
) -> Result<LibraryItem, AccessLookupError> {
    if candidates.is_empty() {
        return Err(AccessLookupError::NotFound);
    }
    candidates
        .into_iter()
        .filter(|item| item.is_current(now))
        .max_by_key(|item| {
            (
                !item.access_url.is_empty(),
                item.expires_at.unwrap_or(DateTime::<Utc>::MAX_UTC),
            )
        })
        .ok_or(AccessLookupError::Expired)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn grant(expires_in_days: Option<i64>, url: &str) -> LibraryItem {
        let now = Utc::now();
        LibraryItem {
            id: AccessId::generate(),
            book_id: BookId::generate(),
            format_id: FormatId::generate(),
            format_type: if url.is_empty() {
                FormatType::Physical
            } else {
                FormatType::Digital
            },
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            order_id: Some(OrderId::generate()),
            access_granted_at: now,
            expires_at: expires_in_days.map(|d| now + Duration::days(d)),
            access_url: url.to_string(),
        }
    }

    #[test]
    fn test_no_candidates_is_not_found() {
        assert_eq!(
            select_access(Vec::new(), Utc::now()),
            Err(AccessLookupError::NotFound)
        );
    }

    #[test]
    fn test_only_expired_is_expired() {
        let candidates = vec![grant(Some(-1), "https://x/1"), grant(Some(-30), "https://x/2")];
        assert_eq!(
            select_access(candidates, Utc::now()),
            Err(AccessLookupError::Expired)
        );
    }

    #[test]
    fn test_current_grant_beats_expired() {
        let current = grant(Some(10), "https://x/current");
        let candidates = vec![grant(Some(-1), "https://x/old"), current.clone()];
        assert_eq!(select_access(candidates, Utc::now()).unwrap(), current);
    }

    #[test]
    fn test_digital_grant_preferred_over_physical() {
        let digital = grant(Some(100), "https://x/digital");
        let candidates = vec![grant(None, ""), digital.clone()];
        assert_eq!(select_access(candidates, Utc::now()).unwrap(), digital);
    }

    #[test]
    fn test_perpetual_grant_is_current() {
        let physical = grant(None, "");
        assert!(physical.is_current(Utc::now()));
        assert_eq!(
            select_access(vec![physical.clone()], Utc::now()).unwrap(),
            physical
        );
    }

    #[test]
    fn test_expired_error_message() {
        assert_eq!(AccessLookupError::Expired.to_string(), "Access has expired");
    }
}
