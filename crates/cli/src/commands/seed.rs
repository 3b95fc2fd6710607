//! Seed the catalog from a YAML file.
//!
//! # File format
//!
//! ```yaml
//! books:
//!   - title: The Rust Programming Language
//!     author: Steve Klabnik and Carol Nichols
//!     category: Programming
//!     rating: 4.8
//!     formats:
//!       - format_type: physical
//!         price: 39.99
//!         stock_quantity: 25
//!       - format_type: digital
//!         price: 19.99
//!         stock_quantity: 1000
//! ```
//!
//! Every entry is validated before the database is touched; one bad entry
//! aborts the whole run.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use bookstore_api::db::{self, BookRepository};
use bookstore_api::models::CreateBookRequest;

use super::migrate::database_url;

/// Top-level layout of a seed file.
#[derive(Debug, Deserialize)]
pub struct BookSeedFile {
    pub books: Vec<CreateBookRequest>,
}

/// Validate every entry, returning one message per problem.
#[must_use]
pub fn validate_seed(seed: &BookSeedFile) -> Vec<String> {
    seed.books
        .iter()
        .enumerate()
        .filter_map(|(i, book)| {
            book.validate()
                .err()
                .map(|e| format!("entry {} ({:?}): {e}", i + 1, book.title))
        })
        .collect()
}

/// Insert the books listed in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or the database rejects an insert.
pub async fn books(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading books from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: BookSeedFile = serde_yaml::from_str(&content)?;

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let database_url = database_url()?;
    let pool = db::create_pool(&database_url, std::time::Duration::from_secs(30)).await?;
    info!("Connected to database");

    let repo = BookRepository::new(&pool);
    for request in &seed.books {
        let book = repo.create(request).await?;
        info!(book_id = %book.id, title = %book.title, formats = book.formats.len(), "Book inserted");
    }

    info!(count = seed.books.len(), "Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_seed_file_is_valid() {
        let content = include_str!("../../seeds/books.yaml");
        let seed: BookSeedFile = serde_yaml::from_str(content).unwrap();

        assert!(!seed.books.is_empty());
        assert!(validate_seed(&seed).is_empty());
    }

    #[test]
    fn test_validate_seed_reports_each_bad_entry() {
        let seed: BookSeedFile = serde_yaml::from_str(
            r"
books:
  - title: No Formats
    author: Someone
    formats: []
  - title: Fine
    author: Someone
    formats:
      - format_type: digital
        price: 9.99
  - title: ''
    author: Someone
    formats:
      - format_type: physical
        price: 5.00
",
        )
        .unwrap();

        let errors = validate_seed(&seed);
        assert_eq!(errors.len(), 2);
        assert!(errors.first().unwrap().starts_with("entry 1"));
        assert!(errors.last().unwrap().starts_with("entry 3"));
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let result: Result<BookSeedFile, _> = serde_yaml::from_str(
            r"
books:
  - title: Free Book
    author: Someone
    formats:
      - format_type: digital
        price: 0
",
        );
        assert!(result.is_err());
    }
}
