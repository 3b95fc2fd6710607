//! Catalog types: books, their formats, and create/patch requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bookstore_core::{BookId, FormatId, FormatType, Price};

/// Highest allowed book rating.
const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Catalog input that cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("a book needs at least one format")]
    NoFormats,

    #[error("format {0} is listed more than once")]
    DuplicateFormat(FormatType),

    #[error("stock for format {0} cannot be negative")]
    NegativeStock(FormatType),

    #[error("new format {0} needs a price")]
    MissingPrice(FormatType),

    #[error("rating must be between 0 and 5")]
    InvalidRating,
}

/// A purchasable format of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BookFormat {
    pub id: FormatId,
    #[serde(skip)]
    pub book_id: BookId,
    pub format_type: FormatType,
    pub price: Price,
    pub stock_quantity: i32,
}

/// A catalog entry with its formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub image_url: String,
    pub published_year: Option<i32>,
    pub isbn: String,
    pub category: String,
    pub rating: Decimal,
    #[sqlx(skip)]
    pub formats: Vec<BookFormat>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    #[must_use]
    pub fn format(&self, format_type: FormatType) -> Option<&BookFormat> {
        self.formats.iter().find(|f| f.format_type == format_type)
    }
}

/// One digital (or bundled) format currently in stock, for `GET /digital-books`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DigitalCatalogEntry {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub image_url: String,
    pub format_id: FormatId,
    pub format_type: FormatType,
    pub price: Price,
    pub stock_quantity: i32,
}

/// Format entry in a create request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFormat {
    pub format_type: FormatType,
    pub price: Price,
    #[serde(default)]
    pub stock_quantity: i32,
}

/// Body of `POST /admin/books`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub published_year: Option<i32>,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rating: Decimal,
    pub formats: Vec<NewFormat>,
}

impl CreateBookRequest {
    /// Check required fields, rating range and the format list.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::MissingField("title"));
        }
        if self.author.trim().is_empty() {
            return Err(CatalogError::MissingField("author"));
        }
        validate_rating(self.rating)?;
        if self.formats.is_empty() {
            return Err(CatalogError::NoFormats);
        }
        for (i, format) in self.formats.iter().enumerate() {
            if format.stock_quantity < 0 {
                return Err(CatalogError::NegativeStock(format.format_type));
            }
            if self
                .formats
                .iter()
                .take(i)
                .any(|f| f.format_type == format.format_type)
            {
                return Err(CatalogError::DuplicateFormat(format.format_type));
            }
        }
        Ok(())
    }
}

/// Format entry in a patch request.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatPatch {
    pub format_type: FormatType,
    pub price: Option<Price>,
    pub stock_quantity: Option<i32>,
}

/// Body of `PUT /admin/books/{id}`.
///
/// Only non-blank strings and non-zero numbers overwrite; everything else is
/// left as stored. Formats are matched by type and can be added but never
/// removed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub published_year: Option<i32>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub rating: Option<Decimal>,
    pub formats: Option<Vec<FormatPatch>>,
}

impl BookPatch {
    /// Merge the patch into `book`.
    ///
    /// Nothing is modified when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for negative stock, an out-of-range rating, or
    /// a new format without a price.
    pub fn apply(&self, book: &mut Book) -> Result<(), CatalogError> {
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        let formats = self.merged_formats(book)?;

        overwrite(&mut book.title, self.title.as_deref());
        overwrite(&mut book.author, self.author.as_deref());
        overwrite(&mut book.description, self.description.as_deref());
        overwrite(&mut book.image_url, self.image_url.as_deref());
        overwrite(&mut book.isbn, self.isbn.as_deref());
        overwrite(&mut book.category, self.category.as_deref());
        if let Some(year) = self.published_year.filter(|y| *y != 0) {
            book.published_year = Some(year);
        }
        if let Some(rating) = self.rating.filter(|r| !r.is_zero()) {
            book.rating = rating;
        }
        book.formats = formats;
        Ok(())
    }

    fn merged_formats(&self, book: &Book) -> Result<Vec<BookFormat>, CatalogError> {
        let mut formats = book.formats.clone();
        for patch in self.formats.iter().flatten() {
            let stock = patch.stock_quantity.filter(|s| *s != 0);
            if stock.is_some_and(i32::is_negative) {
                return Err(CatalogError::NegativeStock(patch.format_type));
            }

            if let Some(existing) = formats
                .iter_mut()
                .find(|f| f.format_type == patch.format_type)
            {
                if let Some(price) = patch.price {
                    existing.price = price;
                }
                if let Some(stock) = stock {
                    existing.stock_quantity = stock;
                }
            } else {
                let price = patch
                    .price
                    .ok_or(CatalogError::MissingPrice(patch.format_type))?;
                formats.push(BookFormat {
                    id: FormatId::generate(),
                    book_id: book.id,
                    format_type: patch.format_type,
                    price,
                    stock_quantity: stock.unwrap_or(0),
                });
            }
        }
        Ok(formats)
    }
}

fn overwrite(field: &mut String, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        value.clone_into(field);
    }
}

fn validate_rating(rating: Decimal) -> Result<(), CatalogError> {
    if rating.is_sign_negative() || rating > MAX_RATING {
        return Err(CatalogError::InvalidRating);
    }
    Ok(())
}
