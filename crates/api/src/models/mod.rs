//! Domain models and request/response types for the API.
//!
//! Row types derive `sqlx::FromRow` and are read with runtime-checked queries;
//! request types derive `Deserialize` and validate themselves before any
//! repository call.

pub mod book;
pub mod library;
pub mod order;
pub mod session;
pub mod user;

pub use book::{
    Book, BookFormat, BookPatch, CatalogError, CreateBookRequest, DigitalCatalogEntry, FormatPatch,
    NewFormat,
};
pub use library::{AccessLookupError, LibraryItem, select_access};
pub use order::{CreateOrderRequest, Order, OrderItem, OrderWithItems, PlacedOrder};
pub use session::AuthContext;
pub use user::{User, UserProfile, UserWithPassword};
