//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, profile updates and bearer tokens
//! - `orders` - Order placement, cancellation and admin status changes

pub mod auth;
pub mod orders;

pub use auth::{AuthError, AuthService, NewAccount, TokenManager, create_account};
pub use orders::{OrderError, OrderService};
