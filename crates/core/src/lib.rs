//! Bookstore Core - Domain types and business rules.
//!
//! This crate provides the types and pure rules shared by the bookstore components:
//! - `api` - The HTTP/JSON service
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Everything that decides *what* an order costs or *which*
//! status transitions are legal lives here so it can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`loyalty`] - Loyalty tier bands and their discounts
//! - [`pricing`] - Order validation and pricing against a catalog snapshot

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod loyalty;
pub mod pricing;
pub mod types;

pub use loyalty::LoyaltyTier;
pub use pricing::{
    AccessGrant, CatalogSnapshot, LineRequest, OrderPlan, PlanError, PlannedLine, Purchaser,
    StockedFormat,
};
pub use types::*;
