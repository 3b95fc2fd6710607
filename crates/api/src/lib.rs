//! Bookstore API library.
//!
//! Accounts, catalog, orders with tiered loyalty pricing, and a digital
//! library, served over HTTP/JSON. The binary in `main.rs` is a thin shell
//! around [`routes::app`]; the CLI and integration tests use the same
//! pieces.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
