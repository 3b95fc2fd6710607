//! HTTP middleware and request extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. Timeout
//! 5. CORS
//!
//! Authentication is not a layer: handlers opt in with the extractors in
//! [`auth`].

pub mod auth;
pub mod request_id;

pub use auth::{AuthRejection, RequireAdmin, RequireAuth, RequireStaff};
pub use request_id::request_id_middleware;
