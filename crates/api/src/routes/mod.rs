//! HTTP route handlers for the bookstore API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (database reachable)
//!
//! # Auth
//! POST /auth/register                  - Create a customer account
//! POST /auth/login                     - Exchange credentials for a token
//! GET  /auth/profile                   - Caller's profile (auth)
//! PUT  /auth/profile                   - Update username/email (auth)
//!
//! # Catalog
//! GET  /books?search=                  - Catalog listing
//! GET  /books/{id}                     - Book with formats
//! GET  /digital-books                  - Digital formats in stock
//!
//! # Orders (auth)
//! POST   /orders                       - Place an order
//! GET    /orders                       - Caller's orders
//! GET    /orders/{id}                  - One order (owner or staff)
//! DELETE /orders/{id}                  - Cancel a pending order (owner)
//!
//! # Library (auth)
//! GET  /library                        - Current grants
//! GET  /library/{id}                   - Grant by book or format id
//!
//! # Admin
//! POST   /admin/books                  - Create book (staff)
//! PUT    /admin/books/{id}             - Patch book (staff)
//! DELETE /admin/books/{id}             - Delete book (staff)
//! GET    /admin/stats                  - Store statistics (staff)
//! GET    /admin/users                  - User listing (staff)
//! GET    /admin/users/{id}             - One user (staff)
//! PUT    /admin/users/{id}/role        - Change role (admin)
//! PUT    /admin/users/{id}/premium     - Grant premium (admin)
//! PUT    /admin/users/{id}/deactivate  - Deactivate (admin)
//! PUT    /admin/users/{id}/loyalty     - Override points (admin)
//! DELETE /admin/users/{id}             - Delete user (admin)
//! GET    /admin/orders                 - All orders (staff)
//! PUT    /admin/orders/{id}/status     - Complete or cancel (admin)
//! PUT    /admin/orders/{id}/delivery   - Delivery progress (admin)
//! ```

pub mod admin;
pub mod auth;
pub mod books;
pub mod library;
pub mod orders;

use axum::{
    Router,
    extract::State,
    http::{
        HeaderValue, Method, Request, Response, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/profile", get(auth::profile).put(auth::update_profile))
}

/// Create the public catalog routes router.
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(books::list))
        .route("/{id}", get(books::show))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list).post(orders::create))
        .route("/{id}", get(orders::show).delete(orders::cancel))
}

/// Create the library routes router.
pub fn library_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(library::list))
        .route("/{id}", get(library::show))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin::stats))
        .route("/books", post(books::create))
        .route("/books/{id}", put(books::update).delete(books::delete))
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            get(admin::show_user).delete(admin::delete_user),
        )
        .route("/users/{id}/role", put(admin::set_role))
        .route("/users/{id}/premium", put(admin::grant_premium))
        .route("/users/{id}/deactivate", put(admin::deactivate_user))
        .route("/users/{id}/loyalty", put(admin::set_loyalty))
        .route("/orders", get(admin::list_orders))
        .route("/orders/{id}/status", put(admin::set_order_status))
        .route("/orders/{id}/delivery", put(admin::update_delivery))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/auth", auth_routes())
        .nest("/books", book_routes())
        .route("/digital-books", get(books::digital))
        .nest("/orders", order_routes())
        .nest("/library", library_routes())
        .nest("/admin", admin_routes())
}

/// Build the complete application: routes, middleware and state.
///
/// Layers, innermost first: CORS, timeout, request ID, tracing, then the
/// Sentry layers around everything.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origins);
    let timeout = state.config().request_timeout;

    routes()
        .layer(cors)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for browser clients. An empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
