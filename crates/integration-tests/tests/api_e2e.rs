//! End-to-end tests against a running API server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`bookstore-cli migrate`)
//! - The API server running (`cargo run -p bookstore-api`)
//! - `BOOKSTORE_DATABASE_URL` pointing at the same database, used to promote
//!   a test user to admin and to insert rows the API cannot create
//!
//! Run with: `cargo test -p bookstore-integration-tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bookstore_api::db::UserRepository;
use bookstore_core::{Role, UserId};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
fn api_base_url() -> String {
    std::env::var("BOOKSTORE_API_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
}

async fn database() -> PgPool {
    let url = std::env::var("BOOKSTORE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("BOOKSTORE_DATABASE_URL must be set");
    PgPool::connect(&url).await.expect("Failed to connect to database")
}

struct TestUser {
    id: UserId,
    email: String,
    token: String,
}

/// Register a fresh account and log in.
async fn register_and_login(client: &Client, prefix: &str) -> TestUser {
    let base_url = api_base_url();
    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("{prefix}-{suffix}");
    let email = format!("{prefix}-{suffix}@example.com");
    let password = "correct-horse-battery";

    let resp = client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({ "username": username, "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let registered: Value = resp.json().await.unwrap();
    assert_eq!(registered["role"], "customer");
    let id: UserId = serde_json::from_value(registered["id"].clone()).unwrap();

    let token = login(client, &email, password).await;
    TestUser { id, email, token }
}

async fn login(client: &Client, email: &str, password: &str) -> String {
    let resp = client
        .post(format!("{}/auth/login", api_base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_owned()
}

/// Register a user, promote it to admin directly in the database and log in
/// again so the token carries the new role.
async fn admin_user(client: &Client, pool: &PgPool) -> TestUser {
    let base_url = api_base_url();
    let suffix = Uuid::new_v4().simple().to_string();
    let email = format!("admin-{suffix}@example.com");
    let password = "admin-password-1";

    let resp = client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({ "username": format!("admin-{suffix}"), "email": email, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let id: UserId = serde_json::from_value(body["id"].clone()).unwrap();

    UserRepository::new(pool)
        .set_role(id, Role::Admin)
        .await
        .expect("Failed to promote admin");

    let token = login(client, &email, password).await;
    TestUser { id, email, token }
}

async fn create_book(client: &Client, admin: &TestUser, title: &str) -> Value {
    let resp = client
        .post(format!("{}/admin/books", api_base_url()))
        .bearer_auth(&admin.token)
        .json(&json!({
            "title": title,
            "author": "Integration Author",
            "category": "Testing",
            "rating": "4.5",
            "formats": [
                { "format_type": "physical", "price": "20.00", "stock_quantity": 5 },
                { "format_type": "digital", "price": "10.00", "stock_quantity": 100 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.unwrap()
}

async fn physical_stock(client: &Client, book_id: &str) -> i64 {
    let resp = client
        .get(format!("{}/books/{book_id}", api_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let book: Value = resp.json().await.unwrap();
    book["formats"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["format_type"] == "physical")
        .unwrap()["stock_quantity"]
        .as_i64()
        .unwrap()
}

async fn my_orders(client: &Client, user: &TestUser) -> Vec<Value> {
    let resp = client
        .get(format!("{}/orders", api_base_url()))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.unwrap()
}

async fn delete_user(client: &Client, admin: &TestUser, id: UserId) {
    let _ = client
        .delete(format!("{}/admin/users/{id}", api_base_url()))
        .bearer_auth(&admin.token)
        .send()
        .await;
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
#[ignore = "Requires running bookstore API and PostgreSQL"]
async fn test_register_login_profile() {
    let client = Client::new();
    let user = register_and_login(&client, "profile").await;

    let resp = client
        .get(format!("{}/auth/profile", api_base_url()))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let profile: Value = resp.json().await.unwrap();
    assert_eq!(profile["loyalty_points"], 0);
    assert_eq!(profile["loyalty_tier"], "Bronze");
    assert_eq!(profile["premium_active"], false);
}

#[tokio::test]
#[ignore = "Requires running bookstore API and PostgreSQL"]
async fn test_duplicate_registration_conflicts() {
    let client = Client::new();
    let base_url = api_base_url();
    let email = format!("dup-{}@example.com", Uuid::new_v4().simple());

    let first = client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({ "username": format!("a-{email}"), "email": email, "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({ "username": format!("b-{email}"), "email": email, "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let same_username = client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({
            "username": format!("a-{email}"),
            "email": format!("other-{email}"),
            "password": "secret1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(same_username.status(), StatusCode::CONFLICT);
    let body: Value = same_username.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("username"));

    let pool = database().await;
    sqlx::query("DELETE FROM bookstore.users WHERE email = $1")
        .bind(&email)
        .execute(&pool)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "Requires running bookstore API and PostgreSQL"]
async fn test_wrong_password_is_unauthorized() {
    let client = Client::new();
    let pool = database().await;
    let user = register_and_login(&client, "badpass").await;

    let mut bodies = Vec::new();
    for (email, password) in [
        (user.email.as_str(), "not-the-password"),
        ("nobody@example.com", "whatever"),
    ] {
        let resp = client
            .post(format!("{}/auth/login", api_base_url()))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        bodies.push(resp.json::<Value>().await.unwrap());
    }

    assert_eq!(bodies[0]["error"], "Invalid email or password");
    assert_eq!(bodies[0], bodies[1]);

    UserRepository::new(&pool).delete(user.id).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running bookstore API and PostgreSQL"]
async fn test_order_history_is_not_capped() {
    let client = Client::new();
    let pool = database().await;
    let user = register_and_login(&client, "history").await;

    sqlx::query(
        "INSERT INTO bookstore.orders (id, user_id, total_amount, item_count) \
         SELECT gen_random_uuid(), $1, 1.00, 1 FROM generate_series(1, 101)",
    )
    .bind(Uuid::from(user.id))
    .execute(&pool)
    .await
    .unwrap();

    assert_eq!(my_orders(&client, &user).await.len(), 101);

    UserRepository::new(&pool).delete(user.id).await.unwrap();
}

// ============================================================================
// Orders & Library
// ============================================================================

#[tokio::test]
#[ignore = "Requires running bookstore API and PostgreSQL"]
async fn test_order_lifecycle() {
    let client = Client::new();
    let base_url = api_base_url();
    let pool = database().await;

    let admin = admin_user(&client, &pool).await;
    let customer = register_and_login(&client, "buyer").await;
    let stranger = register_and_login(&client, "stranger").await;

    let marker = Uuid::new_v4().simple().to_string();
    let title = format!("E2E Book {marker}");
    let book = create_book(&client, &admin, &title).await;
    let book_id = book["id"].as_str().unwrap().to_owned();

    // Public catalog search finds it
    let resp = client
        .get(format!("{base_url}/books?search={}", marker.to_uppercase()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let listing: Value = resp.json().await.unwrap();
    assert_eq!(listing["count"], 1);

    // Place an order: 2 physical + 1 digital at bronze (no discount)
    let resp = client
        .post(format!("{base_url}/orders"))
        .bearer_auth(&customer.token)
        .json(&json!({
            "items": [
                { "book_id": book_id, "format_type": "physical", "quantity": 2 },
                { "book_id": book_id, "format_type": "digital", "quantity": 1 }
            ],
            "delivery_address": "1 Test Street"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let placed: Value = resp.json().await.unwrap();
    assert_eq!(placed["raw_total"], "50.00");
    assert_eq!(placed["total_amount"], "50.00");
    assert!(placed["points_awarded"].as_i64().unwrap() > 0);
    let order_id = placed["order_id"].as_str().unwrap().to_owned();

    // Stock went down
    assert_eq!(physical_stock(&client, &book_id).await, 3);

    // Over-ordering is a conflict and changes nothing
    let orders_before = my_orders(&client, &customer).await.len();
    let resp = client
        .post(format!("{base_url}/orders"))
        .bearer_auth(&customer.token)
        .json(&json!({
            "items": [{ "book_id": book_id, "format_type": "physical", "quantity": 4 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(my_orders(&client, &customer).await.len(), orders_before);
    assert_eq!(physical_stock(&client, &book_id).await, 3);

    // Library access by book id
    let resp = client
        .get(format!("{base_url}/library/{book_id}"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Another customer cannot see the order
    let resp = client
        .get(format!("{base_url}/orders/{order_id}"))
        .bearer_auth(&stranger.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Staff can
    let resp = client
        .get(format!("{base_url}/orders/{order_id}"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Nor cancel it
    let resp = client
        .delete(format!("{base_url}/orders/{order_id}"))
        .bearer_auth(&stranger.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Owner cancels once; the second attempt is an invalid transition
    let resp = client
        .delete(format!("{base_url}/orders/{order_id}"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled: Value = resp.json().await.unwrap();
    assert_eq!(cancelled["order"]["status"], "cancelled");

    let resp = client
        .delete(format!("{base_url}/orders/{order_id}"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Cleanup
    let _ = client
        .delete(format!("{base_url}/admin/books/{book_id}"))
        .bearer_auth(&admin.token)
        .send()
        .await;
    delete_user(&client, &admin, customer.id).await;
    delete_user(&client, &admin, stranger.id).await;
    UserRepository::new(&pool).delete(admin.id).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running bookstore API and PostgreSQL"]
async fn test_expired_grants_leave_the_library() {
    let client = Client::new();
    let base_url = api_base_url();
    let pool = database().await;
    let user = register_and_login(&client, "expired").await;

    let book_id = Uuid::new_v4();
    let grant_id: Uuid = sqlx::query_scalar(
        "INSERT INTO bookstore.digital_access \
             (user_id, book_id, format_id, format_type, expires_at) \
         VALUES ($1, $2, $3, 'digital', NOW() - INTERVAL '1 day') \
         RETURNING id",
    )
    .bind(Uuid::from(user.id))
    .bind(book_id)
    .bind(Uuid::new_v4())
    .fetch_one(&pool)
    .await
    .unwrap();

    let resp = client
        .get(format!("{base_url}/library"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let library: Value = resp.json().await.unwrap();
    assert_eq!(library["count"], 0);
    assert!(
        library["items"]
            .as_array()
            .unwrap()
            .iter()
            .all(|item| item["id"] != grant_id.to_string())
    );

    let resp = client
        .get(format!("{base_url}/library/{book_id}"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    UserRepository::new(&pool).delete(user.id).await.unwrap();
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
#[ignore = "Requires running bookstore API and PostgreSQL"]
async fn test_admin_premium_and_loyalty() {
    let client = Client::new();
    let base_url = api_base_url();
    let pool = database().await;

    let admin = admin_user(&client, &pool).await;
    let customer = register_and_login(&client, "member").await;

    let resp = client
        .put(format!("{base_url}/admin/users/{}/premium", customer.id))
        .bearer_auth(&admin.token)
        .json(&json!({ "days": 30 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["is_premium"], true);
    assert_eq!(user["premium_active"], true);

    let resp = client
        .put(format!("{base_url}/admin/users/{}/loyalty", customer.id))
        .bearer_auth(&admin.token)
        .json(&json!({ "points": 1500 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["loyalty_points"], 1500);
    assert_ne!(user["loyalty_tier"], "Bronze");

    let resp = client
        .get(format!("{base_url}/admin/users/{}", customer.id))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let shown: Value = resp.json().await.unwrap();
    assert_eq!(shown["loyalty_tier"], user["loyalty_tier"]);
    assert_eq!(shown["premium_active"], true);

    let resp = client
        .get(format!("{base_url}/auth/profile"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .unwrap();
    let profile: Value = resp.json().await.unwrap();
    assert_eq!(profile["premium_active"], true);
    assert_eq!(profile["loyalty_points"], 1500);
    assert_ne!(profile["loyalty_tier"], "Bronze");

    let resp = client
        .get(format!("{base_url}/admin/stats"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Value = resp.json().await.unwrap();
    assert!(stats["premium_users"].as_i64().unwrap() >= 1);

    delete_user(&client, &admin, customer.id).await;
    UserRepository::new(&pool).delete(admin.id).await.unwrap();
}
