#![allow(dead_code)]

use std::path::Path;

use axum_test::TestServer;
use farmlink::configuration::{AuthSettings, DatabaseSettings};
use farmlink::configure_app;
use farmlink::database::setup_database;
use secrecy::Secret;
use serde_json::{json, Value};
use sqlx::SqlitePool;

pub const ADMIN_EMAIL: &str = "admin@farmlink.test";
pub const PASSWORD: &str = "password123";

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        jwt_secret: Secret::new("integration-test-secret".to_string()),
        token_ttl_days: 30,
        admin_emails: vec![ADMIN_EMAIL.to_string()],
    }
}

pub async fn test_pool() -> SqlitePool {
    setup_database(&DatabaseSettings::in_memory())
        .await
        .expect("Failed to set up in-memory database")
}

pub async fn spawn_app() -> TestServer {
    let app = configure_app(test_pool().await, auth_settings());
    TestServer::new(app).expect("Failed to create test server")
}

/// File-backed database with a real connection pool, for tests that need
/// concurrent writers.
pub async fn file_pool(dir: &Path) -> SqlitePool {
    let settings = DatabaseSettings {
        url: format!("sqlite://{}", dir.join("farmlink.db").display()),
        max_connections: 5,
        max_connection_retries: 0,
    };
    setup_database(&settings)
        .await
        .expect("Failed to set up file database")
}

/// Serves the app on an ephemeral port for the HTTP client tests and
/// returns the `/api` base URL.
pub async fn spawn_http() -> String {
    serve(test_pool().await).await
}

pub async fn serve(pool: SqlitePool) -> String {
    let app = configure_app(pool, auth_settings());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });
    format!("http://{addr}/api")
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

pub async fn register(server: &TestServer, name: &str, email: &str) -> TestUser {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "name": name,
            "email": email,
            "password": PASSWORD,
            "phone": "+263 77 000 0000",
            "location": "Harare"
        }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());

    let body: Value = response.json();
    TestUser {
        id: body["user"]["id"].as_str().expect("user id").to_string(),
        email: email.to_string(),
        token: body["token"].as_str().expect("token").to_string(),
    }
}

pub async fn register_admin(server: &TestServer) -> TestUser {
    register(server, "Admin", ADMIN_EMAIL).await
}

pub fn refrigerated_request() -> Value {
    json!({
        "type": "delivery",
        "pickupLocation": {"address": "Harare", "coordinates": {"lat": -17.82, "lng": 31.05}},
        "deliveryLocation": {"address": "Mutare", "coordinates": {"lat": -18.97, "lng": 32.67}},
        "scheduledDate": "2026-11-01T08:00:00Z",
        "items": [{"quantity": 40, "unit": "kg"}],
        "vehicleType": "refrigerated",
        "specialInstructions": "Temperature Controlled, GPS Tracking",
        "price": 250
    })
}

pub fn tomato_listing(quantity: f64) -> Value {
    json!({
        "name": "Roma Tomatoes",
        "description": "Vine ripened",
        "price": 2.5,
        "quantity": quantity,
        "unit": "kg",
        "category": "vegetables",
        "images": ["tomatoes.jpg"],
        "location": {"coordinates": [31.05, -17.82], "address": "Harare"}
    })
}
