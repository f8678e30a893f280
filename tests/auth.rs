mod common;

use serde_json::{json, Value};

#[tokio::test]
async fn register_returns_token_and_public_profile() {
    let server = common::spawn_app().await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "name": "Tendai Moyo",
            "email": "Tendai@Example.com",
            "password": common::PASSWORD,
            "phone": "+263 77 123 4567",
            "location": "Gweru"
        }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "tendai@example.com");
    assert_eq!(body["user"]["isAdmin"], false);
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let server = common::spawn_app().await;
    common::register(&server, "First", "farmer@example.com").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "name": "Second",
            "email": "FARMER@example.com",
            "password": common::PASSWORD
        }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({"success": false, "message": "User with this email already exists"})
    );
}

#[tokio::test]
async fn login_with_wrong_password_fails_without_token() {
    let server = common::spawn_app().await;
    common::register(&server, "Grace", "grace@example.com").await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({"email": "grace@example.com", "password": "not-the-password"}))
        .await;

    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid email or password");
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn login_then_me_round_trip() {
    let server = common::spawn_app().await;
    let user = common::register(&server, "Grace", "grace@example.com").await;

    let login: Value = server
        .post("/api/auth/login")
        .json(&json!({"email": "grace@example.com", "password": common::PASSWORD}))
        .await
        .json();
    let token = login["token"].as_str().unwrap();

    let response = server
        .get("/api/auth/me")
        .authorization_bearer(token)
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["user"]["id"], user.id.as_str());
    assert_eq!(body["user"]["location"], "Harare");
}

#[tokio::test]
async fn protected_routes_need_a_valid_bearer_token() {
    let server = common::spawn_app().await;

    let missing = server.get("/api/auth/me").await;
    assert_eq!(missing.status_code(), 401);
    assert_eq!(missing.json::<Value>()["message"], "Not authorized, no token");

    let forged = server
        .get("/api/auth/me")
        .authorization_bearer("not.a.jwt")
        .await;
    assert_eq!(forged.status_code(), 401);
    assert_eq!(forged.json::<Value>()["message"], "Not authorized, token failed");
}

#[tokio::test]
async fn profile_update_ignores_empty_fields() {
    let server = common::spawn_app().await;
    let user = common::register(&server, "Sarah", "sarah@example.com").await;

    let response = server
        .put("/api/auth/profile")
        .authorization_bearer(&user.token)
        .json(&json!({"name": "", "location": "Bulawayo"}))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["user"]["name"], "Sarah");
    assert_eq!(body["user"]["location"], "Bulawayo");
}

#[tokio::test]
async fn configured_admin_email_gets_admin_role() {
    let server = common::spawn_app().await;
    let admin = common::register_admin(&server).await;

    let body: Value = server
        .get("/api/auth/me")
        .authorization_bearer(&admin.token)
        .await
        .json();

    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["isAdmin"], true);
}

#[tokio::test]
async fn malformed_json_uses_the_error_envelope() {
    let server = common::spawn_app().await;

    let response = server
        .post("/api/auth/login")
        .content_type("application/json")
        .bytes("{\"email\":".into())
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}
