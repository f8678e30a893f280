mod common;

use axum_test::TestServer;
use serde_json::{json, Value};

use common::TestUser;

async fn create_request(server: &TestServer, user: &TestUser) -> Value {
    let response = server
        .post("/api/logistics")
        .authorization_bearer(&user.token)
        .json(&common::refrigerated_request())
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    response.json()
}

async fn set_status(server: &TestServer, admin: &TestUser, id: &str, body: Value) -> Value {
    let response = server
        .patch(&format!("/api/logistics/{id}/status"))
        .authorization_bearer(&admin.token)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    response.json()
}

#[tokio::test]
async fn new_request_is_pending_without_driver() {
    let server = common::spawn_app().await;
    let farmer = common::register(&server, "John", "john@example.com").await;

    let created = create_request(&server, &farmer).await;
    let id = created["id"].as_str().unwrap();

    let fetched: Value = server
        .get(&format!("/api/logistics/{id}"))
        .authorization_bearer(&farmer.token)
        .await
        .json();

    assert_eq!(fetched["status"], "pending");
    assert_eq!(fetched["vehicleType"], "refrigerated");
    assert_eq!(fetched["price"], 250.0);
    assert_eq!(fetched["requester"], farmer.id.as_str());
    assert!(fetched.get("assignedDriver").is_none());
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let server = common::spawn_app().await;
    let farmer = common::register(&server, "John", "john@example.com").await;

    let mut body = common::refrigerated_request();
    body["price"] = json!(-1);
    let response = server
        .post("/api/logistics")
        .authorization_bearer(&farmer.token)
        .json(&body)
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn admin_accepts_and_assigns_driver() {
    let server = common::spawn_app().await;
    let admin = common::register_admin(&server).await;
    let farmer = common::register(&server, "John", "john@example.com").await;
    let driver = common::register(&server, "David", "driver@example.com").await;

    let created = create_request(&server, &farmer).await;
    let id = created["id"].as_str().unwrap();

    set_status(
        &server,
        &admin,
        id,
        json!({"status": "accepted", "assignedDriver": driver.id}),
    )
    .await;

    let fetched: Value = server
        .get(&format!("/api/logistics/{id}"))
        .authorization_bearer(&farmer.token)
        .await
        .json();
    assert_eq!(fetched["status"], "accepted");
    assert_eq!(fetched["assignedDriver"], driver.id.as_str());
}

#[tokio::test]
async fn non_admin_cannot_change_status() {
    let server = common::spawn_app().await;
    let farmer = common::register(&server, "John", "john@example.com").await;
    let created = create_request(&server, &farmer).await;
    let id = created["id"].as_str().unwrap();

    let response = server
        .patch(&format!("/api/logistics/{id}/status"))
        .authorization_bearer(&farmer.token)
        .json(&json!({"status": "accepted"}))
        .await;

    assert_eq!(response.status_code(), 403);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn status_cannot_skip_or_leave_terminal_states() {
    let server = common::spawn_app().await;
    let admin = common::register_admin(&server).await;
    let farmer = common::register(&server, "John", "john@example.com").await;
    let created = create_request(&server, &farmer).await;
    let id = created["id"].as_str().unwrap();
    let path = format!("/api/logistics/{id}/status");

    let skip = server
        .patch(&path)
        .authorization_bearer(&admin.token)
        .json(&json!({"status": "completed"}))
        .await;
    assert_eq!(skip.status_code(), 400);

    for status in ["accepted", "in_progress", "completed"] {
        set_status(&server, &admin, id, json!({"status": status})).await;
    }

    let reopen = server
        .patch(&path)
        .authorization_bearer(&admin.token)
        .json(&json!({"status": "cancelled"}))
        .await;
    assert_eq!(reopen.status_code(), 400);
}

#[tokio::test]
async fn requester_edits_only_while_pending() {
    let server = common::spawn_app().await;
    let admin = common::register_admin(&server).await;
    let farmer = common::register(&server, "John", "john@example.com").await;
    let created = create_request(&server, &farmer).await;
    let id = created["id"].as_str().unwrap();
    let path = format!("/api/logistics/{id}");

    let edited: Value = server
        .put(&path)
        .authorization_bearer(&farmer.token)
        .json(&json!({"price": 300}))
        .await
        .json();
    assert_eq!(edited["price"], 300.0);

    set_status(&server, &admin, id, json!({"status": "accepted"})).await;

    let update = server
        .put(&path)
        .authorization_bearer(&farmer.token)
        .json(&json!({"price": 100}))
        .await;
    assert_eq!(update.status_code(), 400);

    let delete = server
        .delete(&path)
        .authorization_bearer(&farmer.token)
        .await;
    assert_eq!(delete.status_code(), 400);
}

#[tokio::test]
async fn requester_can_cancel_but_not_accept() {
    let server = common::spawn_app().await;
    let farmer = common::register(&server, "John", "john@example.com").await;
    let created = create_request(&server, &farmer).await;
    let id = created["id"].as_str().unwrap();
    let path = format!("/api/logistics/{id}");

    let accept = server
        .put(&path)
        .authorization_bearer(&farmer.token)
        .json(&json!({"status": "accepted"}))
        .await;
    assert_eq!(accept.status_code(), 403);

    let cancelled: Value = server
        .put(&path)
        .authorization_bearer(&farmer.token)
        .json(&json!({"status": "cancelled"}))
        .await
        .json();
    assert_eq!(cancelled["status"], "cancelled");
}

#[tokio::test]
async fn strangers_are_forbidden() {
    let server = common::spawn_app().await;
    let farmer = common::register(&server, "John", "john@example.com").await;
    let stranger = common::register(&server, "Eve", "eve@example.com").await;
    let created = create_request(&server, &farmer).await;
    let path = format!("/api/logistics/{}", created["id"].as_str().unwrap());

    let get = server.get(&path).authorization_bearer(&stranger.token).await;
    assert_eq!(get.status_code(), 403);

    let delete = server
        .delete(&path)
        .authorization_bearer(&stranger.token)
        .await;
    assert_eq!(delete.status_code(), 403);

    let still_there = server.get(&path).authorization_bearer(&farmer.token).await;
    assert_eq!(still_there.status_code(), 200);
}

#[tokio::test]
async fn pending_request_can_be_deleted() {
    let server = common::spawn_app().await;
    let farmer = common::register(&server, "John", "john@example.com").await;
    let created = create_request(&server, &farmer).await;
    let path = format!("/api/logistics/{}", created["id"].as_str().unwrap());

    let response = server.delete(&path).authorization_bearer(&farmer.token).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.json::<Value>(),
        json!({"message": "Logistics request deleted"})
    );

    let gone = server.get(&path).authorization_bearer(&farmer.token).await;
    assert_eq!(gone.status_code(), 404);
}

#[tokio::test]
async fn listing_is_scoped_filtered_and_paginated() {
    let server = common::spawn_app().await;
    let admin = common::register_admin(&server).await;
    let john = common::register(&server, "John", "john@example.com").await;
    let sarah = common::register(&server, "Sarah", "sarah@example.com").await;

    for _ in 0..3 {
        create_request(&server, &john).await;
    }
    let sarahs = create_request(&server, &sarah).await;
    set_status(
        &server,
        &admin,
        sarahs["id"].as_str().unwrap(),
        json!({"status": "accepted"}),
    )
    .await;

    let own: Value = server
        .get("/api/logistics")
        .add_query_param("limit", 2)
        .authorization_bearer(&john.token)
        .await
        .json();
    assert_eq!(own["requests"].as_array().unwrap().len(), 2);
    assert_eq!(own["total"], 3);
    assert_eq!(own["totalPages"], 2);
    assert_eq!(own["currentPage"], 1);

    let all: Value = server
        .get("/api/logistics")
        .authorization_bearer(&admin.token)
        .await
        .json();
    assert_eq!(all["total"], 4);
    assert_eq!(all["requests"][0]["id"], sarahs["id"]);

    let accepted: Value = server
        .get("/api/logistics")
        .add_query_param("status", "accepted")
        .authorization_bearer(&admin.token)
        .await
        .json();
    assert_eq!(accepted["total"], 1);
}
