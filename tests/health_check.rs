mod common;

use serde_json::Value;

#[tokio::test]
async fn health_check_works() {
    let server = common::spawn_app().await;

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let server = common::spawn_app().await;

    let response = server.get("/api/does-not-exist").await;

    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn router_answers_without_a_server() {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    let app = farmlink::configure_app(common::test_pool().await, common::auth_settings());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], br#"{"status":"healthy"}"#);
}
