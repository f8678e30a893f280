mod common;

use serde_json::{json, Value};

async fn register(http: &reqwest::Client, base: &str, name: &str, email: &str) -> String {
    let body: Value = http
        .post(format!("{base}/auth/register"))
        .json(&json!({"name": name, "email": email, "password": common::PASSWORD}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["token"].as_str().expect("token").to_string()
}

async fn stock(http: &reqwest::Client, base: &str, product_id: &str) -> f64 {
    let body: Value = http
        .get(format!("{base}/products/{product_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["data"]["quantity"].as_f64().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell_or_fail() {
    let dir = tempfile::tempdir().unwrap();
    let base = common::serve(common::file_pool(dir.path()).await).await;
    let http = reqwest::Client::new();

    let farmer = register(&http, &base, "John", "john@example.com").await;
    let buyer = register(&http, &base, "Sarah", "sarah@example.com").await;

    let product: Value = http
        .post(format!("{base}/products"))
        .bearer_auth(&farmer)
        .json(&common::tomato_listing(30.0))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let product_id = product["data"]["id"].as_str().unwrap().to_string();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let http = http.clone();
            let url = format!("{base}/orders");
            let token = buyer.clone();
            let product_id = product_id.clone();
            tokio::spawn(async move {
                let response = http
                    .post(url)
                    .bearer_auth(token)
                    .json(&json!({"items": [{"product": product_id, "quantity": 3}]}))
                    .send()
                    .await
                    .unwrap();
                (response.status().as_u16(), response.text().await.unwrap())
            })
        })
        .collect();

    let mut placed = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert!(matches!(status, 201 | 400 | 409), "{status}: {body}");
        if status == 201 {
            placed += 1;
        }
    }

    assert!((1..=10).contains(&placed), "{placed} orders placed");
    assert_eq!(stock(&http, &base, &product_id).await, 30.0 - 3.0 * placed as f64);
}
