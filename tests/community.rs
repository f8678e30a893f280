mod common;

use serde_json::{json, Value};

#[tokio::test]
async fn post_likes_toggle_and_comments_accumulate() {
    let server = common::spawn_app().await;
    let author = common::register(&server, "John", "john@example.com").await;
    let reader = common::register(&server, "Sarah", "sarah@example.com").await;

    let created = server
        .post("/api/posts")
        .authorization_bearer(&author.token)
        .json(&json!({
            "content": "First maize harvest of the season is in!",
            "tags": ["maize", "harvest"],
            "category": "success_story"
        }))
        .await;
    assert_eq!(created.status_code(), 201);
    let post: Value = created.json();
    assert_eq!(post["category"], "success_story");
    let id = post["id"].as_str().unwrap();

    let liked: Value = server
        .post(&format!("/api/posts/{id}/like"))
        .authorization_bearer(&reader.token)
        .await
        .json();
    assert_eq!(liked, json!({"likes": [reader.id]}));

    let unliked: Value = server
        .post(&format!("/api/posts/{id}/like"))
        .authorization_bearer(&reader.token)
        .await
        .json();
    assert_eq!(unliked, json!({"likes": []}));

    let comments: Value = server
        .post(&format!("/api/posts/{id}/comments"))
        .authorization_bearer(&reader.token)
        .json(&json!({"content": "Congratulations!"}))
        .await
        .json();
    assert_eq!(comments.as_array().unwrap().len(), 1);
    assert_eq!(comments[0]["user"], reader.id.as_str());
    assert_eq!(comments[0]["content"], "Congratulations!");
}

#[tokio::test]
async fn posts_are_filtered_and_author_owned() {
    let server = common::spawn_app().await;
    let author = common::register(&server, "John", "john@example.com").await;
    let other = common::register(&server, "Eve", "eve@example.com").await;

    for (content, tag, category) in [
        ("When should I plant sorghum?", "sorghum", "question"),
        ("Mulch keeps soil moist", "soil", "advice"),
        ("Drip irrigation tips", "soil", "advice"),
    ] {
        server
            .post("/api/posts")
            .authorization_bearer(&author.token)
            .json(&json!({"content": content, "tags": [tag], "category": category}))
            .await;
    }

    let advice: Value = server
        .get("/api/posts")
        .add_query_param("category", "advice")
        .authorization_bearer(&other.token)
        .await
        .json();
    assert_eq!(advice["total"], 2);
    assert_eq!(advice["posts"][0]["content"], "Drip irrigation tips");

    let sorghum: Value = server
        .get("/api/posts")
        .add_query_param("tag", "sorghum")
        .authorization_bearer(&other.token)
        .await
        .json();
    assert_eq!(sorghum["posts"].as_array().unwrap().len(), 1);
    let id = sorghum["posts"][0]["id"].as_str().unwrap();

    let hijack = server
        .delete(&format!("/api/posts/{id}"))
        .authorization_bearer(&other.token)
        .await;
    assert_eq!(hijack.status_code(), 403);

    let edited = server
        .put(&format!("/api/posts/{id}"))
        .authorization_bearer(&author.token)
        .json(&json!({"content": "When should I plant sorghum in Masvingo?"}))
        .await;
    assert_eq!(edited.status_code(), 200);

    let deleted = server
        .delete(&format!("/api/posts/{id}"))
        .authorization_bearer(&author.token)
        .await;
    assert_eq!(deleted.json::<Value>(), json!({"message": "Post deleted"}));
}

#[tokio::test]
async fn community_requires_login() {
    let server = common::spawn_app().await;

    assert_eq!(server.get("/api/posts").await.status_code(), 401);
    assert_eq!(server.get("/api/advisory").await.status_code(), 401);
}

#[tokio::test]
async fn advisory_views_count_and_filters_apply() {
    let server = common::spawn_app().await;
    let expert = common::register(&server, "Agritex Officer", "expert@example.com").await;
    let farmer = common::register(&server, "John", "john@example.com").await;

    let created: Value = server
        .post("/api/advisory")
        .authorization_bearer(&expert.token)
        .json(&json!({
            "title": "Fall armyworm alert",
            "content": "Scout maize fields twice a week.",
            "category": "pest_control",
            "targetCrops": ["maize"],
            "season": "summer"
        }))
        .await
        .json();
    server
        .post("/api/advisory")
        .authorization_bearer(&expert.token)
        .json(&json!({
            "title": "Tobacco curing",
            "content": "Keep barns at a steady temperature.",
            "category": "best_practices",
            "targetCrops": ["tobacco"],
            "season": "fall"
        }))
        .await;
    let id = created["id"].as_str().unwrap();
    assert_eq!(created["views"], 0);

    for expected in [1, 2] {
        let viewed: Value = server
            .get(&format!("/api/advisory/{id}"))
            .authorization_bearer(&farmer.token)
            .await
            .json();
        assert_eq!(viewed["views"], expected);
    }

    let maize: Value = server
        .get("/api/advisory")
        .add_query_param("crop", "maize")
        .authorization_bearer(&farmer.token)
        .await
        .json();
    assert_eq!(maize["total"], 1);
    assert_eq!(maize["advisories"][0]["title"], "Fall armyworm alert");

    let fall: Value = server
        .get("/api/advisory")
        .add_query_param("season", "fall")
        .authorization_bearer(&farmer.token)
        .await
        .json();
    assert_eq!(fall["advisories"][0]["title"], "Tobacco curing");

    let likes: Value = server
        .post(&format!("/api/advisory/{id}/like"))
        .authorization_bearer(&farmer.token)
        .await
        .json();
    assert_eq!(likes["likes"], json!([farmer.id]));

    let not_author = server
        .put(&format!("/api/advisory/{id}"))
        .authorization_bearer(&farmer.token)
        .json(&json!({"title": "Changed"}))
        .await;
    assert_eq!(not_author.status_code(), 403);

    let removed = server
        .delete(&format!("/api/advisory/{id}"))
        .authorization_bearer(&expert.token)
        .await;
    assert_eq!(removed.json::<Value>(), json!({"message": "Advisory deleted"}));
}
