//! Metadata, tag ledger, thumbnail trigger and favorites tests.
//!
//! Run with: `cargo test -p silkstream-api --test metadata_test`

mod helpers;

use helpers::{encode_id, metadata, setup_test_app, setup_test_app_with};
use serde_json::{json, Value};
use silkstream_core::Config;

fn tag_count(tags: &Value, tag: &str) -> Option<i64> {
    tags.as_array()
        .unwrap()
        .iter()
        .find(|t| t["tag"] == tag)
        .and_then(|t| t["count"].as_i64())
}

#[tokio::test]
async fn test_create_then_get_round_trips() {
    let app = setup_test_app().await;
    let id = encode_id("uploads/1-a.mp4");

    let created = app
        .client()
        .post(&format!("/api/videos/{}/metadata", id))
        .json(&json!({"title": "A"}))
        .await;
    assert_eq!(created.status_code(), 201);

    let response = app
        .client()
        .get(&format!("/api/videos/{}/metadata", id))
        .await;
    assert_eq!(response.status_code(), 200);
    let record: Value = response.json();
    assert_eq!(record["id"], "uploads/1-a.mp4");
    assert_eq!(record["title"], "A");
    assert!(record["uploadDate"].is_string());
    assert!(record.get("searchableText").is_none());
}

#[tokio::test]
async fn test_missing_metadata_is_not_found() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get(&format!("/api/videos/{}/metadata", encode_id("uploads/none.mp4")))
        .await;
    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_tag_update_applies_delta() {
    let app = setup_test_app().await;
    app.seed_video("uploads/1-a.mp4", metadata("A", &["cats"])).await;

    let response = app
        .client()
        .patch(&format!("/api/videos/{}/metadata", encode_id("uploads/1-a.mp4")))
        .json(&json!({"tags": ["cats", "dogs"]}))
        .await;
    assert_eq!(response.status_code(), 200);
    let record: Value = response.json();
    assert_eq!(record["title"], "A");
    assert_eq!(record["tags"], json!(["cats", "dogs"]));

    let tags: Value = app.client().get("/api/tags").await.json();
    assert_eq!(tag_count(&tags, "cats"), Some(1));
    assert_eq!(tag_count(&tags, "dogs"), Some(1));
}

#[tokio::test]
async fn test_search_matches_derived_text() {
    let app = setup_test_app().await;
    app.seed_video(
        "uploads/1-a.mp4",
        json!({"title": "Beach Day", "category": "Travel", "tags": ["surf"]}),
    )
    .await;
    app.seed_video("uploads/2-b.mp4", metadata("Kitchen", &["food"])).await;

    let listing: Value = app
        .client()
        .get("/api/videos")
        .add_query_param("search", "BEACH")
        .await
        .json();
    let videos = listing["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0]["id"], "uploads/1-a.mp4");

    let categories: Value = app.client().get("/api/categories").await.json();
    assert_eq!(categories, json!(["travel"]));

    let suggestions: Value = app
        .client()
        .get("/api/tags/suggest")
        .add_query_param("prefix", "SU")
        .await
        .json();
    assert_eq!(suggestions, json!([{"tag": "surf", "count": 1}]));
}

#[tokio::test]
async fn test_first_edit_generates_thumbnail_once() {
    let app = setup_test_app().await;
    app.seed_video("uploads/1-a.mp4", metadata("A", &[])).await;
    let path = format!("/api/videos/{}/metadata", encode_id("uploads/1-a.mp4"));

    let first: Value = app
        .client()
        .patch(&path)
        .json(&json!({"title": "B"}))
        .await
        .json();
    assert_eq!(first["thumbnailKey"], "thumbnails/1-a.mp4.jpg");
    assert_eq!(first["duration"], 30.0);

    let second: Value = app
        .client()
        .patch(&path)
        .json(&json!({"title": "C"}))
        .await
        .json();
    assert_eq!(second["title"], "C");
    assert_eq!(second["thumbnailKey"], "thumbnails/1-a.mp4.jpg");
    assert_eq!(app.thumbnails.calls(), 1);
}

#[tokio::test]
async fn test_batch_upsert_reports_each_item() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/api/videos/batch-upsert")
        .json(&json!([
            {"videoId": "uploads/1-a.mp4", "metadata": {"title": "A", "tags": ["cats"]}, "isNew": true},
            {"videoId": "", "metadata": {"title": "nope"}},
            {"videoId": "uploads/2-b.mp4", "metadata": {"title": "B"}, "isNew": false}
        ]))
        .await;
    assert_eq!(response.status_code(), 207);
    let body: Value = response.json();
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 1);
    let failed = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["success"] == false)
        .unwrap();
    assert_eq!(failed["code"], "INVALID_INPUT");

    let all_ok = app
        .client()
        .post("/api/videos/batch-upsert")
        .json(&json!([{"videoId": "uploads/1-a.mp4", "metadata": {"title": "A2"}}]))
        .await;
    assert_eq!(all_ok.status_code(), 200);
}

#[tokio::test]
async fn test_batch_upsert_rejects_oversized_batch() {
    let mut config = Config::default();
    config.server.max_batch_size = 2;
    let app = setup_test_app_with(config).await;

    let items: Vec<Value> = (0..3)
        .map(|i| json!({"videoId": format!("uploads/{}.mp4", i), "isNew": true}))
        .collect();
    let response = app
        .client()
        .post("/api/videos/batch-upsert")
        .json(&items)
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_invalid_body_is_rejected() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .patch(&format!("/api/videos/{}/metadata", encode_id("uploads/1-a.mp4")))
        .json(&json!({"tags": "not-a-list"}))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_favorite_toggle() {
    let app = setup_test_app().await;
    app.seed_video("uploads/1-a.mp4", metadata("A", &[])).await;
    let id = encode_id("uploads/1-a.mp4");

    let first: Value = app
        .client()
        .post(&format!("/api/videos/{}/favorite", id))
        .await
        .json();
    assert_eq!(first["isFavorited"], true);
    assert_eq!(first["videoId"], "uploads/1-a.mp4");

    let favorites: Value = app
        .client()
        .get("/api/videos/random-favorites")
        .add_query_param("limit", 5)
        .await
        .json();
    assert_eq!(favorites.as_array().unwrap().len(), 1);

    let second: Value = app
        .client()
        .post(&format!("/videos/{}/favorite", id))
        .await
        .json();
    assert_eq!(second["isFavorited"], false);

    let status: Value = app
        .client()
        .get(&format!("/api/videos/{}/is-favorite", id))
        .await
        .json();
    assert_eq!(status["isFavorited"], false);
}
