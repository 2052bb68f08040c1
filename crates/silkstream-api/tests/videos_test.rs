//! Listing, lookup, deletion and upload URL tests.
//!
//! Run with: `cargo test -p silkstream-api --test videos_test`

mod helpers;

use helpers::{encode_id, metadata, setup_test_app};
use serde_json::{json, Value};
use std::collections::HashSet;

fn ids(listing: &Value, field: &str) -> HashSet<String> {
    listing[field]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_tag_filter_and_tag_counts() {
    let app = setup_test_app().await;
    app.seed_video("uploads/1-a.mp4", metadata("A", &["cats"])).await;
    app.seed_video("uploads/2-b.mp4", metadata("B", &["cats"])).await;
    app.seed_video("uploads/3-c.mp4", metadata("C", &["dogs"])).await;

    let response = app
        .client()
        .get("/api/videos")
        .add_query_param("tags", "cats")
        .add_query_param("limit", 10)
        .await;
    assert_eq!(response.status_code(), 200);
    let listing: Value = response.json();
    assert_eq!(
        ids(&listing, "videos"),
        HashSet::from(["uploads/1-a.mp4".to_string(), "uploads/2-b.mp4".to_string()])
    );

    let tags: Value = app.client().get("/api/tags").await.json();
    assert!(tags
        .as_array()
        .unwrap()
        .contains(&json!({"tag": "cats", "count": 2})));
    assert!(tags
        .as_array()
        .unwrap()
        .contains(&json!({"tag": "dogs", "count": 1})));
}

#[tokio::test]
async fn test_unfiltered_listing_covers_stored_objects() {
    let app = setup_test_app().await;
    app.seed_video("uploads/1-a.mp4", metadata("A", &[])).await;
    app.upload_video("uploads/2-b.mp4").await;

    let listing: Value = app.client().get("/videos").await.json();
    assert_eq!(listing["totalCount"], 2);
    assert!(listing["nextPageToken"].is_null());
    let videos = listing["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 2);
    assert!(videos.iter().all(|v| v["url"].as_str().unwrap().contains("uploads/")));

    let with_metadata = videos.iter().find(|v| v["id"] == "uploads/1-a.mp4").unwrap();
    assert_eq!(with_metadata["metadata"]["title"], "A");
    let bare = videos.iter().find(|v| v["id"] == "uploads/2-b.mp4").unwrap();
    assert!(bare.get("metadata").is_none());
}

#[tokio::test]
async fn test_filtered_pagination_is_complete() {
    let app = setup_test_app().await;
    let mut expected = HashSet::new();
    for i in 0..7 {
        let key = format!("uploads/{}-clip.mp4", i);
        app.seed_video(&key, json!({"title": format!("Clip {}", i), "category": "travel"}))
            .await;
        expected.insert(key);
    }
    app.seed_video("uploads/9-other.mp4", json!({"title": "Other", "category": "food"}))
        .await;

    for sort in [None, Some("title")] {
        let mut seen = HashSet::new();
        let mut token: Option<String> = None;
        let mut pages = 0;
        loop {
            let mut request = app
                .client()
                .get("/api/videos-archive")
                .add_query_param("category", "travel")
                .add_query_param("limit", 3);
            if let Some(sort) = sort {
                request = request.add_query_param("sortBy", sort);
            }
            if let Some(t) = &token {
                request = request.add_query_param("pageToken", t);
            }
            let page: Value = request.await.json();
            for id in ids(&page, "metadata") {
                assert!(seen.insert(id), "duplicate across pages");
            }
            pages += 1;
            match page["nextPageToken"].as_str() {
                Some(next) => token = Some(next.to_string()),
                None => break,
            }
        }
        assert_eq!(seen, expected);
        assert_eq!(pages, 3);
    }
}

#[tokio::test]
async fn test_archive_sorts_by_title() {
    let app = setup_test_app().await;
    app.seed_video("uploads/1-a.mp4", metadata("banana", &[])).await;
    app.seed_video("uploads/2-b.mp4", metadata("Apple", &[])).await;
    app.seed_video("uploads/3-c.mp4", metadata("cherry", &[])).await;

    let page: Value = app
        .client()
        .get("/api/videos-archive")
        .add_query_param("sortBy", "title")
        .add_query_param("sortDirection", "asc")
        .await
        .json();
    let titles: Vec<&str> = page["metadata"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["metadata"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Apple", "banana", "cherry"]);
    assert_eq!(page["totalCount"], 3);
}

#[tokio::test]
async fn test_malformed_page_token_is_rejected() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get("/api/videos-archive")
        .add_query_param("search", "clip")
        .add_query_param("pageToken", "not-a-token!")
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_unknown_sort_field_is_rejected() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get("/api/videos")
        .add_query_param("sortBy", "size")
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_get_video_includes_signed_urls() {
    let app = setup_test_app().await;
    app.seed_video("uploads/1-a.mp4", metadata("A", &[])).await;
    app.client()
        .patch(&format!("/api/videos/{}/metadata", encode_id("uploads/1-a.mp4")))
        .json(&json!({"description": "first edit"}))
        .await;

    let response = app
        .client()
        .get(&format!("/api/videos/{}", encode_id("uploads/1-a.mp4")))
        .await;
    assert_eq!(response.status_code(), 200);
    let video: Value = response.json();
    assert_eq!(video["id"], "uploads/1-a.mp4");
    assert!(video["url"].as_str().unwrap().ends_with("uploads/1-a.mp4"));
    assert!(video["thumbnailUrl"]
        .as_str()
        .unwrap()
        .ends_with("thumbnails/1-a.mp4.jpg"));
    assert_eq!(video["isFavorite"], false);

    let missing = app
        .client()
        .get(&format!("/api/videos/{}", encode_id("uploads/none.mp4")))
        .await;
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_delete_removes_video_everywhere() {
    let app = setup_test_app().await;
    app.seed_video("uploads/1-a.mp4", metadata("A", &["cats"])).await;
    app.seed_video("uploads/2-b.mp4", metadata("B", &[])).await;
    let id = encode_id("uploads/1-a.mp4");
    app.client().post(&format!("/api/videos/{}/favorite", id)).await;

    let response = app.client().delete(&format!("/api/videos/{}", id)).await;
    assert_eq!(response.status_code(), 204);

    let listing: Value = app.client().get("/api/videos").await.json();
    assert_eq!(
        ids(&listing, "videos"),
        HashSet::from(["uploads/2-b.mp4".to_string()])
    );

    let favorite: Value = app
        .client()
        .get(&format!("/api/videos/{}/is-favorite", id))
        .await
        .json();
    assert_eq!(favorite["isFavorited"], false);
    assert!(!app.storage.exists("uploads/1-a.mp4").await.unwrap());

    let again = app.client().delete(&format!("/api/videos/{}", id)).await;
    assert_eq!(again.status_code(), 404);
}

#[tokio::test]
async fn test_batch_delete_reports_partial_failure() {
    let app = setup_test_app().await;
    app.seed_video("uploads/1-a.mp4", metadata("A", &[])).await;

    let response = app
        .client()
        .post("/api/videos/batch-delete")
        .json(&json!({"videoIds": ["uploads/1-a.mp4", "uploads/none.mp4"]}))
        .await;
    assert_eq!(response.status_code(), 207);
    let body: Value = response.json();
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failed"], 1);

    let response = app
        .client()
        .post("/api/videos/batch-delete")
        .json(&json!({"videoIds": []}))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_upload_url_derives_key() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/get-upload-url")
        .json(&json!({"fileName": "clip.mp4", "fileType": "video/mp4"}))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let key = body["key"].as_str().unwrap();
    assert!(key.starts_with("uploads/"));
    assert!(key.ends_with("-clip.mp4"));
    assert!(body["url"].as_str().unwrap().ends_with(key));

    let rejected = app
        .client()
        .post("/get-upload-url")
        .json(&json!({"fileName": "../etc/passwd", "fileType": "video/mp4"}))
        .await;
    assert_eq!(rejected.status_code(), 400);

    let empty = app
        .client()
        .post("/get-upload-url")
        .json(&json!({"fileName": "", "fileType": "video/mp4"}))
        .await;
    assert_eq!(empty.status_code(), 400);
}

#[tokio::test]
async fn test_health_and_docs() {
    let app = setup_test_app().await;
    let health: Value = app.client().get("/health").await.json();
    assert_eq!(health["status"], "ok");

    let doc = app.client().get("/api/openapi.json").await;
    assert_eq!(doc.status_code(), 200);
    let doc: Value = doc.json();
    assert!(doc["paths"].get("/api/videos").is_some());
}
