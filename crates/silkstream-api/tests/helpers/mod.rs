//! Test helpers: build AppState and router for integration tests.
//!
//! The app runs over the in-memory store, local storage in a temp directory,
//! and a thumbnail generator that counts calls instead of running ffmpeg.
#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{json, Value};
use silkstream_api::services::NoopSearchIndex;
use silkstream_api::setup::{routes, services};
use silkstream_core::models::ThumbnailFields;
use silkstream_core::Config;
use silkstream_db::MemoryStore;
use silkstream_processing::{ThumbnailError, ThumbnailGenerator};
use silkstream_storage::{thumbnail_key, LocalStorage, Storage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Writes a placeholder JPEG and reports a fixed duration.
pub struct CountingThumbnails {
    storage: Arc<dyn Storage>,
    calls: AtomicUsize,
}

impl CountingThumbnails {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThumbnailGenerator for CountingThumbnails {
    async fn generate(&self, video_key: &str) -> Result<ThumbnailFields, ThumbnailError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = thumbnail_key(video_key).map_err(|e| ThumbnailError::InvalidKey(e.to_string()))?;
        self.storage
            .upload_with_key(&key, b"jpeg".to_vec(), "image/jpeg")
            .await
            .map_err(|e| ThumbnailError::StepFailed {
                step: "extraction",
                attempts: 1,
                message: e.to_string(),
            })?;
        Ok(ThumbnailFields {
            thumbnail_key: key,
            created_date: None,
            duration: Some(30.0),
        })
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<dyn Storage>,
    pub thumbnails: Arc<CountingThumbnails>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Put a video object into storage, as a client upload would.
    pub async fn upload_video(&self, key: &str) {
        self.storage
            .upload_with_key(key, b"video bytes".to_vec(), "video/mp4")
            .await
            .expect("Failed to store test video");
    }

    /// Upload a video and create its metadata.
    pub async fn seed_video(&self, key: &str, metadata: Value) {
        self.upload_video(key).await;
        let response = self
            .server
            .post(&format!("/api/videos/{}/metadata", encode_id(key)))
            .json(&metadata)
            .await;
        assert_eq!(response.status_code(), 201, "seeding {} failed", key);
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(Config::default()).await
}

pub async fn setup_test_app_with(config: Config) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp_dir.path(), "http://localhost:3000/media".to_string())
            .await
            .expect("Failed to create local storage"),
    );
    let thumbnails = Arc::new(CountingThumbnails {
        storage: storage.clone(),
        calls: AtomicUsize::new(0),
    });

    let state = services::build_state(
        config.clone(),
        storage.clone(),
        Arc::new(MemoryStore::new()),
        thumbnails.clone(),
        Arc::new(NoopSearchIndex),
    );
    let router = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        storage,
        thumbnails,
        _temp_dir: temp_dir,
    }
}

/// Video IDs are storage keys containing `/`; they travel URL-encoded in paths.
pub fn encode_id(id: &str) -> String {
    id.replace('/', "%2F")
}

pub fn metadata(title: &str, tags: &[&str]) -> Value {
    json!({ "title": title, "tags": tags })
}
