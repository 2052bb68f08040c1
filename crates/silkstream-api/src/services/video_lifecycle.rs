//! Video deletion: the stored object and everything hanging off it.
//!
//! Keeps handler logic thin and allows unit testing without HTTP.

use futures::future::join_all;
use silkstream_core::models::{BatchItemResult, BatchResponse};
use silkstream_core::{AppError, ErrorMetadata};
use silkstream_db::{FavoriteRepository, TagLedger, VideoRepository};
use silkstream_storage::Storage;
use std::sync::Arc;

use super::metadata::{check_batch_size, validate_video_id};
use super::search_index::SearchIndex;
use crate::error::storage_error_to_app;

#[derive(Clone)]
pub struct VideoLifecycleService {
    storage: Arc<dyn Storage>,
    videos: VideoRepository,
    favorites: FavoriteRepository,
    tags: TagLedger,
    search_index: Arc<dyn SearchIndex>,
    max_batch_size: usize,
}

impl VideoLifecycleService {
    pub fn new(
        storage: Arc<dyn Storage>,
        videos: VideoRepository,
        favorites: FavoriteRepository,
        tags: TagLedger,
        search_index: Arc<dyn SearchIndex>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            storage,
            videos,
            favorites,
            tags,
            search_index,
            max_batch_size,
        }
    }

    /// Remove the video object, its thumbnail, its metadata and favorite
    /// records, and give its tags back to the ledger.
    ///
    /// Fails with `NotFound` when neither an object nor a record exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete_video(&self, id: &str) -> Result<(), AppError> {
        validate_video_id(id)?;

        let record = self.videos.get(id).await?;
        let exists = self.storage.exists(id).await.map_err(storage_error_to_app)?;
        if record.is_none() && !exists {
            return Err(AppError::NotFound(format!("Video '{}' not found", id)));
        }

        if exists {
            self.storage.delete(id).await.map_err(storage_error_to_app)?;
        }

        if let Some(thumbnail) = record.as_ref().and_then(|r| r.thumbnail_key.as_deref()) {
            if let Err(e) = self.storage.delete(thumbnail).await {
                tracing::warn!(
                    video_id = %id,
                    thumbnail_key = %thumbnail,
                    error = %e,
                    "Failed to delete thumbnail"
                );
            }
        }

        self.videos.delete(id).await?;
        self.favorites.remove(id).await?;

        if let Some(record) = &record {
            if let Err(e) = self.tags.apply_tag_delta(&record.tags, &[]).await {
                tracing::warn!(video_id = %id, error = %e, "Failed to release tag counters");
            }
        }

        if self.search_index.is_enabled() {
            if let Err(e) = self.search_index.remove_video(id).await {
                tracing::warn!(video_id = %id, error = %e, "Failed to remove video from search mirror");
            }
        }

        tracing::info!(
            video_id = %id,
            had_object = exists,
            had_metadata = record.is_some(),
            "Video deleted"
        );
        Ok(())
    }

    /// Delete every listed video independently, reporting each outcome.
    #[tracing::instrument(skip(self, video_ids), fields(count = video_ids.len()))]
    pub async fn batch_delete(&self, video_ids: Vec<String>) -> Result<BatchResponse, AppError> {
        check_batch_size(video_ids.len(), self.max_batch_size)?;

        let results = join_all(video_ids.into_iter().map(|id| async move {
            match self.delete_video(&id).await {
                Ok(()) => BatchItemResult::ok(id),
                Err(e) => {
                    tracing::warn!(video_id = %id, error = %e, "Batch delete item failed");
                    BatchItemResult::failed(id, e.client_message(), e.error_code())
                }
            }
        }))
        .await;

        let response = BatchResponse::from_results(results);
        tracing::info!(
            succeeded = response.succeeded,
            failed = response.failed,
            "Batch delete complete"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::search_index::NoopSearchIndex;
    use silkstream_core::models::VideoMetadataRecord;
    use silkstream_db::{KeyValueStore, MemoryStore};
    use silkstream_storage::LocalStorage;
    use tempfile::TempDir;

    struct Fixture {
        service: VideoLifecycleService,
        storage: Arc<dyn Storage>,
        videos: VideoRepository,
        favorites: FavoriteRepository,
        tags: TagLedger,
        _dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost/media".to_string())
                .await
                .unwrap(),
        );
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let videos = VideoRepository::new(store.clone());
        let favorites = FavoriteRepository::new(store.clone(), 100);
        let tags = TagLedger::new(store, 100, 1000);
        let service = VideoLifecycleService::new(
            storage.clone(),
            videos.clone(),
            favorites.clone(),
            tags.clone(),
            Arc::new(NoopSearchIndex),
            10,
        );
        Fixture {
            service,
            storage,
            videos,
            favorites,
            tags,
            _dir: dir,
        }
    }

    async fn seed(f: &Fixture, id: &str, tags: &[&str]) {
        f.storage
            .upload_with_key(id, b"video".to_vec(), "video/mp4")
            .await
            .unwrap();
        f.storage
            .upload_with_key("thumbnails/1-a.mp4.jpg", b"jpg".to_vec(), "image/jpeg")
            .await
            .unwrap();

        let mut record = VideoMetadataRecord::new(id);
        record.tags = tags.iter().map(|t| t.to_string()).collect();
        record.thumbnail_key = Some("thumbnails/1-a.mp4.jpg".to_string());
        f.videos.put(&record).await.unwrap();
        f.tags.apply_tag_delta(&[], &record.tags).await.unwrap();
        f.favorites.toggle(id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_cascades_everywhere() {
        let f = fixture().await;
        seed(&f, "uploads/1-a.mp4", &["cats"]).await;

        f.service.delete_video("uploads/1-a.mp4").await.unwrap();

        assert!(!f.storage.exists("uploads/1-a.mp4").await.unwrap());
        assert!(!f.storage.exists("thumbnails/1-a.mp4.jpg").await.unwrap());
        assert!(f.videos.get("uploads/1-a.mp4").await.unwrap().is_none());
        assert!(!f.favorites.is_favorited("uploads/1-a.mp4").await.unwrap());
        let cats = f.tags.list_all_tags().await.unwrap();
        assert_eq!(cats[0].count, 0);
    }

    #[tokio::test]
    async fn deleting_unknown_video_is_not_found() {
        let f = fixture().await;
        let result = f.service.delete_video("uploads/none.mp4").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn batch_delete_reports_missing_items() {
        let f = fixture().await;
        seed(&f, "uploads/1-a.mp4", &[]).await;

        let response = f
            .service
            .batch_delete(vec![
                "uploads/1-a.mp4".to_string(),
                "uploads/none.mp4".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(response.succeeded, 1);
        assert_eq!(response.failed, 1);
        let missing = response.results.iter().find(|r| !r.success).unwrap();
        assert_eq!(missing.video_id, "uploads/none.mp4");
        assert_eq!(missing.code.as_deref(), Some("NOT_FOUND"));
    }
}
