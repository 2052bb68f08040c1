use std::sync::Arc;

use silkstream_core::models::{ScanCursor, VideoMetadataRecord};

use super::{from_item, to_item};
use crate::error::StoreResult;
use crate::store::{Collection, Filter, Item, KeyValueStore, Update};

/// Typed page of video records from one raw scan page.
#[derive(Debug, Clone, Default)]
pub struct VideoPage {
    pub records: Vec<VideoMetadataRecord>,
    pub next_cursor: Option<ScanCursor>,
}

/// Video metadata records keyed by storage key.
#[derive(Clone)]
pub struct VideoRepository {
    store: Arc<dyn KeyValueStore>,
}

impl VideoRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, record), fields(video_id = %record.id))]
    pub async fn put(&self, record: &VideoMetadataRecord) -> StoreResult<()> {
        self.store.put(Collection::Videos, to_item(record)?).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<VideoMetadataRecord>> {
        self.store
            .get(Collection::Videos, id)
            .await?
            .map(from_item)
            .transpose()
    }

    /// Overwrite only the given attributes, leaving every other field as stored.
    #[tracing::instrument(skip(self, fields))]
    pub async fn update_fields(&self, id: &str, mut fields: Item) -> StoreResult<VideoMetadataRecord> {
        fields.remove(Collection::Videos.key_attribute());
        let update = Update {
            set: fields,
            increments: Vec::new(),
        };
        let item = self.store.update(Collection::Videos, id, update).await?;
        from_item(item)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.store.delete(Collection::Videos, id).await
    }

    /// One raw scan page. Items that no longer parse as records are skipped.
    pub async fn scan_page(
        &self,
        filter: Option<&Filter>,
        limit: usize,
        cursor: Option<&ScanCursor>,
    ) -> StoreResult<VideoPage> {
        let page = self
            .store
            .scan(Collection::Videos, filter, limit, cursor)
            .await?;

        let records = page
            .items
            .into_iter()
            .filter_map(|item| match from_item::<VideoMetadataRecord>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed video metadata record");
                    None
                }
            })
            .collect();

        Ok(VideoPage {
            records,
            next_cursor: page.next_cursor,
        })
    }

    /// Every record, following scan cursors to the end.
    pub async fn list_all(&self, page_size: usize) -> StoreResult<Vec<VideoMetadataRecord>> {
        let mut records = Vec::new();
        let mut cursor: Option<ScanCursor> = None;

        loop {
            let page = self.scan_page(None, page_size, cursor.as_ref()).await?;
            records.extend(page.records);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(records),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn repository() -> VideoRepository {
        VideoRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let repo = repository();
        let mut record = VideoMetadataRecord::new("uploads/1-a.mp4");
        record.title = Some("A".to_string());
        record.refresh_searchable_text();
        repo.put(&record).await.unwrap();

        let loaded = repo.get("uploads/1-a.mp4").await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(repo.get("uploads/missing.mp4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_fields_is_a_partial_merge() {
        let repo = repository();
        let mut record = VideoMetadataRecord::new("uploads/1-a.mp4");
        record.title = Some("Old".to_string());
        record.category = Some("Travel".to_string());
        repo.put(&record).await.unwrap();

        let mut fields = Item::new();
        fields.insert("title".to_string(), json!("New"));
        fields.insert("id".to_string(), json!("ignored"));
        let updated = repo.update_fields("uploads/1-a.mp4", fields).await.unwrap();

        assert_eq!(updated.id, "uploads/1-a.mp4");
        assert_eq!(updated.title.as_deref(), Some("New"));
        assert_eq!(updated.category.as_deref(), Some("Travel"));
        assert_eq!(updated.upload_date, record.upload_date);
    }

    #[tokio::test]
    async fn list_all_spans_pages() {
        let repo = repository();
        for i in 0..7 {
            repo.put(&VideoMetadataRecord::new(format!("uploads/{}.mp4", i)))
                .await
                .unwrap();
        }
        assert_eq!(repo.list_all(3).await.unwrap().len(), 7);
    }
}
