use std::sync::Arc;

use chrono::Utc;
use silkstream_core::models::FavoriteRecord;

use super::{from_item, to_item};
use crate::error::StoreResult;
use crate::store::{scan_all, Collection, KeyValueStore};

#[derive(Clone)]
pub struct FavoriteRepository {
    store: Arc<dyn KeyValueStore>,
    scan_page_size: usize,
}

impl FavoriteRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, scan_page_size: usize) -> Self {
        Self {
            store,
            scan_page_size,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn is_favorited(&self, video_id: &str) -> StoreResult<bool> {
        Ok(self
            .store
            .get(Collection::Favorites, video_id)
            .await?
            .is_some())
    }

    /// Delete the favorite if present, create it otherwise. Returns the new state.
    #[tracing::instrument(skip(self))]
    pub async fn toggle(&self, video_id: &str) -> StoreResult<bool> {
        if self.is_favorited(video_id).await? {
            self.store.delete(Collection::Favorites, video_id).await?;
            Ok(false)
        } else {
            let record = FavoriteRecord {
                video_id: video_id.to_string(),
                favorite_timestamp: Utc::now(),
            };
            self.store
                .put(Collection::Favorites, to_item(&record)?)
                .await?;
            Ok(true)
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, video_id: &str) -> StoreResult<()> {
        self.store.delete(Collection::Favorites, video_id).await
    }

    /// Every favorite record, in scan order.
    pub async fn list_all(&self) -> StoreResult<Vec<FavoriteRecord>> {
        let items = scan_all(
            self.store.as_ref(),
            Collection::Favorites,
            None,
            self.scan_page_size,
        )
        .await?;

        Ok(items
            .into_iter()
            .filter_map(|item| match from_item::<FavoriteRecord>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed favorite record");
                    None
                }
            })
            .collect())
    }
}
