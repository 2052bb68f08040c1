//! Service wiring

use crate::services::{CatalogService, MetadataService, SearchIndex, VideoLifecycleService};
use crate::state::AppState;
use silkstream_core::Config;
use silkstream_db::{FavoriteRepository, KeyValueStore, QueryEngine, TagLedger, VideoRepository};
use silkstream_processing::ThumbnailGenerator;
use silkstream_storage::Storage;
use std::sync::Arc;
use std::time::Duration;

/// Construct every service over the given backends.
pub fn build_state(
    config: Config,
    storage: Arc<dyn Storage>,
    store: Arc<dyn KeyValueStore>,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    search_index: Arc<dyn SearchIndex>,
) -> Arc<AppState> {
    let scan_page_size = config.store.scan_page_size;
    let max_batch_size = config.server.max_batch_size;

    let videos = VideoRepository::new(store.clone());
    let favorites = FavoriteRepository::new(store.clone(), scan_page_size);
    let tags = TagLedger::new(
        store.clone(),
        scan_page_size,
        config.listing.tag_suggestion_limit,
    );
    let query_engine = QueryEngine::new(videos.clone(), scan_page_size);

    let metadata = MetadataService::new(
        videos.clone(),
        favorites.clone(),
        tags.clone(),
        thumbnails,
        search_index.clone(),
        max_batch_size,
    );
    let catalog = CatalogService::new(
        storage.clone(),
        videos.clone(),
        favorites.clone(),
        query_engine,
        metadata.clone(),
        config.listing.clone(),
        config.storage.upload_prefix.clone(),
        Duration::from_secs(config.storage.signed_url_ttl_secs),
    );
    let lifecycle = VideoLifecycleService::new(
        storage.clone(),
        videos.clone(),
        favorites,
        tags.clone(),
        search_index.clone(),
        max_batch_size,
    );

    tracing::debug!(
        store = store.backend_name(),
        storage = ?storage.backend_type(),
        search_mirror = search_index.is_enabled(),
        "Services initialized"
    );

    Arc::new(AppState {
        config,
        storage,
        metadata,
        catalog,
        lifecycle,
        tags,
        videos,
        search_index,
    })
}
