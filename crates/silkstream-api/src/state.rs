//! Application state shared by every handler.
//!
//! Services own their repositories; handlers reach them through
//! `State<Arc<AppState>>` or extract a single service via `FromRef`.

use silkstream_core::Config;
use silkstream_db::{TagLedger, VideoRepository};
use silkstream_storage::Storage;
use std::sync::Arc;

use crate::services::{CatalogService, MetadataService, SearchIndex, VideoLifecycleService};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub metadata: MetadataService,
    pub catalog: CatalogService,
    pub lifecycle: VideoLifecycleService,
    pub tags: TagLedger,
    pub videos: VideoRepository,
    pub search_index: Arc<dyn SearchIndex>,
}

impl axum::extract::FromRef<Arc<AppState>> for MetadataService {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.metadata.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for CatalogService {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.catalog.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for VideoLifecycleService {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.lifecycle.clone()
    }
}
