//! Application setup and initialization
//!
//! Builds every backend from configuration, wires the services into
//! [`AppState`] and assembles the router.

pub mod routes;
pub mod server;
pub mod services;

use crate::services::create_search_index;
use crate::state::AppState;
use anyhow::{Context, Result};
use silkstream_core::Config;
use silkstream_db::create_store;
use silkstream_processing::{FFmpegToolchain, ThumbnailPipeline};
use silkstream_storage::create_storage;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.server.log_json)?;
    tracing::info!(
        environment = %config.server.environment,
        storage_backend = ?config.storage.backend,
        store_backend = ?config.store.backend,
        "Configuration loaded and validated successfully"
    );

    let store = create_store(&config.store)
        .await
        .context("Failed to initialize metadata store")?;
    let storage = create_storage(&config.storage)
        .await
        .context("Failed to initialize object storage")?;

    let toolchain = FFmpegToolchain::new(
        config.thumbnail.ffmpeg_path.clone(),
        config.thumbnail.ffprobe_path.clone(),
    )
    .context("Invalid ffmpeg/ffprobe configuration")?;
    let thumbnails = Arc::new(ThumbnailPipeline::new(
        storage.clone(),
        Arc::new(toolchain),
        &config.thumbnail,
    ));

    let search_index = create_search_index(&config.search)?;

    let state = services::build_state(config.clone(), storage, store, thumbnails, search_index);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
