//! Silkstream Core Library
//!
//! Domain models, the error taxonomy and configuration shared by every
//! Silkstream crate.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::{Config, ListingConfig, SearchConfig, ServerConfig, StorageConfig, StoreConfig, ThumbnailConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::{StorageBackend, StoreBackend};
