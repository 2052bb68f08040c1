//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object storage backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte stream returned by [`Storage::download_stream`]
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// One entry of an object listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
}

/// Storage abstraction trait
///
/// Keys are the object paths as seen by clients (`uploads/<millis>-<name>`,
/// `thumbnails/<name>.jpg`). Keys must not contain `..` or a leading `/`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload data to a specific storage key. Returns the object URL.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Download a file as a stream of chunks
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Delete a file by its storage key. Deleting a missing key is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Generate a presigned/temporary URL for direct access (GET)
    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Generate a presigned PUT URL so clients upload directly to storage.
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// List every object whose key starts with `prefix`, ordered by key.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Stream an object into a local file, returning the number of bytes written.
    async fn download_to_file(&self, storage_key: &str, destination: &Path) -> StorageResult<u64> {
        let start = std::time::Instant::now();
        let mut stream = self.download_stream(storage_key).await?;
        let mut file = tokio::fs::File::create(destination).await?;

        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(
            key = %storage_key,
            path = %destination.display(),
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Downloaded object to local file"
        );

        Ok(written)
    }

    /// Upload a local file under `storage_key`. Returns the object URL.
    async fn upload_file(
        &self,
        source: &Path,
        storage_key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let data = tokio::fs::read(source).await?;
        self.upload_with_key(storage_key, data, content_type).await
    }
}
