//! Thumbnail pipeline: download → probe → extract frame → upload
//!
//! Every run works in its own scratch directory, removed when the run ends
//! whether it succeeded or not. Each step is retried independently.

use async_trait::async_trait;
use silkstream_core::models::ThumbnailFields;
use silkstream_core::{AppError, ThumbnailConfig};
use silkstream_storage::{thumbnail_key, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;

use crate::retry::{with_retry, RetryPolicy};
use crate::toolchain::{ProbeMetadata, VideoToolchain};

const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Invalid video key: {0}")]
    InvalidKey(String),

    #[error("Failed to prepare scratch directory: {0}")]
    Scratch(String),

    #[error("Thumbnail {step} failed after {attempts} attempts: {message}")]
    StepFailed {
        step: &'static str,
        attempts: u32,
        message: String,
    },
}

impl From<ThumbnailError> for AppError {
    fn from(err: ThumbnailError) -> Self {
        AppError::ThumbnailGeneration(err.to_string())
    }
}

/// Produces a thumbnail for a stored video and reports what probing found.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(&self, video_key: &str) -> Result<ThumbnailFields, ThumbnailError>;
}

pub struct ThumbnailPipeline {
    storage: Arc<dyn Storage>,
    toolchain: Arc<dyn VideoToolchain>,
    retry: RetryPolicy,
    scratch_root: PathBuf,
    width: u32,
}

impl ThumbnailPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        toolchain: Arc<dyn VideoToolchain>,
        config: &ThumbnailConfig,
    ) -> Self {
        Self {
            storage,
            toolchain,
            retry: RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
            scratch_root: config.scratch_dir.clone(),
            width: config.width,
        }
    }

    async fn scratch_dir(&self) -> Result<TempDir, ThumbnailError> {
        tokio::fs::create_dir_all(&self.scratch_root)
            .await
            .map_err(|e| ThumbnailError::Scratch(e.to_string()))?;
        tempfile::Builder::new()
            .prefix("thumbnail-")
            .tempdir_in(&self.scratch_root)
            .map_err(|e| ThumbnailError::Scratch(e.to_string()))
    }

    async fn run(
        &self,
        video_key: &str,
        thumbnail_key: &str,
        scratch: &Path,
    ) -> Result<ThumbnailFields, ThumbnailError> {
        let source_path = scratch.join(source_file_name(video_key));
        let frame_path = scratch.join("thumbnail.jpg");
        let source = source_path.as_path();
        let frame = frame_path.as_path();
        let storage = self.storage.as_ref();
        let toolchain = self.toolchain.as_ref();
        let width = self.width;
        let attempts = self.retry.max_attempts;

        let size = with_retry(&self.retry, "download", move || {
            storage.download_to_file(video_key, source)
        })
        .await
        .map_err(|e| step_failed("download", attempts, e))?;

        tracing::debug!(video_key = %video_key, size_bytes = size, "Source video downloaded");

        let probe: ProbeMetadata = with_retry(&self.retry, "probe", move || toolchain.probe(source))
            .await
            .map_err(|e| step_failed("probe", attempts, e))?;

        let timestamp = probe.duration.map(|d| d / 2.0).unwrap_or(0.0);

        with_retry(&self.retry, "extract", move || async move {
            toolchain
                .extract_frame(source, frame, timestamp, width)
                .await?;
            storage
                .upload_file(frame, thumbnail_key, THUMBNAIL_CONTENT_TYPE)
                .await?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .map_err(|e| step_failed("extraction", attempts, e))?;

        Ok(ThumbnailFields {
            thumbnail_key: thumbnail_key.to_string(),
            created_date: probe.created_date,
            duration: probe.duration,
        })
    }
}

fn step_failed(step: &'static str, attempts: u32, err: impl std::fmt::Display) -> ThumbnailError {
    ThumbnailError::StepFailed {
        step,
        attempts,
        message: err.to_string(),
    }
}

/// Scratch name for the downloaded source, keeping a plain extension so the
/// toolchain can sniff the container.
fn source_file_name(video_key: &str) -> String {
    let extension = video_key
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("source.{}", ext.to_ascii_lowercase()),
        None => "source".to_string(),
    }
}

#[async_trait]
impl ThumbnailGenerator for ThumbnailPipeline {
    #[tracing::instrument(skip(self))]
    async fn generate(&self, video_key: &str) -> Result<ThumbnailFields, ThumbnailError> {
        let start = std::time::Instant::now();
        let thumbnail_key =
            thumbnail_key(video_key).map_err(|e| ThumbnailError::InvalidKey(e.to_string()))?;
        let scratch = self.scratch_dir().await?;
        let scratch_path = scratch.path().to_path_buf();

        let result = self.run(video_key, &thumbnail_key, &scratch_path).await;

        if let Err(e) = scratch.close() {
            tracing::warn!(
                error = %e,
                path = %scratch_path.display(),
                "Failed to remove thumbnail scratch directory"
            );
        }

        match &result {
            Ok(fields) => tracing::info!(
                video_key = %video_key,
                thumbnail_key = %fields.thumbnail_key,
                duration = ?fields.duration,
                duration_ms = start.elapsed().as_millis() as u64,
                "Thumbnail generated"
            ),
            Err(e) => tracing::error!(
                video_key = %video_key,
                error = %e,
                "Thumbnail generation failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};
    use silkstream_core::Config;
    use silkstream_storage::LocalStorage;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Toolchain double that fails the first `probe_failures` probes.
    struct FakeToolchain {
        probe_failures: u32,
        probes: AtomicU32,
        frames: AtomicU32,
        last_timestamp: Mutex<Option<f64>>,
        fail_extract: bool,
    }

    impl FakeToolchain {
        fn new(probe_failures: u32, fail_extract: bool) -> Self {
            Self {
                probe_failures,
                probes: AtomicU32::new(0),
                frames: AtomicU32::new(0),
                last_timestamp: Mutex::new(None),
                fail_extract,
            }
        }
    }

    #[async_trait]
    impl VideoToolchain for FakeToolchain {
        async fn probe(&self, video_path: &Path) -> anyhow::Result<ProbeMetadata> {
            assert!(video_path.exists());
            let attempt = self.probes.fetch_add(1, Ordering::SeqCst);
            if attempt < self.probe_failures {
                return Err(anyhow!("probe flake"));
            }
            Ok(ProbeMetadata {
                created_date: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
                duration: Some(10.0),
            })
        }

        async fn extract_frame(
            &self,
            _video_path: &Path,
            output_path: &Path,
            timestamp_seconds: f64,
            _width: u32,
        ) -> anyhow::Result<()> {
            self.frames.fetch_add(1, Ordering::SeqCst);
            *self.last_timestamp.lock().unwrap() = Some(timestamp_seconds);
            if self.fail_extract {
                return Err(anyhow!("no decodable frame"));
            }
            tokio::fs::write(output_path, b"jpeg").await?;
            Ok(())
        }
    }

    struct Fixture {
        _media: tempfile::TempDir,
        scratch: tempfile::TempDir,
        storage: Arc<LocalStorage>,
    }

    async fn fixture() -> Fixture {
        let media = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            LocalStorage::new(media.path(), "http://localhost/media".to_string())
                .await
                .unwrap(),
        );
        storage
            .upload_with_key("uploads/1-clip.mp4", b"video".to_vec(), "video/mp4")
            .await
            .unwrap();
        Fixture {
            _media: media,
            scratch,
            storage,
        }
    }

    fn pipeline(fixture: &Fixture, toolchain: Arc<FakeToolchain>) -> ThumbnailPipeline {
        let mut config = Config::default().thumbnail;
        config.scratch_dir = fixture.scratch.path().to_path_buf();
        config.retry_base_delay_ms = 1;
        ThumbnailPipeline::new(fixture.storage.clone(), toolchain, &config)
    }

    fn scratch_is_empty(fixture: &Fixture) -> bool {
        std::fs::read_dir(fixture.scratch.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn generates_and_uploads_thumbnail() {
        let fixture = fixture().await;
        let toolchain = Arc::new(FakeToolchain::new(0, false));
        let pipeline = pipeline(&fixture, toolchain.clone());

        let fields = pipeline.generate("uploads/1-clip.mp4").await.unwrap();

        assert_eq!(fields.thumbnail_key, "thumbnails/1-clip.mp4.jpg");
        assert_eq!(fields.duration, Some(10.0));
        assert!(fields.created_date.is_some());
        assert_eq!(*toolchain.last_timestamp.lock().unwrap(), Some(5.0));
        assert!(fixture.storage.exists("thumbnails/1-clip.mp4.jpg").await.unwrap());
        assert!(scratch_is_empty(&fixture));
    }

    #[tokio::test]
    async fn retries_flaky_probe() {
        let fixture = fixture().await;
        let toolchain = Arc::new(FakeToolchain::new(2, false));
        let pipeline = pipeline(&fixture, toolchain.clone());

        pipeline.generate("uploads/1-clip.mp4").await.unwrap();
        assert_eq!(toolchain.probes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_extraction_fails_and_cleans_up() {
        let fixture = fixture().await;
        let toolchain = Arc::new(FakeToolchain::new(0, true));
        let pipeline = pipeline(&fixture, toolchain.clone());

        let err = pipeline.generate("uploads/1-clip.mp4").await.unwrap_err();

        assert!(matches!(err, ThumbnailError::StepFailed { step: "extraction", attempts: 3, .. }));
        assert_eq!(toolchain.frames.load(Ordering::SeqCst), 3);
        assert!(!fixture.storage.exists("thumbnails/1-clip.mp4.jpg").await.unwrap());
        assert!(scratch_is_empty(&fixture));
    }

    #[tokio::test]
    async fn missing_source_fails_download() {
        let fixture = fixture().await;
        let toolchain = Arc::new(FakeToolchain::new(0, false));
        let pipeline = pipeline(&fixture, toolchain.clone());

        let err = pipeline.generate("uploads/missing.mp4").await.unwrap_err();

        assert!(matches!(err, ThumbnailError::StepFailed { step: "download", .. }));
        assert_eq!(toolchain.probes.load(Ordering::SeqCst), 0);
        assert!(scratch_is_empty(&fixture));
    }

    #[test]
    fn source_name_keeps_simple_extensions() {
        assert_eq!(source_file_name("uploads/1-a.MOV"), "source.mov");
        assert_eq!(source_file_name("uploads/1-a"), "source");
        assert_eq!(source_file_name("uploads/1-a.m p4"), "source");
    }
}
