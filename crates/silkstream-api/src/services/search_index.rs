//! Best-effort search mirror
//!
//! The key-value store is authoritative. The mirror receives copies of video
//! records for full-text search; every failure here is logged by callers and
//! never fails the write that triggered it.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::json;
use silkstream_core::models::VideoMetadataRecord;
use silkstream_core::SearchConfig;
use silkstream_db::VideoRepository;
use silkstream_processing::{with_retry, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

/// Documents sent per bulk request during a full reindex.
pub const REINDEX_CHUNK_SIZE: usize = 500;

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index_video(&self, record: &VideoMetadataRecord) -> Result<()>;

    async fn remove_video(&self, video_id: &str) -> Result<()>;

    async fn bulk_index(&self, records: &[VideoMetadataRecord]) -> Result<()>;

    fn is_enabled(&self) -> bool;
}

/// Used when no mirror is configured.
pub struct NoopSearchIndex;

#[async_trait]
impl SearchIndex for NoopSearchIndex {
    async fn index_video(&self, _record: &VideoMetadataRecord) -> Result<()> {
        Ok(())
    }

    async fn remove_video(&self, _video_id: &str) -> Result<()> {
        Ok(())
    }

    async fn bulk_index(&self, _records: &[VideoMetadataRecord]) -> Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// OpenSearch / Elasticsearch compatible index over its REST API.
pub struct OpenSearchIndex {
    client: Client,
    base_url: Url,
    index: String,
}

impl OpenSearchIndex {
    pub fn new(base_url: &str, index: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url).context("Invalid SEARCH_INDEX_URL")?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("SEARCH_INDEX_URL must be an http(s) URL"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build search index HTTP client")?;

        Ok(Self {
            client,
            base_url,
            index: index.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Search index URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn document(record: &VideoMetadataRecord) -> serde_json::Value {
    json!({
        "id": record.id,
        "title": record.title,
        "description": record.description,
        "category": record.category,
        "tags": record.tags,
        "uploadDate": record.upload_date,
        "createdDate": record.created_date,
        "duration": record.duration,
        "searchableText": record.searchable_text,
    })
}

/// NDJSON body for the `_bulk` endpoint.
fn bulk_body(index: &str, records: &[VideoMetadataRecord]) -> String {
    let mut body = String::new();
    for record in records {
        body.push_str(&json!({"index": {"_index": index, "_id": record.id}}).to_string());
        body.push('\n');
        body.push_str(&document(record).to_string());
        body.push('\n');
    }
    body
}

#[async_trait]
impl SearchIndex for OpenSearchIndex {
    async fn index_video(&self, record: &VideoMetadataRecord) -> Result<()> {
        let url = self.url(&[&self.index, "_doc", &record.id])?;
        self.client
            .put(url)
            .json(&document(record))
            .send()
            .await
            .context("Search index request failed")?
            .error_for_status()
            .context("Search index rejected document")?;
        Ok(())
    }

    async fn remove_video(&self, video_id: &str) -> Result<()> {
        let url = self.url(&[&self.index, "_doc", video_id])?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .context("Search index request failed")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response
            .error_for_status()
            .context("Search index rejected delete")?;
        Ok(())
    }

    async fn bulk_index(&self, records: &[VideoMetadataRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let url = self.url(&["_bulk"])?;
        let response: serde_json::Value = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(&self.index, records))
            .send()
            .await
            .context("Search index bulk request failed")?
            .error_for_status()
            .context("Search index rejected bulk request")?
            .json()
            .await
            .context("Invalid bulk response")?;

        if response["errors"].as_bool().unwrap_or(false) {
            return Err(anyhow!("Bulk request reported item errors"));
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Build the mirror selected by configuration.
pub fn create_search_index(config: &SearchConfig) -> Result<Arc<dyn SearchIndex>> {
    match &config.url {
        Some(url) => {
            tracing::info!(url = %url, index = %config.index_name, "Search mirror enabled");
            Ok(Arc::new(OpenSearchIndex::new(url, config.index_name.clone())?))
        }
        None => {
            tracing::info!("Search mirror disabled");
            Ok(Arc::new(NoopSearchIndex))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReindexSummary {
    pub indexed: usize,
    pub failed: usize,
    pub chunks: usize,
}

/// Push every stored record to the mirror in chunks, retrying each chunk.
pub async fn reindex_all(
    index: &dyn SearchIndex,
    videos: &VideoRepository,
    scan_page_size: usize,
) -> Result<ReindexSummary> {
    let records = videos
        .list_all(scan_page_size)
        .await
        .context("Failed to read video records for reindex")?;
    let policy = RetryPolicy::new(3, Duration::from_millis(1000));
    let mut summary = ReindexSummary::default();

    for chunk in records.chunks(REINDEX_CHUNK_SIZE) {
        summary.chunks += 1;
        match with_retry(&policy, "bulk_index", || index.bulk_index(chunk)).await {
            Ok(()) => summary.indexed += chunk.len(),
            Err(e) => {
                tracing::error!(error = %e, chunk_size = chunk.len(), "Reindex chunk failed");
                summary.failed += chunk.len();
            }
        }
    }

    tracing::info!(
        indexed = summary.indexed,
        failed = summary.failed,
        chunks = summary.chunks,
        "Search reindex complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_body_pairs_action_and_document_lines() {
        let mut record = VideoMetadataRecord::new("uploads/1-a.mp4");
        record.title = Some("Beach".to_string());
        let body = bulk_body("videos", &[record]);

        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_id"], "uploads/1-a.mp4");
        let doc: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc["title"], "Beach");
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn document_urls_encode_the_video_key() {
        let index = OpenSearchIndex::new("http://localhost:9200/", "videos").unwrap();
        let url = index.url(&["videos", "_doc", "uploads/1-a.mp4"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9200/videos/_doc/uploads%2F1-a.mp4"
        );
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(OpenSearchIndex::new("not a url", "videos").is_err());
    }
}
