//! Catalog listings: the home listing, the archive browser, single-video
//! lookups and upload URL issuance.
//!
//! Object storage is the source of truth for which videos exist; metadata
//! records are attached where present. Filtered listings go through the
//! query engine instead.

use chrono::Utc;
use futures::future::join_all;
use silkstream_core::models::{
    sort_by_metadata, ArchiveResponse, PageToken, SortDirection, UploadUrlRequest,
    UploadUrlResponse, VideoListResponse, VideoMetadataRecord, VideoQuery, VideoSummary,
};
use silkstream_core::{AppError, ListingConfig};
use silkstream_db::{FavoriteRepository, QueryEngine, VideoRepository};
use silkstream_storage::{upload_key, ObjectInfo, Storage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use super::metadata::MetadataService;
use crate::error::storage_error_to_app;

#[derive(Clone)]
pub struct CatalogService {
    storage: Arc<dyn Storage>,
    videos: VideoRepository,
    favorites: FavoriteRepository,
    query_engine: QueryEngine,
    metadata: MetadataService,
    listing: ListingConfig,
    upload_prefix: String,
    signed_url_ttl: Duration,
}

impl CatalogService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Arc<dyn Storage>,
        videos: VideoRepository,
        favorites: FavoriteRepository,
        query_engine: QueryEngine,
        metadata: MetadataService,
        listing: ListingConfig,
        upload_prefix: String,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            storage,
            videos,
            favorites,
            query_engine,
            metadata,
            listing,
            upload_prefix,
            signed_url_ttl,
        }
    }

    /// Derive a key for the file and sign a PUT URL for it.
    #[tracing::instrument(skip(self, request), fields(file_name = %request.file_name))]
    pub async fn create_upload_url(
        &self,
        request: &UploadUrlRequest,
    ) -> Result<UploadUrlResponse, AppError> {
        request.validate()?;

        let key = upload_key(
            &self.upload_prefix,
            Utc::now().timestamp_millis(),
            &request.file_name,
        )
        .map_err(storage_error_to_app)?;

        let url = self
            .storage
            .presigned_put_url(&key, &request.file_type, self.signed_url_ttl)
            .await
            .map_err(storage_error_to_app)?;

        tracing::info!(key = %key, file_type = %request.file_type, "Upload URL issued");
        Ok(UploadUrlResponse { url, key })
    }

    /// Home listing. Unfiltered, it leads with a random pick of favorites and
    /// fills up from storage; with filters it delegates to the query engine.
    #[tracing::instrument(skip(self, query))]
    pub async fn list_videos(&self, query: &VideoQuery) -> Result<VideoListResponse, AppError> {
        if query.has_filters() {
            let (videos, total_count, next_page_token) = self.query(query).await?;
            return Ok(VideoListResponse {
                videos,
                total_count,
                next_page_token,
            });
        }

        let objects = self.list_objects().await?;
        let available: HashMap<&str, &ObjectInfo> =
            objects.iter().map(|o| (o.key.as_str(), o)).collect();
        let favorites = self.favorite_ids().await?;

        let picks = self
            .metadata
            .get_random_favorites(self.listing.random_favorites_limit.min(query.limit))
            .await?;

        let mut chosen: Vec<(ObjectInfo, Option<VideoMetadataRecord>)> = Vec::new();
        let mut seen = HashSet::new();
        for record in picks {
            if let Some(info) = available.get(record.id.as_str()) {
                seen.insert(record.id.clone());
                chosen.push(((*info).clone(), Some(record)));
            }
        }

        let remaining: Vec<ObjectInfo> = objects
            .iter()
            .filter(|o| !seen.contains(&o.key))
            .take(query.limit.saturating_sub(chosen.len()))
            .cloned()
            .collect();
        let records = self.metadata_for(&remaining).await?;
        chosen.extend(remaining.into_iter().zip(records));

        let mut videos = Vec::with_capacity(chosen.len());
        for (info, record) in chosen {
            videos.push(self.summarize(&info.key, Some(&info), record, &favorites).await?);
        }

        Ok(VideoListResponse {
            videos,
            total_count: objects.len(),
            next_page_token: None,
        })
    }

    /// Full catalog browser. Unfiltered, every stored object is listed with
    /// its metadata attached and paged by offset.
    #[tracing::instrument(skip(self, query))]
    pub async fn list_archive(&self, query: &VideoQuery) -> Result<ArchiveResponse, AppError> {
        if query.has_filters() {
            let (metadata, total_count, next_page_token) = self.query(query).await?;
            return Ok(ArchiveResponse {
                metadata,
                total_count,
                next_page_token,
            });
        }

        let objects = self.list_objects().await?;
        let records = self.metadata_for(&objects).await?;
        let mut entries: Vec<(ObjectInfo, Option<VideoMetadataRecord>)> =
            objects.into_iter().zip(records).collect();

        if let Some(field) = query.sort_by {
            sort_by_metadata(&mut entries, field, query.sort_direction, |(_, record)| {
                record.as_ref()
            });
        }

        let total = entries.len();
        let offset = query.offset().min(total);
        let end = offset.saturating_add(query.limit).min(total);
        let favorites = self.favorite_ids().await?;

        let mut metadata = Vec::with_capacity(end - offset);
        for (info, record) in entries.drain(offset..end) {
            metadata.push(self.summarize(&info.key, Some(&info), record, &favorites).await?);
        }

        let next_page_token = (end < total).then(|| {
            PageToken {
                last_evaluated_key: None,
                offset: end,
            }
            .encode()
        });

        Ok(ArchiveResponse {
            metadata,
            total_count: total,
            next_page_token,
        })
    }

    /// One video with signed URLs. Missing only when neither the record nor
    /// the object exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_video(&self, id: &str) -> Result<VideoSummary, AppError> {
        let record = self.videos.get(id).await?;
        let exists = self.storage.exists(id).await.map_err(storage_error_to_app)?;
        if record.is_none() && !exists {
            return Err(AppError::NotFound(format!("Video '{}' not found", id)));
        }

        let info = if exists {
            self.storage
                .list(id)
                .await
                .map_err(storage_error_to_app)?
                .into_iter()
                .find(|o| o.key == id)
        } else {
            None
        };

        let mut favorites = HashSet::new();
        if self.favorites.is_favorited(id).await? {
            favorites.insert(id.to_string());
        }
        self.summarize(id, info.as_ref(), record, &favorites).await
    }

    async fn query(
        &self,
        query: &VideoQuery,
    ) -> Result<(Vec<VideoSummary>, usize, Option<String>), AppError> {
        let result = self.query_engine.query_videos(query).await?;
        let favorites = self.favorite_ids().await?;

        let mut summaries = Vec::with_capacity(result.videos.len());
        for record in result.videos {
            let id = record.id.clone();
            summaries.push(self.summarize(&id, None, Some(record), &favorites).await?);
        }
        Ok((summaries, result.total_count_so_far, result.next_page_token))
    }

    /// Uploaded objects, newest first.
    async fn list_objects(&self) -> Result<Vec<ObjectInfo>, AppError> {
        let mut objects = self
            .storage
            .list(&self.upload_prefix)
            .await
            .map_err(storage_error_to_app)?;
        objects.sort_by(|a, b| {
            SortDirection::Desc.apply(a.last_modified.cmp(&b.last_modified).then(a.key.cmp(&b.key)))
        });
        Ok(objects)
    }

    async fn metadata_for(
        &self,
        objects: &[ObjectInfo],
    ) -> Result<Vec<Option<VideoMetadataRecord>>, AppError> {
        let lookups = join_all(objects.iter().map(|o| self.videos.get(&o.key))).await;
        lookups
            .into_iter()
            .map(|lookup| lookup.map_err(AppError::from))
            .collect()
    }

    async fn favorite_ids(&self) -> Result<HashSet<String>, AppError> {
        Ok(self
            .favorites
            .list_all()
            .await?
            .into_iter()
            .map(|f| f.video_id)
            .collect())
    }

    async fn summarize(
        &self,
        key: &str,
        info: Option<&ObjectInfo>,
        record: Option<VideoMetadataRecord>,
        favorites: &HashSet<String>,
    ) -> Result<VideoSummary, AppError> {
        let url = self
            .storage
            .get_presigned_url(key, self.signed_url_ttl)
            .await
            .map_err(storage_error_to_app)?;

        let thumbnail_url = match record.as_ref().and_then(|r| r.thumbnail_key.as_deref()) {
            Some(thumbnail) => Some(
                self.storage
                    .get_presigned_url(thumbnail, self.signed_url_ttl)
                    .await
                    .map_err(storage_error_to_app)?,
            ),
            None => None,
        };

        Ok(VideoSummary {
            id: key.to_string(),
            key: key.to_string(),
            url,
            last_modified: info.and_then(|i| i.last_modified),
            size: info.map(|i| i.size),
            thumbnail_url,
            is_favorite: favorites.contains(key),
            metadata: record.map(Into::into),
        })
    }
}
