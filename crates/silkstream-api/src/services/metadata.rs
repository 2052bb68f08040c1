//! Metadata orchestration: create, update, batch upsert and favorites
//!
//! Updates read the existing record, push the tag delta to the ledger,
//! generate a thumbnail the first time a record without one is edited, and
//! persist only the supplied fields plus the derived ones.

use futures::future::join_all;
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::Value;
use silkstream_core::models::{
    normalize_tags, BatchItemResult, BatchResponse, BatchUpsertItem, MetadataFields,
    ThumbnailFields, VideoMetadataRecord,
};
use silkstream_core::{AppError, ErrorMetadata};
use silkstream_db::{FavoriteRepository, Item, TagLedger, VideoRepository};
use silkstream_processing::ThumbnailGenerator;
use std::sync::Arc;
use validator::Validate;

use super::search_index::SearchIndex;

/// Attributes a partial update may write. Everything else stays as stored.
const DESCRIPTIVE_ATTRIBUTES: [&str; 5] = [
    "title",
    "description",
    "category",
    "tags",
    "originalFileName",
];
const THUMBNAIL_ATTRIBUTES: [&str; 3] = ["thumbnailKey", "createdDate", "duration"];

#[derive(Clone)]
pub struct MetadataService {
    videos: VideoRepository,
    favorites: FavoriteRepository,
    tags: TagLedger,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    search_index: Arc<dyn SearchIndex>,
    max_batch_size: usize,
}

impl MetadataService {
    pub fn new(
        videos: VideoRepository,
        favorites: FavoriteRepository,
        tags: TagLedger,
        thumbnails: Arc<dyn ThumbnailGenerator>,
        search_index: Arc<dyn SearchIndex>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            videos,
            favorites,
            tags,
            thumbnails,
            search_index,
            max_batch_size,
        }
    }

    /// Write a fresh record for `id`, stamped with the current upload date.
    ///
    /// Thumbnail data already attached to an earlier record is carried over,
    /// and the ledger is adjusted against the earlier record's tags.
    #[tracing::instrument(skip(self, fields))]
    pub async fn create_metadata(
        &self,
        id: &str,
        fields: MetadataFields,
    ) -> Result<VideoMetadataRecord, AppError> {
        validate_video_id(id)?;
        fields.validate()?;

        let existing = self.videos.get(id).await?;
        let mut record = VideoMetadataRecord::new(id);
        apply_fields(&mut record, fields);

        if let Some(previous) = &existing {
            record.thumbnail_key = previous.thumbnail_key.clone();
            record.created_date = previous.created_date;
            record.duration = previous.duration;
        }
        record.refresh_searchable_text();

        self.videos.put(&record).await?;

        let old_tags = existing.map(|r| r.tags).unwrap_or_default();
        self.adjust_tags(id, &old_tags, &record.tags).await;
        self.mirror(&record).await;

        tracing::info!(video_id = %id, tags = record.tags.len(), "Video metadata created");
        Ok(record)
    }

    /// Merge the supplied fields into the stored record.
    ///
    /// Omitted fields are left untouched. A record that does not exist yet is
    /// created from the supplied fields. Thumbnail failures are logged and the
    /// write still goes through without thumbnail fields.
    #[tracing::instrument(skip(self, fields))]
    pub async fn update_metadata(
        &self,
        id: &str,
        mut fields: MetadataFields,
    ) -> Result<VideoMetadataRecord, AppError> {
        validate_video_id(id)?;
        fields.validate()?;
        // A blank category keeps the stored one.
        if fields.category.as_deref().is_some_and(|c| c.trim().is_empty()) {
            fields.category = None;
        }

        let existing = self.videos.get(id).await?;
        let base = existing
            .clone()
            .unwrap_or_else(|| VideoMetadataRecord::new(id));

        let new_tags = fields.tags.as_ref().map(normalize_tags);
        if let Some(tags) = &new_tags {
            self.adjust_tags(id, &base.tags, tags).await;
        }

        let thumbnail = if base.has_thumbnail() {
            None
        } else {
            self.generate_thumbnail(id).await
        };

        let mut merged = base;
        apply_fields(&mut merged, fields.clone());
        if let Some(thumbnail) = &thumbnail {
            merged.thumbnail_key = Some(thumbnail.thumbnail_key.clone());
            merged.created_date = thumbnail.created_date.or(merged.created_date);
            merged.duration = thumbnail.duration.or(merged.duration);
        }
        merged.refresh_searchable_text();

        let record = if existing.is_some() {
            let changes = partial_update(&merged, &fields, thumbnail.is_some())?;
            self.videos.update_fields(id, changes).await?
        } else {
            tracing::debug!(video_id = %id, "No metadata record yet, creating one from update");
            self.videos.put(&merged).await?;
            merged
        };

        self.mirror(&record).await;

        tracing::info!(
            video_id = %id,
            thumbnail_generated = thumbnail.is_some(),
            "Video metadata updated"
        );
        Ok(record)
    }

    pub async fn get_metadata(&self, id: &str) -> Result<VideoMetadataRecord, AppError> {
        self.videos
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No metadata for video '{}'", id)))
    }

    /// Create or update every item independently. One item failing never
    /// affects the others; the response reports each outcome.
    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    pub async fn batch_upsert(&self, items: Vec<BatchUpsertItem>) -> Result<BatchResponse, AppError> {
        check_batch_size(items.len(), self.max_batch_size)?;

        let results = join_all(items.into_iter().map(|item| async move {
            let outcome = if item.is_new {
                self.create_metadata(&item.video_id, item.metadata).await
            } else {
                self.update_metadata(&item.video_id, item.metadata).await
            };
            match outcome {
                Ok(_) => BatchItemResult::ok(item.video_id),
                Err(e) => {
                    tracing::warn!(video_id = %item.video_id, error = %e, "Batch upsert item failed");
                    BatchItemResult::failed(item.video_id, e.client_message(), e.error_code())
                }
            }
        }))
        .await;

        let response = BatchResponse::from_results(results);
        tracing::info!(
            succeeded = response.succeeded,
            failed = response.failed,
            "Batch upsert complete"
        );
        Ok(response)
    }

    /// Flip the favorite flag; returns whether the video is now a favorite.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_favorite(&self, video_id: &str) -> Result<bool, AppError> {
        validate_video_id(video_id)?;
        Ok(self.favorites.toggle(video_id).await?)
    }

    pub async fn is_favorited(&self, video_id: &str) -> Result<bool, AppError> {
        Ok(self.favorites.is_favorited(video_id).await?)
    }

    /// Up to `limit` favorites in random order, resolved to their metadata.
    /// Favorites whose metadata is gone are dropped.
    pub async fn get_random_favorites(
        &self,
        limit: usize,
    ) -> Result<Vec<VideoMetadataRecord>, AppError> {
        let mut favorites = self.favorites.list_all().await?;
        favorites.shuffle(&mut rand::rng());
        favorites.truncate(limit);

        let lookups = join_all(
            favorites
                .iter()
                .map(|favorite| self.videos.get(&favorite.video_id)),
        )
        .await;

        let mut records = Vec::with_capacity(lookups.len());
        for lookup in lookups {
            if let Some(record) = lookup? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn adjust_tags(&self, video_id: &str, old_tags: &[String], new_tags: &[String]) {
        if let Err(e) = self.tags.apply_tag_delta(old_tags, new_tags).await {
            tracing::warn!(video_id = %video_id, error = %e, "Failed to adjust tag counters");
        }
    }

    async fn generate_thumbnail(&self, video_id: &str) -> Option<ThumbnailFields> {
        match self.thumbnails.generate(video_id).await {
            Ok(fields) => Some(fields),
            Err(e) => {
                tracing::warn!(
                    video_id = %video_id,
                    error = %e,
                    "Thumbnail generation failed, saving metadata without thumbnail"
                );
                None
            }
        }
    }

    async fn mirror(&self, record: &VideoMetadataRecord) {
        if !self.search_index.is_enabled() {
            return;
        }
        if let Err(e) = self.search_index.index_video(record).await {
            tracing::warn!(video_id = %record.id, error = %e, "Failed to index video in search mirror");
        }
    }
}

pub(crate) fn validate_video_id(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::InvalidInput("Video ID must not be empty".to_string()));
    }
    Ok(())
}

pub(crate) fn check_batch_size(len: usize, max: usize) -> Result<(), AppError> {
    if len > max {
        return Err(AppError::InvalidInput(format!(
            "Batch of {} items exceeds the maximum of {}",
            len, max
        )));
    }
    Ok(())
}

fn apply_fields(record: &mut VideoMetadataRecord, fields: MetadataFields) {
    if let Some(title) = fields.title {
        record.title = Some(title);
    }
    if let Some(description) = fields.description {
        record.description = Some(description);
    }
    if let Some(category) = fields.category {
        record.category = Some(category);
    }
    if let Some(tags) = fields.tags {
        record.tags = normalize_tags(tags);
    }
    if let Some(name) = fields.original_file_name {
        record.original_file_name = name;
    }
}

/// Store attributes of a record built by this service. Failures are internal errors.
fn record_attributes<T: Serialize>(record: &T) -> Result<Item, AppError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Internal(
            "Metadata record did not serialize to an object".to_string(),
        )),
        Err(e) => Err(AppError::Internal(format!(
            "Failed to serialize metadata record: {}",
            e
        ))),
    }
}

/// Attributes to write for an update: the supplied fields, the recomputed
/// search column and, when one was just generated, the thumbnail fields.
fn partial_update(
    merged: &VideoMetadataRecord,
    fields: &MetadataFields,
    with_thumbnail: bool,
) -> Result<Item, AppError> {
    let full = record_attributes(merged)?;

    let supplied = [
        fields.title.is_some(),
        fields.description.is_some(),
        fields.category.is_some(),
        fields.tags.is_some(),
        fields.original_file_name.is_some(),
    ];

    let mut attributes: Vec<&str> = DESCRIPTIVE_ATTRIBUTES
        .iter()
        .zip(supplied)
        .filter_map(|(name, present)| present.then_some(*name))
        .collect();
    attributes.push("searchableText");
    if with_thumbnail {
        attributes.extend(THUMBNAIL_ATTRIBUTES);
    }

    Ok(attributes
        .into_iter()
        .filter_map(|name| full.get(name).map(|value| (name.to_string(), value.clone())))
        .collect())
}
