use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Persisted metadata for one uploaded video. `id` is the storage object key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadataRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub original_file_name: String,
    pub s3_key: String,
    pub upload_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub searchable_text: String,
}

impl VideoMetadataRecord {
    /// New record for `id`, stamped with the current time as upload date.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            original_file_name: file_name_from_key(&id).to_string(),
            s3_key: id.clone(),
            id,
            title: None,
            description: None,
            category: None,
            tags: Vec::new(),
            upload_date: Utc::now(),
            thumbnail_key: None,
            created_date: None,
            duration: None,
            searchable_text: String::new(),
        }
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail_key.is_some()
    }

    /// Recompute `searchable_text` from the current field values.
    pub fn refresh_searchable_text(&mut self) {
        self.searchable_text = searchable_text(
            self.title.as_deref(),
            self.description.as_deref(),
            self.category.as_deref(),
            &self.tags,
        );
    }
}

/// Lowercased, space-joined concatenation of the non-empty descriptive fields.
pub fn searchable_text(
    title: Option<&str>,
    description: Option<&str>,
    category: Option<&str>,
    tags: &[String],
) -> String {
    [title, description, category]
        .into_iter()
        .flatten()
        .chain(tags.iter().map(String::as_str))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trim, lowercase and de-duplicate tags, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

/// Last path segment of a storage key.
pub fn file_name_from_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Client-facing metadata view. Omits the internal search column.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub original_file_name: String,
    pub s3_key: String,
    pub upload_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl From<VideoMetadataRecord> for VideoMetadata {
    fn from(record: VideoMetadataRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            category: record.category,
            tags: record.tags,
            original_file_name: record.original_file_name,
            s3_key: record.s3_key,
            upload_date: record.upload_date,
            thumbnail_key: record.thumbnail_key,
            created_date: record.created_date,
            duration: record.duration,
        }
    }
}

/// Descriptive fields supplied by clients. Absent fields are left untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFields {
    #[validate(length(max = 500, message = "Title must be at most 500 characters"))]
    #[serde(default)]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    #[serde(default)]
    pub category: Option<String>,
    #[validate(length(max = 100, message = "At most 100 tags are allowed"))]
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[validate(length(max = 255, message = "File name must be at most 255 characters"))]
    #[serde(default)]
    pub original_file_name: Option<String>,
}

/// Fields produced by thumbnail generation, merged into a metadata update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThumbnailFields {
    pub thumbnail_key: String,
    pub created_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
}

/// Request to issue a signed upload URL.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "File name must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "File type must be between 1 and 255 characters"
    ))]
    pub file_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadUrlResponse {
    /// Signed URL accepting a PUT of the file bytes
    pub url: String,
    /// Storage key the object will live under; also the video ID
    pub key: String,
}

/// One entry in a video listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub key: String,
    /// Signed playback URL
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub is_favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse {
    pub videos: Vec<VideoSummary>,
    pub total_count: usize,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveResponse {
    pub metadata: Vec<VideoSummary>,
    pub total_count: usize,
    pub next_page_token: Option<String>,
}
