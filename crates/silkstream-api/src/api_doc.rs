//! OpenAPI documentation.
//! Handler annotations use the `/api` paths; every route is also served at the root.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::services;
use silkstream_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Silkstream API",
        version = "0.1.0",
        description = "Personal video library: signed uploads, descriptive metadata with tag counters, filtered and paginated listings, favorites and lazily generated thumbnails."
    ),
    paths(
        // Uploads
        handlers::upload::get_upload_url,
        // Videos
        handlers::videos::list_videos,
        handlers::videos::list_archive,
        handlers::videos::get_video,
        handlers::videos::delete_video,
        handlers::videos::batch_delete,
        // Metadata
        handlers::metadata::create_metadata,
        handlers::metadata::get_metadata,
        handlers::metadata::update_metadata,
        handlers::metadata::batch_upsert,
        // Favorites
        handlers::favorites::toggle_favorite,
        handlers::favorites::is_favorite,
        handlers::favorites::random_favorites,
        // Tags
        handlers::tags::list_tags,
        handlers::tags::suggest_tags,
        handlers::tags::list_categories,
        // Operations
        handlers::health::health,
        handlers::admin::reindex,
    ),
    components(
        schemas(
            error::ErrorResponse,
            models::UploadUrlRequest,
            models::UploadUrlResponse,
            models::VideoSummary,
            models::VideoMetadata,
            models::VideoListResponse,
            models::ArchiveResponse,
            models::MetadataFields,
            models::BatchUpsertItem,
            models::BatchDeleteRequest,
            models::BatchItemResult,
            models::BatchResponse,
            models::FavoriteStatusResponse,
            models::TagSuggestion,
            models::SortField,
            models::SortDirection,
            services::ReindexSummary,
            handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "upload", description = "Signed upload URLs"),
        (name = "videos", description = "Video listings, lookup and deletion"),
        (name = "metadata", description = "Descriptive metadata and thumbnails"),
        (name = "favorites", description = "Favorite flags"),
        (name = "tags", description = "Tag counters and categories"),
        (name = "health", description = "Liveness"),
        (name = "admin", description = "Search mirror maintenance"),
    )
)]
pub struct ApiDoc;
