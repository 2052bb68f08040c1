use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::videos::batch_response;
use crate::services::MetadataService;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use silkstream_core::models::{BatchResponse, BatchUpsertItem, MetadataFields, VideoMetadata};

#[utoipa::path(
    post,
    path = "/api/videos/{id}/metadata",
    tag = "metadata",
    params(("id" = String, Path, description = "Video ID (storage key, URL-encoded)")),
    request_body = MetadataFields,
    responses(
        (status = 201, description = "Metadata created", body = VideoMetadata),
        (status = 400, description = "Invalid metadata", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(metadata, fields), fields(video_id = %id, operation = "create_metadata"))]
pub async fn create_metadata(
    State(metadata): State<MetadataService>,
    Path(id): Path<String>,
    ValidatedJson(fields): ValidatedJson<MetadataFields>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = metadata.create_metadata(&id, fields).await?;
    Ok((StatusCode::CREATED, Json(VideoMetadata::from(record))))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}/metadata",
    tag = "metadata",
    params(("id" = String, Path, description = "Video ID (storage key, URL-encoded)")),
    responses(
        (status = 200, description = "Metadata found", body = VideoMetadata),
        (status = 404, description = "No metadata for this video", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(metadata), fields(video_id = %id, operation = "get_metadata"))]
pub async fn get_metadata(
    State(metadata): State<MetadataService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = metadata.get_metadata(&id).await?;
    Ok(Json(VideoMetadata::from(record)))
}

#[utoipa::path(
    patch,
    path = "/api/videos/{id}/metadata",
    tag = "metadata",
    params(("id" = String, Path, description = "Video ID (storage key, URL-encoded)")),
    request_body = MetadataFields,
    responses(
        (status = 200, description = "Metadata updated", body = VideoMetadata),
        (status = 400, description = "Invalid metadata", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(metadata, fields), fields(video_id = %id, operation = "update_metadata"))]
pub async fn update_metadata(
    State(metadata): State<MetadataService>,
    Path(id): Path<String>,
    ValidatedJson(fields): ValidatedJson<MetadataFields>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = metadata.update_metadata(&id, fields).await?;
    Ok(Json(VideoMetadata::from(record)))
}

#[utoipa::path(
    post,
    path = "/api/videos/batch-upsert",
    tag = "metadata",
    request_body = Vec<BatchUpsertItem>,
    responses(
        (status = 200, description = "Every item written", body = BatchResponse),
        (status = 207, description = "Some items failed", body = BatchResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(metadata, items), fields(count = items.len()))]
pub async fn batch_upsert(
    State(metadata): State<MetadataService>,
    ValidatedJson(items): ValidatedJson<Vec<BatchUpsertItem>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = metadata.batch_upsert(items).await?;
    Ok(batch_response(response))
}
