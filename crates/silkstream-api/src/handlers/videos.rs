use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::params::ListParams;
use crate::services::{CatalogService, VideoLifecycleService};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use silkstream_core::models::{
    ArchiveResponse, BatchDeleteRequest, BatchResponse, VideoListResponse, VideoSummary,
};
use silkstream_core::ErrorMetadata;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/videos",
    tag = "videos",
    params(ListParams),
    responses(
        (status = 200, description = "Video listing", body = VideoListResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(operation = "list_videos"))]
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, HttpAppError> {
    let query = params.into_query(&state.config.listing)?;
    let response = state.catalog.list_videos(&query).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/videos-archive",
    tag = "videos",
    params(ListParams),
    responses(
        (status = 200, description = "Archive page", body = ArchiveResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(operation = "list_archive"))]
pub async fn list_archive(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, HttpAppError> {
    let query = params.into_query(&state.config.listing)?;
    let response = state.catalog.list_archive(&query).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    tag = "videos",
    params(("id" = String, Path, description = "Video ID (storage key, URL-encoded)")),
    responses(
        (status = 200, description = "Video found", body = VideoSummary),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(catalog), fields(video_id = %id, operation = "get_video"))]
pub async fn get_video(
    State(catalog): State<CatalogService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = catalog.get_video(&id).await?;
    Ok(Json(video))
}

#[utoipa::path(
    delete,
    path = "/api/videos/{id}",
    tag = "videos",
    params(("id" = String, Path, description = "Video ID (storage key, URL-encoded)")),
    responses(
        (status = 204, description = "Video deleted"),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(lifecycle), fields(video_id = %id, operation = "delete_video"))]
pub async fn delete_video(
    State(lifecycle): State<VideoLifecycleService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    lifecycle.delete_video(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/videos/batch-delete",
    tag = "videos",
    request_body = BatchDeleteRequest,
    responses(
        (status = 200, description = "Every video deleted", body = BatchResponse),
        (status = 207, description = "Some deletions failed", body = BatchResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(lifecycle, request), fields(count = request.video_ids.len()))]
pub async fn batch_delete(
    State(lifecycle): State<VideoLifecycleService>,
    ValidatedJson(request): ValidatedJson<BatchDeleteRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = lifecycle.batch_delete(request.video_ids).await?;
    Ok(batch_response(response))
}

/// 200 when every item succeeded, 207 otherwise.
pub(crate) fn batch_response(response: BatchResponse) -> (StatusCode, Json<BatchResponse>) {
    let status = match response.partial_failure() {
        Some(err) => {
            tracing::warn!(error_code = err.error_code(), "{}", err.client_message());
            StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::MULTI_STATUS)
        }
        None => StatusCode::OK,
    };
    (status, Json(response))
}
