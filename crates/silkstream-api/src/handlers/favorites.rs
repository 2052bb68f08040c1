use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use silkstream_core::models::{FavoriteStatusResponse, VideoMetadata};
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RandomFavoritesParams {
    /// Maximum number of favorites to return
    pub limit: Option<usize>,
}

#[utoipa::path(
    post,
    path = "/api/videos/{id}/favorite",
    tag = "favorites",
    params(("id" = String, Path, description = "Video ID (storage key, URL-encoded)")),
    responses(
        (status = 200, description = "Favorite flag toggled", body = FavoriteStatusResponse),
        (status = 400, description = "Invalid video ID", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(video_id = %id, operation = "toggle_favorite"))]
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let is_favorited = state.metadata.toggle_favorite(&id).await?;
    Ok(Json(FavoriteStatusResponse {
        video_id: id,
        is_favorited,
    }))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}/is-favorite",
    tag = "favorites",
    params(("id" = String, Path, description = "Video ID (storage key, URL-encoded)")),
    responses(
        (status = 200, description = "Favorite status", body = FavoriteStatusResponse)
    )
)]
#[tracing::instrument(skip(state), fields(video_id = %id))]
pub async fn is_favorite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let is_favorited = state.metadata.is_favorited(&id).await?;
    Ok(Json(FavoriteStatusResponse {
        video_id: id,
        is_favorited,
    }))
}

#[utoipa::path(
    get,
    path = "/api/videos/random-favorites",
    tag = "favorites",
    params(RandomFavoritesParams),
    responses(
        (status = 200, description = "Random favorites", body = Vec<VideoMetadata>)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn random_favorites(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RandomFavoritesParams>,
) -> Result<impl IntoResponse, HttpAppError> {
    let limit = params
        .limit
        .unwrap_or(state.config.listing.random_favorites_limit)
        .min(state.config.listing.max_page_limit);
    let records = state.metadata.get_random_favorites(limit).await?;
    let favorites: Vec<VideoMetadata> = records.into_iter().map(Into::into).collect();
    Ok(Json(favorites))
}
