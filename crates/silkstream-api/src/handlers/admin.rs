use crate::error::{ErrorResponse, HttpAppError};
use crate::services::{reindex_all, ReindexSummary};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use silkstream_core::AppError;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/admin/reindex",
    tag = "admin",
    responses(
        (status = 200, description = "Reindex finished", body = ReindexSummary),
        (status = 400, description = "Search mirror is not configured", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn reindex(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, HttpAppError> {
    if !state.search_index.is_enabled() {
        return Err(AppError::InvalidInput("Search mirror is not configured".to_string()).into());
    }

    let summary = reindex_all(
        state.search_index.as_ref(),
        &state.videos,
        state.config.store.scan_page_size,
    )
    .await?;
    Ok(Json(summary))
}
