use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use silkstream_core::models::TagSuggestion;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SuggestParams {
    /// Case-insensitive fragment to look for
    #[serde(default)]
    pub prefix: String,
}

#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    responses(
        (status = 200, description = "Every tag with its usage count", body = Vec<TagSuggestion>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let records = state.tags.list_all_tags().await?;
    let response: Vec<TagSuggestion> = records.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/tags/suggest",
    tag = "tags",
    params(SuggestParams),
    responses(
        (status = 200, description = "Matching tags", body = Vec<TagSuggestion>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn suggest_tags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestParams>,
) -> Result<impl IntoResponse, HttpAppError> {
    let suggestions = state.tags.suggest_tags(&params.prefix).await?;
    Ok(Json(suggestions))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "tags",
    responses(
        (status = 200, description = "Distinct categories", body = Vec<String>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let categories = state.tags.list_all_categories().await?;
    Ok(Json(categories))
}
