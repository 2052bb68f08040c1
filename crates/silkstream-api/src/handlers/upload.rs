use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::CatalogService;
use axum::{extract::State, response::IntoResponse, Json};
use silkstream_core::models::{UploadUrlRequest, UploadUrlResponse};

#[utoipa::path(
    post,
    path = "/api/get-upload-url",
    tag = "upload",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Signed upload URL issued", body = UploadUrlResponse),
        (status = 400, description = "Invalid file name or type", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(catalog, request), fields(file_name = %request.file_name))]
pub async fn get_upload_url(
    State(catalog): State<CatalogService>,
    ValidatedJson(request): ValidatedJson<UploadUrlRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = catalog.create_upload_url(&request).await?;
    Ok(Json(response))
}
