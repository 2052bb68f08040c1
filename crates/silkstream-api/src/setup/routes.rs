//! Route configuration and setup

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use silkstream_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// JSON bodies only; video bytes go straight to storage through signed URLs.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Setup all application routes. Every route is served under `/api` and at the root.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let routes = api_routes();

    let app = Router::new()
        .route("/api/openapi.json", get(openapi_json))
        .nest("/api", routes.clone())
        .merge(routes)
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/get-upload-url", post(handlers::upload::get_upload_url))
        .route("/videos", get(handlers::videos::list_videos))
        .route("/videos-archive", get(handlers::videos::list_archive))
        .route("/videos/batch-delete", post(handlers::videos::batch_delete))
        .route("/videos/batch-upsert", post(handlers::metadata::batch_upsert))
        .route(
            "/videos/random-favorites",
            get(handlers::favorites::random_favorites),
        )
        .route(
            "/videos/{id}",
            get(handlers::videos::get_video).delete(handlers::videos::delete_video),
        )
        .route(
            "/videos/{id}/metadata",
            get(handlers::metadata::get_metadata)
                .post(handlers::metadata::create_metadata)
                .patch(handlers::metadata::update_metadata),
        )
        .route(
            "/videos/{id}/favorite",
            post(handlers::favorites::toggle_favorite),
        )
        .route(
            "/videos/{id}/is-favorite",
            get(handlers::favorites::is_favorite),
        )
        .route("/tags", get(handlers::tags::list_tags))
        .route("/tags/suggest", get(handlers::tags::suggest_tags))
        .route("/categories", get(handlers::tags::list_categories))
        .route("/admin/reindex", post(handlers::admin::reindex))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.server.cors_origins.iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .server
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
