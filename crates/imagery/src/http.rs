//! HTTP endpoint serving signed image URLs.

use crate::config::ImageryConfig;
use crate::service::ImageService;
use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use imagery_error::{ConfigError, ImageryError, ImageryResult};
use serde_json::json;

/// Served images never change under a URL, so clients may cache forever.
pub const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// State shared by the image handlers.
#[derive(Clone)]
pub struct ApiState {
    service: ImageService,
}

impl ApiState {
    /// Creates new API state.
    pub fn new(service: ImageService) -> Self {
        Self { service }
    }
}

/// Router serving `GET {route_prefix}{file}` and `GET /health`.
///
/// `route_prefix` must start and end with `/`, see
/// [`ImageryConfig::route_prefix`].
pub fn create_router(service: ImageService, route_prefix: &str) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(&format!("{}:file", route_prefix), get(get_image))
        .with_state(ApiState::new(service))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

async fn get_image(
    State(state): State<ApiState>,
    Path(file): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    match state
        .service
        .serve(&file, query.as_deref().unwrap_or_default())
        .await
    {
        Ok(image) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, image.content_type()),
                (header::CACHE_CONTROL, CACHE_CONTROL),
            ],
            image.bytes,
        )
            .into_response(),
        Err(e) => error_response(&file, e),
    }
}

fn error_response(file: &str, e: ImageryError) -> Response {
    if e.is_not_found() {
        tracing::debug!(file, error = %e, "Image not found");
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }
    if e.is_bad_request() {
        tracing::debug!(file, error = %e, "Rejected image request");
        return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
    }
    if e.is_store_not_registered() {
        tracing::error!(file, error = %e, "Image backend is not registered");
    } else {
        tracing::warn!(file, error = %e, "Failed to serve image");
    }
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

/// Serve images on `config.addr` until Ctrl-C.
#[tracing::instrument(skip_all, fields(addr = %config.addr))]
pub async fn serve_http(config: &ImageryConfig, service: ImageService) -> ImageryResult<()> {
    if !config.enabled {
        tracing::warn!("Image endpoint is disabled");
        return Ok(());
    }

    let route_prefix = config.route_prefix();
    let router = create_router(service, &route_prefix);
    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .map_err(|e| ConfigError::new(format!("Failed to bind {}: {}", config.addr, e)))?;

    tracing::info!(prefix = %route_prefix, "Serving images");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConfigError::new(format!("HTTP server failed: {}", e)))?;

    tracing::info!("Image server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
