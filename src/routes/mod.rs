pub mod analyze;
pub mod health;
pub mod metrics;

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Build the HTTP API. `/metrics` is mounted only when a recorder handle is given.
pub fn router(
    state: AppState,
    max_upload_bytes: usize,
    prometheus: Option<Arc<PrometheusHandle>>,
) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .route("/upload", post(analyze::upload_video))
        .route("/status/{job_id}", get(analyze::get_job_status))
        .with_state(state);

    if let Some(handle) = prometheus {
        app = app.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        );
    }

    app.layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}

/// Errors returned by handlers as `{ "error": "..." }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Upload failed: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Multipart(e) => e.status(),
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
