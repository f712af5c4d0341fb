use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::store::JobCounts;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
    pub jobs: JobCounts,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub vision_model: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub endpoint: String,
    pub latency_ms: Option<u64>,
}

/// GET /health — vision service reachability and job registry counts.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();

    let vision_check = match state.vision.probe().await {
        Ok(()) => ComponentHealth {
            status: "ok".to_string(),
            endpoint: state.vision.endpoint().to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(_) => ComponentHealth {
            status: "error".to_string(),
            endpoint: state.vision.endpoint().to_string(),
            latency_ms: None,
        },
    };

    let healthy = vision_check.status == "ok";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            vision_model: vision_check,
        },
        jobs: state.jobs().counts(),
    };

    (status_code, Json(response))
}
