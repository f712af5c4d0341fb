use std::sync::Arc;

use caption_audit::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::pipeline::{JobRunner, Pipeline},
    store::JobStore,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing caption-audit server");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!("caption_jobs_total", "Total videos submitted");
    metrics::describe_counter!("caption_jobs_completed", "Total analysis jobs completed");
    metrics::describe_counter!("caption_jobs_failed", "Total analysis jobs that failed");
    metrics::describe_gauge!("caption_jobs_active", "Jobs currently being processed");
    metrics::describe_histogram!("caption_job_seconds", "Wall time of one analysis job");
    metrics::describe_counter!("caption_frames_analyzed_total", "Frames sent through analysis");
    metrics::describe_counter!(
        "caption_frame_fallbacks_total",
        "Frames whose model call failed and yielded an empty reading"
    );

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .expect("Failed to create work directory");

    let pipeline = Pipeline::from_config(&config).expect("Failed to initialize analysis pipeline");
    let vision = pipeline.vision().clone();
    let runner = JobRunner::new(
        Arc::new(pipeline),
        Arc::new(JobStore::new()),
        config.max_concurrent_jobs,
    );

    let state = AppState::new(runner, vision, config.work_dir.clone());
    let app = routes::router(state, config.max_upload_bytes, Some(prometheus_handle));

    tracing::info!(
        ollama = %config.ollama_base_url,
        model = %config.ollama_model,
        whisper = %config.whisper_base_url,
        "Starting caption-audit on {}",
        config.bind_addr
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
