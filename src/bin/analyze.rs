use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use caption_audit::{
    config::AppConfig,
    models::{job::JobStatus, language::ContentLanguage},
    services::{
        pipeline::{JobRunner, Pipeline},
        workspace::JobWorkspace,
    },
    store::JobStore,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: analyze <video> [english|hinglish]";

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the result JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(video) = args.next().map(PathBuf::from) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let language = match args.next().as_deref().map(ContentLanguage::from_str) {
        None => ContentLanguage::default(),
        Some(Ok(language)) => language,
        Some(Err(_)) => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let pipeline = match Pipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(JobStore::new());
    let runner = JobRunner::new(Arc::new(pipeline), store.clone(), 1);
    let job = store.create(language);
    let workspace = JobWorkspace::new(&config.work_dir, job.id);

    if let Err(e) = tokio::fs::create_dir_all(&config.work_dir).await {
        eprintln!("Cannot create {}: {e}", config.work_dir.display());
        return ExitCode::FAILURE;
    }

    // The job deletes its source video, so work on a copy.
    if let Err(e) = workspace.import_video(&video).await {
        eprintln!("Cannot read {}: {e}", video.display());
        workspace.cleanup().await;
        return ExitCode::FAILURE;
    }

    tracing::info!(job_id = %job.id, video = %video.display(), "Analyzing local video");
    runner.execute(job.id, workspace, language).await;

    let Some(finished) = store.get(job.id) else {
        return ExitCode::FAILURE;
    };
    match (finished.status, finished.result) {
        (JobStatus::Done, Some(report)) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to serialize result: {e}");
                ExitCode::FAILURE
            }
        },
        _ => {
            eprintln!(
                "Analysis failed: {}",
                finished.error.as_deref().unwrap_or("unknown error")
            );
            ExitCode::FAILURE
        }
    }
}
