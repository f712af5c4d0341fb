use std::path::Path;
use std::str::FromStr;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::Json;
use garde::Validate;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::AnalysisJob;
use crate::models::language::ContentLanguage;
use crate::models::report::{JobStatusResponse, UploadResponse};
use crate::routes::ApiError;
use crate::services::workspace::JobWorkspace;

/// Metadata of an accepted upload.
#[derive(Debug, Validate)]
struct UploadForm {
    #[garde(length(min = 1, max = 255))]
    file_name: String,

    #[garde(skip)]
    language: ContentLanguage,
}

/// POST /upload — Submit a video for analysis.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let job_id = Uuid::new_v4();
    let workspace = JobWorkspace::new(&state.work_dir, job_id);

    let received = receive_upload(&mut multipart, workspace.video_path()).await;
    let form = match received {
        Ok(form) => form,
        Err(e) => {
            workspace.cleanup().await;
            return Err(e);
        }
    };

    info!(
        job_id = %job_id,
        file_name = %form.file_name,
        language = %form.language,
        "Video received"
    );
    metrics::counter!("caption_jobs_total").increment(1);

    state.jobs().insert(AnalysisJob::new(job_id, form.language));
    state.runner.spawn(job_id, workspace, form.language);

    Ok(Json(UploadResponse { job_id }))
}

/// Stream the `video` field to disk and collect the form fields.
async fn receive_upload(multipart: &mut Multipart, video_path: &Path) -> Result<UploadForm, ApiError> {
    let mut file_name: Option<String> = None;
    let mut language = ContentLanguage::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("video") => {
                let name = field.file_name().unwrap_or_default().to_string();
                if name.is_empty() {
                    return Err(ApiError::BadRequest("No file selected.".to_string()));
                }
                save_field(field, video_path).await?;
                file_name = Some(name);
            }
            Some("language") => {
                let value = field.text().await?;
                let value = value.trim();
                if !value.is_empty() {
                    language = ContentLanguage::from_str(value).map_err(|_| {
                        ApiError::BadRequest(format!("Unsupported language: {value}"))
                    })?;
                }
            }
            _ => {}
        }
    }

    let file_name =
        file_name.ok_or_else(|| ApiError::BadRequest("No video file provided.".to_string()))?;
    let form = UploadForm {
        file_name,
        language,
    };
    form.validate()
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {e}")))?;
    Ok(form)
}

async fn save_field(mut field: Field<'_>, path: &Path) -> Result<(), ApiError> {
    let mut file = tokio::fs::File::create(path).await?;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

/// GET /status/{job_id} — Poll a job's progress and result.
pub async fn get_job_status(
    State(state): State<AppState>,
    UrlPath(job_id): UrlPath<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job = Uuid::parse_str(&job_id)
        .ok()
        .and_then(|id| state.jobs().get(id))
        .ok_or(ApiError::NotFound("Job not found."))?;

    Ok(Json(JobStatusResponse {
        status: job.status,
        progress: job.progress,
        results: job.result,
        error: job.error,
    }))
}
