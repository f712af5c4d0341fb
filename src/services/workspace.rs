use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Temporary files belonging to one job, named after its id so concurrent
/// jobs never share a path.
#[derive(Debug)]
pub struct JobWorkspace {
    video_path: PathBuf,
    frames_dir: PathBuf,
    audio_path: PathBuf,
}

impl JobWorkspace {
    pub fn new(root: &Path, job_id: Uuid) -> Self {
        Self {
            video_path: root.join(format!("video_{job_id}")),
            frames_dir: root.join(format!("frames_{job_id}")),
            audio_path: root.join(format!("audio_{job_id}.wav")),
        }
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Copy a local video in as this job's source. A failed copy leaves no
    /// partial file behind.
    pub async fn import_video(&self, source: &Path) -> std::io::Result<u64> {
        match tokio::fs::copy(source, &self.video_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&self.video_path).await {
                    log_removal_error(&self.video_path, remove);
                }
                Err(e)
            }
        }
    }

    /// Remove every artifact. Consumes the workspace so it runs once; each
    /// removal is attempted even if an earlier one fails.
    pub async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.frames_dir).await {
            log_removal_error(&self.frames_dir, e);
        }
        for path in [&self.video_path, &self.audio_path] {
            if let Err(e) = tokio::fs::remove_file(path).await {
                log_removal_error(path, e);
            }
        }
        debug!(video = %self.video_path.display(), "Job workspace cleaned up");
    }
}

fn log_removal_error(path: &Path, error: std::io::Error) {
    if error.kind() == std::io::ErrorKind::NotFound {
        return;
    }
    warn!(path = %path.display(), error = %error, "Failed to remove job artifact");
}
