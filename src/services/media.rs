//! Frame sampling and audio extraction through ffmpeg.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXTENSION: &str = "jpg";

/// Turns a video into still frames and a speech-ready waveform.
#[async_trait]
pub trait MediaDecoder: Send + Sync {
    /// Extract frames at `frame_rate` per second into `output_dir`.
    ///
    /// Returned paths are in temporal order. An empty list means the input
    /// produced no frames; deciding whether that is fatal is left to callers.
    async fn sample_frames(
        &self,
        video: &Path,
        output_dir: &Path,
        frame_rate: f64,
    ) -> Result<Vec<PathBuf>, MediaError>;

    /// Write a mono WAV at `sample_rate` Hz to `audio_path`.
    async fn extract_audio(
        &self,
        video: &Path,
        audio_path: &Path,
        sample_rate: u32,
    ) -> Result<(), MediaError>;
}

/// [`MediaDecoder`] backed by the ffmpeg command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    binary: String,
}

impl FfmpegDecoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<Output, MediaError> {
        debug!(binary = %self.binary, ?args, "Running ffmpeg");
        Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MediaError::Spawn {
                binary: self.binary.clone(),
                source,
            })
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl MediaDecoder for FfmpegDecoder {
    async fn sample_frames(
        &self,
        video: &Path,
        output_dir: &Path,
        frame_rate: f64,
    ) -> Result<Vec<PathBuf>, MediaError> {
        tokio::fs::create_dir_all(output_dir).await?;

        let pattern = output_dir.join(format!("{FRAME_PREFIX}%04d.{FRAME_EXTENSION}"));
        let args = vec![
            "-i".to_string(),
            video.display().to_string(),
            "-vf".to_string(),
            format!("fps={frame_rate}"),
            pattern.display().to_string(),
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        let output = self.run(&args).await?;
        if !output.status.success() {
            // Truncated or odd containers often still yield usable frames.
            warn!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "ffmpeg frame sampling exited with an error"
            );
        }

        list_frames(output_dir).await
    }

    async fn extract_audio(
        &self,
        video: &Path,
        audio_path: &Path,
        sample_rate: u32,
    ) -> Result<(), MediaError> {
        let args = vec![
            "-i".to_string(),
            video.display().to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-vn".to_string(),
            audio_path.display().to_string(),
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(MediaError::Failed {
                step: "audio extraction",
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Sampled frame files in `dir`, in temporal order.
///
/// Ordered by the numeric suffix, so `frame_10000.jpg` follows `frame_9999.jpg`
/// once the zero padding runs out.
pub async fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, MediaError> {
    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(number) = frame_number(&path) {
            frames.push((number, path));
        }
    }
    frames.sort();
    Ok(frames.into_iter().map(|(_, path)| path).collect())
}

/// `frame_0042.jpg` -> 42. Anything else is not a sampled frame.
fn frame_number(path: &Path) -> Option<u64> {
    if path.extension().and_then(|e| e.to_str()) != Some(FRAME_EXTENSION) {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(FRAME_PREFIX)?
        .parse()
        .ok()
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg {step} failed: {stderr}")]
    Failed { step: &'static str, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
