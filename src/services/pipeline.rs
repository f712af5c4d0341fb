//! Job orchestration: audio, frames, per-frame analysis, correlation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{AnalysisSettings, AppConfig};
use crate::models::job::{Phase, Progress};
use crate::models::language::ContentLanguage;
use crate::models::report::AnalysisReport;
use crate::services::analyzer::{aggregate_errors, transcript_lines, FrameAnalyzer};
use crate::services::correlation::correlate;
use crate::services::dictionary::{Dictionary, DictionaryError, WordList};
use crate::services::media::{FfmpegDecoder, MediaDecoder, MediaError};
use crate::services::transcription::{SpeechToText, TranscriptionError, WhisperClient};
use crate::services::vision::{OllamaClient, VisionModel};
use crate::services::workspace::JobWorkspace;
use crate::store::{JobStore, StoreError};

/// Progress percentages for each milestone.
const PCT_AUDIO: u8 = 3;
const PCT_TRANSCRIBE: u8 = 7;
const PCT_FRAMES: u8 = 12;
const PCT_ANALYSE_START: u8 = 15;
const PCT_ANALYSE_SPAN: usize = 72;
const PCT_COMPARE: u8 = 90;

/// The analysis steps for one video, wired to its external services.
pub struct Pipeline {
    vision: Arc<dyn VisionModel>,
    speech: Arc<dyn SpeechToText>,
    media: Arc<dyn MediaDecoder>,
    analyzer: FrameAnalyzer,
    settings: AnalysisSettings,
}

impl Pipeline {
    pub fn new(
        vision: Arc<dyn VisionModel>,
        speech: Arc<dyn SpeechToText>,
        media: Arc<dyn MediaDecoder>,
        dictionary: Arc<dyn Dictionary>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            analyzer: FrameAnalyzer::new(vision.clone(), dictionary),
            vision,
            speech,
            media,
            settings,
        }
    }

    /// Wire the production services: Ollama, a Whisper server, ffmpeg and
    /// the configured word list.
    pub fn from_config(config: &AppConfig) -> Result<Self, DictionaryError> {
        let dictionary = WordList::from_path(&config.dictionary_path)?;
        info!(words = dictionary.len(), "Loaded dictionary");

        Ok(Self::new(
            Arc::new(OllamaClient::new(
                config.ollama_base_url.clone(),
                config.ollama_model.clone(),
                config.vision_timeout(),
                config.probe_timeout(),
            )),
            Arc::new(WhisperClient::new(
                config.whisper_base_url.clone(),
                config.whisper_model.clone(),
                config.transcribe_timeout(),
            )),
            Arc::new(FfmpegDecoder::new(config.ffmpeg_bin.clone())),
            Arc::new(dictionary),
            config.analysis_settings(),
        ))
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn vision(&self) -> &Arc<dyn VisionModel> {
        &self.vision
    }

    /// Run every step in order, publishing progress to `store`.
    pub async fn run(
        &self,
        store: &JobStore,
        job_id: Uuid,
        workspace: &JobWorkspace,
        language: ContentLanguage,
    ) -> Result<AnalysisReport, PipelineError> {
        if let Err(e) = self.vision.probe().await {
            warn!(endpoint = %self.vision.endpoint(), error = %e, "Vision model probe failed");
            return Err(PipelineError::ServiceUnreachable {
                endpoint: self.vision.endpoint().to_string(),
            });
        }

        store.update_progress(
            job_id,
            Progress::step("Extracting audio from video…", PCT_AUDIO, Phase::Audio),
        )?;
        self.media
            .extract_audio(
                workspace.video_path(),
                workspace.audio_path(),
                self.settings.audio_sample_rate,
            )
            .await?;

        store.update_progress(
            job_id,
            Progress::step("Transcribing audio with Whisper…", PCT_TRANSCRIBE, Phase::Audio),
        )?;
        let segments = self.speech.transcribe(workspace.audio_path(), language).await?;
        info!(segments = segments.len(), "Transcription complete");

        store.update_progress(
            job_id,
            Progress::step("Extracting video frames…", PCT_FRAMES, Phase::Frames),
        )?;
        let frames = self
            .media
            .sample_frames(
                workspace.video_path(),
                workspace.frames_dir(),
                self.settings.frame_rate,
            )
            .await?;
        if frames.is_empty() {
            return Err(PipelineError::NoFrames);
        }
        let total = frames.len();
        info!(frames = total, "Frames extracted");

        store.update_progress(
            job_id,
            Progress::step(
                format!("Extracted {total} frames — starting AI analysis…"),
                PCT_ANALYSE_START,
                Phase::Frames,
            ),
        )?;

        // `buffered` keeps results in frame order whatever the concurrency.
        let frame_rate = self.settings.frame_rate;
        let mut readings_stream = futures::stream::iter(frames.into_iter().enumerate())
            .map(|(i, path)| {
                let analyzer = self.analyzer.clone();
                async move { analyzer.analyze(&path, i + 1, language, frame_rate).await }
            })
            .buffered(self.settings.frame_concurrency.max(1));

        let mut readings = Vec::with_capacity(total);
        while let Some(reading) = readings_stream.next().await {
            readings.push(reading);
            let done = readings.len();
            store.update_progress(
                job_id,
                Progress::frames(
                    format!("Analysing frame {done} of {total}…"),
                    analyse_pct(done, total),
                    done,
                    total,
                ),
            )?;
        }

        store.update_progress(
            job_id,
            Progress::step("Comparing captions against audio…", PCT_COMPARE, Phase::Compare),
        )?;
        let caption_accuracy = correlate(&readings, &segments, language, &self.settings);

        let transcript = transcript_lines(&readings);
        Ok(AnalysisReport {
            language,
            total_frames: total,
            frames_with_text: transcript.len(),
            errors: aggregate_errors(&readings),
            transcript,
            audio_transcript: segments,
            caption_accuracy,
        })
    }
}

fn analyse_pct(done: usize, total: usize) -> u8 {
    let span = done * PCT_ANALYSE_SPAN / total.max(1);
    PCT_ANALYSE_START + span.min(PCT_ANALYSE_SPAN) as u8
}

/// Runs jobs in the background, at most `max_concurrent` at a time.
#[derive(Clone)]
pub struct JobRunner {
    pipeline: Arc<Pipeline>,
    store: Arc<JobStore>,
    permits: Arc<Semaphore>,
}

impl JobRunner {
    pub fn new(pipeline: Arc<Pipeline>, store: Arc<JobStore>, max_concurrent: usize) -> Self {
        Self {
            pipeline,
            store,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Start a job that is already registered as queued.
    pub fn spawn(
        &self,
        job_id: Uuid,
        workspace: JobWorkspace,
        language: ContentLanguage,
    ) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(
            async move {
                // Waiting for a permit keeps the job queued; the semaphore
                // is never closed, so acquiring only fails if it were.
                let _permit = runner.permits.clone().acquire_owned().await.ok();
                runner.execute(job_id, workspace, language).await;
            }
            .instrument(info_span!("job", job_id = %job_id)),
        )
    }

    /// Drive a queued job to a terminal state and clean up after it.
    pub async fn execute(&self, job_id: Uuid, workspace: JobWorkspace, language: ContentLanguage) {
        let started = Instant::now();
        metrics::gauge!("caption_jobs_active").increment(1.0);
        info!(%language, "Processing video");

        if let Err(e) = self.store.mark_processing(job_id) {
            // Only a queued job may start; anything else is left as it is.
            error!(error = %e, "Job could not be started");
            workspace.cleanup().await;
            metrics::gauge!("caption_jobs_active").decrement(1.0);
            return;
        }

        let outcome = AssertUnwindSafe(self.pipeline.run(&self.store, job_id, &workspace, language))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PipelineError::Panicked(panic_message(panic))));

        let recorded = match outcome {
            Ok(report) => {
                info!(
                    frames = report.total_frames,
                    errors = report.errors.len(),
                    rows = report.caption_accuracy.len(),
                    "Analysis complete"
                );
                metrics::counter!("caption_jobs_completed").increment(1);
                self.store.complete(
                    job_id,
                    report,
                    Progress::step("Analysis complete!", 100, Phase::Done),
                )
            }
            Err(e) => {
                error!(error = %e, "Analysis failed");
                metrics::counter!("caption_jobs_failed").increment(1);
                self.store.fail(job_id, e.to_string())
            }
        };
        if let Err(e) = recorded {
            error!(error = %e, "Failed to record job outcome");
        }

        workspace.cleanup().await;
        metrics::gauge!("caption_jobs_active").decrement(1.0);
        metrics::histogram!("caption_job_seconds").record(started.elapsed().as_secs_f64());
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fatal job errors. The display text is shown to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Cannot reach the vision model at {endpoint}. Make sure Ollama is running and the model is loaded.")]
    ServiceUnreachable { endpoint: String },

    #[error("Could not extract any frames. Is this a valid video file?")]
    NoFrames,

    #[error("{0}")]
    Media(#[from] MediaError),

    #[error("{0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Job state update failed: {0}")]
    Store(#[from] StoreError),

    #[error("Analysis crashed: {0}")]
    Panicked(String),
}
