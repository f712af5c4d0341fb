//! Fake collaborators and server bootstrap for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use caption_audit::{
    app_state::AppState,
    config::AnalysisSettings,
    models::{caption::SpokenSegment, job::JobStatus, language::ContentLanguage},
    routes,
    services::{
        dictionary::WordList,
        media::{list_frames, MediaDecoder, MediaError},
        pipeline::{JobRunner, Pipeline},
        transcription::{SpeechToText, TranscriptionError},
        vision::{VisionError, VisionModel},
    },
    store::JobStore,
};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::fixtures::{dictionary_words, JPEG_MAGIC};

/// Vision model answering from a table keyed by frame index.
pub struct FakeVision {
    pub reachable: bool,
    pub replies: HashMap<usize, String>,
    /// Extra latency per frame index.
    pub delays: HashMap<usize, Duration>,
    pub calls: AtomicUsize,
}

impl FakeVision {
    pub fn new(replies: &[(usize, &str)]) -> Self {
        Self {
            reachable: true,
            replies: replies.iter().map(|(i, r)| (*i, r.to_string())).collect(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delays(mut self, delays: &[(usize, u64)]) -> Self {
        self.delays = delays
            .iter()
            .map(|(i, ms)| (*i, Duration::from_millis(*ms)))
            .collect();
        self
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new(&[])
        }
    }
}

#[async_trait]
impl VisionModel for FakeVision {
    async fn probe(&self) -> Result<(), VisionError> {
        if self.reachable {
            Ok(())
        } else {
            Err(VisionError::NotAnImage)
        }
    }

    async fn read_frame(
        &self,
        image: &[u8],
        _language: ContentLanguage,
    ) -> Result<String, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index: usize = std::str::from_utf8(&image[JPEG_MAGIC.len()..])
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        if let Some(delay) = self.delays.get(&index) {
            tokio::time::sleep(*delay).await;
        }
        Ok(self
            .replies
            .get(&index)
            .cloned()
            .unwrap_or_else(|| r#"{"text": null, "errors": []}"#.to_string()))
    }

    fn endpoint(&self) -> &str {
        "http://fake-ollama"
    }
}

/// Decoder that writes `frame_count` tiny JPEG-tagged files.
pub struct FakeMedia {
    pub frame_count: usize,
    pub fail_audio: bool,
}

impl FakeMedia {
    pub fn frames(frame_count: usize) -> Self {
        Self {
            frame_count,
            fail_audio: false,
        }
    }
}

#[async_trait]
impl MediaDecoder for FakeMedia {
    async fn sample_frames(
        &self,
        video: &Path,
        output_dir: &Path,
        _frame_rate: f64,
    ) -> Result<Vec<PathBuf>, MediaError> {
        assert!(video.exists(), "source video must exist while sampling");
        tokio::fs::create_dir_all(output_dir).await?;
        for i in 1..=self.frame_count {
            let mut bytes = JPEG_MAGIC.to_vec();
            bytes.extend_from_slice(i.to_string().as_bytes());
            tokio::fs::write(output_dir.join(format!("frame_{i:04}.jpg")), bytes).await?;
        }
        list_frames(output_dir).await
    }

    async fn extract_audio(
        &self,
        _video: &Path,
        audio_path: &Path,
        _sample_rate: u32,
    ) -> Result<(), MediaError> {
        if self.fail_audio {
            return Err(MediaError::Failed {
                step: "audio extraction",
                stderr: "moov atom not found".to_string(),
            });
        }
        tokio::fs::write(audio_path, b"RIFF").await?;
        Ok(())
    }
}

pub enum SpeechBehavior {
    Segments(Vec<SpokenSegment>),
    Panic,
    /// Wait for the notify before answering with these segments.
    Gated(Arc<Notify>, Vec<SpokenSegment>),
}

pub struct FakeSpeech {
    pub behavior: SpeechBehavior,
}

#[async_trait]
impl SpeechToText for FakeSpeech {
    async fn transcribe(
        &self,
        audio: &Path,
        _language: ContentLanguage,
    ) -> Result<Vec<SpokenSegment>, TranscriptionError> {
        assert!(audio.exists(), "audio must be extracted before transcription");
        match &self.behavior {
            SpeechBehavior::Segments(segments) => Ok(segments.clone()),
            SpeechBehavior::Panic => panic!("whisper model crashed"),
            SpeechBehavior::Gated(gate, segments) => {
                gate.notified().await;
                Ok(segments.clone())
            }
        }
    }
}

pub fn pipeline(vision: FakeVision, speech: FakeSpeech, media: FakeMedia) -> Pipeline {
    Pipeline::new(
        Arc::new(vision),
        Arc::new(speech),
        Arc::new(media),
        Arc::new(WordList::from_words(dictionary_words())),
        AnalysisSettings::default(),
    )
}

pub fn runner(pipeline: Pipeline, max_concurrent: usize) -> JobRunner {
    JobRunner::new(Arc::new(pipeline), Arc::new(JobStore::new()), max_concurrent)
}

/// Serve the API on an ephemeral port; returns its base URL.
pub async fn spawn_app(runner: JobRunner, vision: Arc<dyn VisionModel>, work_dir: &Path) -> String {
    let state = AppState::new(runner, vision, work_dir.to_path_buf());
    let app = routes::router(state, 10 * 1024 * 1024, None);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });
    format!("http://{addr}")
}

/// Wait until the job reaches `status` or the timeout elapses.
pub async fn wait_for_status(store: &JobStore, job_id: Uuid, status: JobStatus) -> bool {
    for _ in 0..200 {
        if store.get(job_id).map(|j| j.status) == Some(status) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Files left in `dir`.
pub fn remaining_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default()
}
