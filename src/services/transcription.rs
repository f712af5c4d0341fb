use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;

use crate::models::caption::SpokenSegment;
use crate::models::language::ContentLanguage;

/// Speech recognition over an extracted waveform.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Ordered segments with non-empty text.
    async fn transcribe(
        &self,
        audio: &Path,
        language: ContentLanguage,
    ) -> Result<Vec<SpokenSegment>, TranscriptionError>;
}

/// Client for a Whisper server with an OpenAI-compatible
/// `/v1/audio/transcriptions` endpoint (faster-whisper-server, speaches, ...).
pub struct WhisperClient {
    http: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

impl WhisperClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(
        &self,
        audio: &Path,
        language: ContentLanguage,
    ) -> Result<Vec<SpokenSegment>, TranscriptionError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/wav")?,
            )
            .text("model", self.model.clone())
            .text("language", language.speech_language())
            .text("response_format", "verbose_json");

        let response = self
            .http
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let body: VerboseTranscription = response.json().await?;
        Ok(clean_segments(
            body.segments
                .into_iter()
                .map(|s| SpokenSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
        ))
    }
}

/// Trim text, drop empty segments, order by start time.
pub fn clean_segments(segments: Vec<SpokenSegment>) -> Vec<SpokenSegment> {
    let mut cleaned: Vec<SpokenSegment> = segments
        .into_iter()
        .filter_map(|mut s| {
            s.text = s.text.trim().to_string();
            (!s.text.is_empty()).then_some(s)
        })
        .collect();
    cleaned.sort_by(|a, b| a.start.total_cmp(&b.start));
    cleaned
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("Speech-to-text request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read extracted audio: {0}")]
    Io(#[from] std::io::Error),
}
