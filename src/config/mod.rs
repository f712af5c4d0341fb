use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:5000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Ollama server hosting the vision model
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    /// Vision model name as registered in Ollama
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    /// Whisper server exposing an OpenAI-compatible transcription endpoint
    #[serde(default = "default_whisper_base_url")]
    pub whisper_base_url: String,

    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,

    /// ffmpeg executable used for frame sampling and audio extraction
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,

    /// Newline-separated English word list
    #[serde(default = "default_dictionary_path")]
    pub dictionary_path: PathBuf,

    /// Root directory for job-scoped temporary files
    #[serde(default = "std::env::temp_dir")]
    pub work_dir: PathBuf,

    /// Frames sampled per second of video
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    /// Mono waveform sample rate handed to speech recognition
    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,

    /// Seconds of slack either side of a spoken segment
    #[serde(default = "default_correlation_slack_secs")]
    pub correlation_slack_secs: f64,

    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    #[serde(default = "default_partial_threshold")]
    pub partial_threshold: f64,

    #[serde(default = "default_vision_timeout_secs")]
    pub vision_timeout_secs: u64,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_transcribe_timeout_secs")]
    pub transcribe_timeout_secs: u64,

    /// Jobs allowed to run at once; the rest wait in `queued`
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Frame analyses in flight per job (1 = sequential)
    #[serde(default = "default_frame_concurrency")]
    pub frame_concurrency: usize,

    /// Upload body limit in bytes (500 MB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "video-spellcheck".to_string()
}

fn default_whisper_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_whisper_model() -> String {
    "small".to_string()
}

fn default_ffmpeg_bin() -> String {
    "ffmpeg".to_string()
}

fn default_dictionary_path() -> PathBuf {
    PathBuf::from("/usr/share/dict/words")
}

fn default_frame_rate() -> f64 {
    0.5
}

fn default_audio_sample_rate() -> u32 {
    16_000
}

fn default_correlation_slack_secs() -> f64 {
    2.0
}

fn default_match_threshold() -> f64 {
    0.55
}

fn default_partial_threshold() -> f64 {
    0.25
}

fn default_vision_timeout_secs() -> u64 {
    120
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_transcribe_timeout_secs() -> u64 {
    1800
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_frame_concurrency() -> usize {
    1
}

fn default_max_upload_bytes() -> usize {
    500 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.analysis_settings().validate()?;
        Ok(config)
    }

    /// The tunables the analysis pipeline needs, detached from service wiring.
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            frame_rate: self.frame_rate,
            audio_sample_rate: self.audio_sample_rate,
            correlation_slack_secs: self.correlation_slack_secs,
            match_threshold: self.match_threshold,
            partial_threshold: self.partial_threshold,
            frame_concurrency: self.frame_concurrency.max(1),
        }
    }

    pub fn vision_timeout(&self) -> Duration {
        Duration::from_secs(self.vision_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn transcribe_timeout(&self) -> Duration {
        Duration::from_secs(self.transcribe_timeout_secs)
    }
}

/// Empirical constants for sampling, correlation and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub frame_rate: f64,
    pub audio_sample_rate: u32,
    pub correlation_slack_secs: f64,
    pub match_threshold: f64,
    pub partial_threshold: f64,
    pub frame_concurrency: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            audio_sample_rate: default_audio_sample_rate(),
            correlation_slack_secs: default_correlation_slack_secs(),
            match_threshold: default_match_threshold(),
            partial_threshold: default_partial_threshold(),
            frame_concurrency: default_frame_concurrency(),
        }
    }
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate.is_nan() || self.frame_rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "FRAME_RATE must be positive, got {}",
                self.frame_rate
            )));
        }
        if self.correlation_slack_secs < 0.0 {
            return Err(ConfigError::Invalid(
                "CORRELATION_SLACK_SECS must not be negative".to_string(),
            ));
        }
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.match_threshold) || !in_unit(self.partial_threshold) {
            return Err(ConfigError::Invalid(
                "MATCH_THRESHOLD and PARTIAL_THRESHOLD must lie within 0..=1".to_string(),
            ));
        }
        if self.partial_threshold > self.match_threshold {
            return Err(ConfigError::Invalid(format!(
                "PARTIAL_THRESHOLD ({}) exceeds MATCH_THRESHOLD ({})",
                self.partial_threshold, self.match_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
