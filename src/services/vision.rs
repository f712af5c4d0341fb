use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::language::ContentLanguage;

const ENGLISH_PROMPT: &str = "What text is shown on screen? Are there any spelling errors?";

const HINGLISH_PROMPT: &str = concat!(
    "What text is shown on screen? Are there any spelling errors? ",
    "This video uses Hinglish, Hindi words written in Roman/English script. ",
    "Words like 'kya', 'hai', 'nahi', 'bhai', 'yaar', 'aur', 'bhi', 'toh', 'matlab' ",
    "are correctly spelled Hinglish and must NOT be flagged as errors."
);

/// A vision-capable model that reads on-screen text off a frame.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Cheap liveness check run before a job starts.
    async fn probe(&self) -> Result<(), VisionError>;

    /// Raw reply text for one frame image.
    async fn read_frame(
        &self,
        image: &[u8],
        language: ContentLanguage,
    ) -> Result<String, VisionError>;

    /// Where the service lives, for error messages.
    fn endpoint(&self) -> &str;
}

/// Client for a vision model served by Ollama.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
    probe_timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    format: serde_json::Value,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            request_timeout,
            probe_timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// JSON schema the reply must satisfy: `{text: string|null, errors: [{word, suggestion}]}`.
pub fn reply_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "text": { "type": ["string", "null"] },
            "errors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "word": { "type": "string" },
                        "suggestion": { "type": "string" }
                    },
                    "required": ["word", "suggestion"]
                }
            }
        },
        "required": ["text", "errors"]
    })
}

pub fn prompt_for(language: ContentLanguage) -> &'static str {
    match language {
        ContentLanguage::English => ENGLISH_PROMPT,
        ContentLanguage::Hinglish => HINGLISH_PROMPT,
    }
}

#[async_trait]
impl VisionModel for OllamaClient {
    async fn probe(&self) -> Result<(), VisionError> {
        self.http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.probe_timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn read_frame(
        &self,
        image: &[u8],
        language: ContentLanguage,
    ) -> Result<String, VisionError> {
        image::guess_format(image).map_err(|_| VisionError::NotAnImage)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt_for(language),
                images: vec![base64::engine::general_purpose::STANDARD.encode(image)],
            }],
            format: reply_schema(),
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let chat: ChatResponse = response.json().await?;
        Ok(chat
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default())
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Frame is not a recognized image format")]
    NotAnImage,
}
