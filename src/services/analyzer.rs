//! Per-frame reading of on-screen text and spelling errors.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::frame::{
    format_timestamp, frame_timestamp, FrameReading, SpellingError, VisionReply,
};
use crate::models::language::ContentLanguage;
use crate::models::report::TranscriptLine;
use crate::services::dictionary::{confirm_errors, Dictionary};
use crate::services::reply::parse_reply;
use crate::services::vision::VisionModel;

/// Reads one frame at a time through the vision model and filters the reply.
///
/// Never fails: unreachable models, bad replies and echoed prompts all turn
/// into a reading with no text and no errors.
#[derive(Clone)]
pub struct FrameAnalyzer {
    vision: Arc<dyn VisionModel>,
    dictionary: Arc<dyn Dictionary>,
}

impl FrameAnalyzer {
    pub fn new(vision: Arc<dyn VisionModel>, dictionary: Arc<dyn Dictionary>) -> Self {
        Self { vision, dictionary }
    }

    pub async fn analyze(
        &self,
        frame: &Path,
        frame_index: usize,
        language: ContentLanguage,
        frame_rate: f64,
    ) -> FrameReading {
        let timestamp_sec = frame_timestamp(frame_index, frame_rate);
        let reply = self.request_reply(frame, frame_index, language).await;

        let errors = if language.uses_dictionary() {
            confirm_errors(reply.errors, self.dictionary.as_ref())
        } else {
            reply.errors
        };

        metrics::counter!("caption_frames_analyzed_total").increment(1);
        FrameReading {
            frame_index,
            timestamp_sec,
            text: reply.text,
            errors,
        }
    }

    async fn request_reply(
        &self,
        frame: &Path,
        frame_index: usize,
        language: ContentLanguage,
    ) -> VisionReply {
        let image = match tokio::fs::read(frame).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(frame_index, error = %e, "Failed to read frame image");
                metrics::counter!("caption_frame_fallbacks_total").increment(1);
                return VisionReply::empty();
            }
        };

        match self.vision.read_frame(&image, language).await {
            Ok(raw) => {
                debug!(frame_index, reply_len = raw.len(), "Vision model replied");
                parse_reply(&raw)
            }
            Err(e) => {
                warn!(frame_index, error = %e, "Vision model call failed, using empty reading");
                metrics::counter!("caption_frame_fallbacks_total").increment(1);
                VisionReply::empty()
            }
        }
    }
}

/// Flatten per-frame errors into one list, keeping the first occurrence of
/// each word (case-insensitive).
pub fn aggregate_errors(frames: &[FrameReading]) -> Vec<SpellingError> {
    let mut seen = HashSet::new();
    let mut aggregated = Vec::new();

    for frame in frames {
        for err in &frame.errors {
            let key = err.word.to_lowercase();
            if key.is_empty() || !seen.insert(key) {
                continue;
            }
            let context = err
                .context
                .clone()
                .or_else(|| frame.text.clone())
                .unwrap_or_default();
            aggregated.push(SpellingError {
                word: err.word.clone(),
                suggestion: err.suggestion.clone(),
                context,
                timestamp_sec: frame.timestamp_sec,
                timestamp: format_timestamp(frame.timestamp_sec),
            });
        }
    }
    aggregated
}

/// Reading transcript: every frame that showed text, in frame order.
pub fn transcript_lines(frames: &[FrameReading]) -> Vec<TranscriptLine> {
    frames
        .iter()
        .filter_map(|frame| {
            frame.visible_text().map(|text| TranscriptLine {
                timestamp: format_timestamp(frame.timestamp_sec),
                timestamp_sec: frame.timestamp_sec,
                text: text.to_string(),
            })
        })
        .collect()
}
