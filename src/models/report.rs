use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::caption::{AccuracyRow, SpokenSegment};
use crate::models::frame::SpellingError;
use crate::models::job::{JobStatus, Progress};
use crate::models::language::ContentLanguage;

/// Final result of a finished job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub language: ContentLanguage,
    pub total_frames: usize,
    pub frames_with_text: usize,
    pub errors: Vec<SpellingError>,
    pub transcript: Vec<TranscriptLine>,
    pub audio_transcript: Vec<SpokenSegment>,
    pub caption_accuracy: Vec<AccuracyRow>,
}

/// On-screen text of one frame, for the reading transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptLine {
    pub timestamp: String,
    pub timestamp_sec: u64,
    pub text: String,
}

/// Response after submitting a video.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: Uuid,
}

/// Response for querying job status.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
    pub progress: Progress,
    pub results: Option<AnalysisReport>,
    pub error: Option<String>,
}
