use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::language::ContentLanguage;
use crate::models::report::AnalysisReport;

/// Lifecycle of an analysis job: queued -> processing -> done | error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Only single forward steps are legal.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Done)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Audio,
    Frames,
    Analyse,
    Compare,
    Done,
}

/// Human-readable progress published to status pollers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    pub step: String,
    pub pct: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_done: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<usize>,
}

impl Progress {
    pub fn queued() -> Self {
        Self {
            step: "Queued…".to_string(),
            pct: 0,
            phase: None,
            frames_done: None,
            total_frames: None,
        }
    }

    pub fn step(step: impl Into<String>, pct: u8, phase: Phase) -> Self {
        Self {
            step: step.into(),
            pct: pct.min(100),
            phase: Some(phase),
            frames_done: None,
            total_frames: None,
        }
    }

    pub fn frames(step: impl Into<String>, pct: u8, frames_done: usize, total_frames: usize) -> Self {
        Self {
            frames_done: Some(frames_done),
            total_frames: Some(total_frames),
            ..Self::step(step, pct, Phase::Analyse)
        }
    }
}

/// One submitted video and everything known about its analysis so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub language: ContentLanguage,
    pub progress: Progress,
    pub result: Option<AnalysisReport>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisJob {
    pub fn new(id: Uuid, language: ContentLanguage) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            language,
            progress: Progress::queued(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_only() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Done));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Done));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Error.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn test_progress_clamps_percent() {
        assert_eq!(Progress::step("x", 250, Phase::Done).pct, 100);
    }

    #[test]
    fn test_queued_progress_serializes_without_phase() {
        let value = serde_json::to_value(Progress::queued()).unwrap();
        assert_eq!(value, serde_json::json!({ "step": "Queued…", "pct": 0 }));
    }
}
