//! In-memory job registry.
//!
//! Entries are inserted before their worker starts and live for the process
//! lifetime. Each entry is written only by its own job runner; status readers
//! get cloned snapshots and may observe one field updated before another.

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::job::{AnalysisJob, JobStatus, Progress};
use crate::models::language::ContentLanguage;
use crate::models::report::AnalysisReport;

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, AnalysisJob>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct JobCounts {
    pub queued: usize,
    pub processing: usize,
    pub done: usize,
    pub error: usize,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in `queued` state.
    pub fn create(&self, language: ContentLanguage) -> AnalysisJob {
        let job = AnalysisJob::new(Uuid::new_v4(), language);
        self.insert(job.clone());
        job
    }

    /// Register a job whose id was chosen by the caller.
    pub fn insert(&self, job: AnalysisJob) {
        self.jobs.insert(job.id, job);
    }

    /// Snapshot of a job.
    pub fn get(&self, job_id: Uuid) -> Option<AnalysisJob> {
        self.jobs.get(&job_id).map(|entry| entry.value().clone())
    }

    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for entry in self.jobs.iter() {
            match entry.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Done => counts.done += 1,
                JobStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn mark_processing(&self, job_id: Uuid) -> Result<(), StoreError> {
        self.transition(job_id, JobStatus::Processing, |_| {})
    }

    /// Publish progress. The percentage never moves backwards.
    pub fn update_progress(&self, job_id: Uuid, progress: Progress) -> Result<(), StoreError> {
        let mut job = self.jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        if job.status.is_terminal() {
            return Err(StoreError::Finished(job_id));
        }
        let pct = progress.pct.max(job.progress.pct);
        job.progress = Progress { pct, ..progress };
        job.updated_at = Utc::now();
        Ok(())
    }

    /// Write the result exactly once and finish the job.
    pub fn complete(
        &self,
        job_id: Uuid,
        report: AnalysisReport,
        progress: Progress,
    ) -> Result<(), StoreError> {
        self.transition(job_id, JobStatus::Done, move |job| {
            job.result = Some(report);
            job.progress = progress;
        })
    }

    /// Fail the job; any partial result is discarded.
    pub fn fail(&self, job_id: Uuid, error: impl Into<String>) -> Result<(), StoreError> {
        let error = error.into();
        self.transition(job_id, JobStatus::Error, move |job| {
            job.result = None;
            job.error = Some(error);
        })
    }

    fn transition(
        &self,
        job_id: Uuid,
        next: JobStatus,
        apply: impl FnOnce(&mut AnalysisJob),
    ) -> Result<(), StoreError> {
        let mut job = self.jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        if !job.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                job_id,
                from: job.status,
                to: next,
            });
        }
        apply(job.value_mut());
        job.status = next;
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {0} already finished")]
    Finished(Uuid),

    #[error("Job {job_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::Phase;

    fn empty_report() -> AnalysisReport {
        AnalysisReport {
            language: ContentLanguage::English,
            total_frames: 0,
            frames_with_text: 0,
            errors: vec![],
            transcript: vec![],
            audio_transcript: vec![],
            caption_accuracy: vec![],
        }
    }

    #[test]
    fn test_create_is_queued() {
        let store = JobStore::new();
        let job = store.create(ContentLanguage::Hinglish);
        let snapshot = store.get(job.id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Queued);
        assert_eq!(snapshot.language, ContentLanguage::Hinglish);
        assert_eq!(snapshot.progress.pct, 0);
        assert!(snapshot.result.is_none());
    }

    #[test]
    fn test_unknown_job() {
        let store = JobStore::new();
        assert!(store.get(Uuid::new_v4()).is_none());
        assert!(matches!(
            store.mark_processing(Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_happy_path_transitions() {
        let store = JobStore::new();
        let id = store.create(ContentLanguage::English).id;
        store.mark_processing(id).unwrap();
        store
            .complete(id, empty_report(), Progress::step("Analysis complete!", 100, Phase::Done))
            .unwrap();

        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.result.is_some());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_terminal_state_is_absorbing() {
        let store = JobStore::new();
        let id = store.create(ContentLanguage::English).id;
        store.mark_processing(id).unwrap();
        store.fail(id, "boom").unwrap();

        assert!(store.fail(id, "again").is_err());
        assert!(store.complete(id, empty_report(), Progress::queued()).is_err());
        assert!(store.mark_processing(id).is_err());
        assert!(matches!(
            store.update_progress(id, Progress::step("late", 50, Phase::Compare)),
            Err(StoreError::Finished(_))
        ));

        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_cannot_skip_processing() {
        let store = JobStore::new();
        let id = store.create(ContentLanguage::English).id;
        assert!(matches!(
            store.complete(id, empty_report(), Progress::queued()),
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_queued_job_cannot_fail_directly() {
        let store = JobStore::new();
        let id = store.create(ContentLanguage::English).id;
        assert!(matches!(
            store.fail(id, "boom"),
            Err(StoreError::InvalidTransition { .. })
        ));
        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_progress_never_regresses() {
        let store = JobStore::new();
        let id = store.create(ContentLanguage::English).id;
        store.mark_processing(id).unwrap();
        store
            .update_progress(id, Progress::step("Comparing", 90, Phase::Compare))
            .unwrap();
        store
            .update_progress(id, Progress::step("Extracting", 12, Phase::Frames))
            .unwrap();

        let progress = store.get(id).unwrap().progress;
        assert_eq!(progress.pct, 90);
        assert_eq!(progress.step, "Extracting");
    }

    #[test]
    fn test_counts() {
        let store = JobStore::new();
        let a = store.create(ContentLanguage::English).id;
        store.create(ContentLanguage::English);
        store.mark_processing(a).unwrap();
        let counts = store.counts();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.done, 0);
    }
}
