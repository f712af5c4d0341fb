use std::path::PathBuf;
use std::sync::Arc;

use crate::services::{pipeline::JobRunner, vision::VisionModel};
use crate::store::JobStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub runner: JobRunner,
    pub vision: Arc<dyn VisionModel>,
    pub work_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(runner: JobRunner, vision: Arc<dyn VisionModel>, work_dir: PathBuf) -> Self {
        Self {
            runner,
            vision,
            work_dir: Arc::new(work_dir),
        }
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        self.runner.store()
    }
}
