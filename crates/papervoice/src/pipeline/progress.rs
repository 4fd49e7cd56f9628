use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broadcast::job_progress::{JobProgressEvent, JobStage};
use crate::broadcast::job_store::StatusStore;
use crate::worker::job::JobOutput;

/// Events emitted by the pipeline during processing.
pub enum ProgressEvent {
    Stage { stage: JobStage, message: String },
    Completed { output: JobOutput },
    Failed { stage: JobStage, error: String },
}

impl ProgressEvent {
    pub fn stage(stage: JobStage, message: &str) -> Self {
        ProgressEvent::Stage {
            stage,
            message: message.to_string(),
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges pipeline events to the shared status store and, when wired,
/// the broadcast channel consumed by streaming status bridges.
pub struct StoreProgress {
    job_id: String,
    store: Arc<StatusStore>,
    sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
}

impl StoreProgress {
    pub fn new(
        job_id: &str,
        store: Arc<StatusStore>,
        sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            store,
            sender,
        }
    }
}

impl ProgressReporter for StoreProgress {
    fn report(&self, event: ProgressEvent) {
        let event = match event {
            ProgressEvent::Stage { stage, message } => {
                JobProgressEvent::stage(&self.job_id, stage, &message)
            }
            ProgressEvent::Completed { output } => {
                JobProgressEvent::completed(&self.job_id, output)
            }
            ProgressEvent::Failed { stage, error } => {
                JobProgressEvent::failed(&self.job_id, stage, &error)
            }
        };

        // The store applies first so pollers never lag behind subscribers.
        self.store.apply(&event);
        if let Some(sender) = &self.sender {
            // No active receivers is fine
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::job_progress::JobState;

    #[test]
    fn test_store_progress_applies_stage_events() {
        let store = Arc::new(StatusStore::new());
        store.insert_queued("job-1");
        let progress = StoreProgress::new("job-1", Arc::clone(&store), None);

        progress.report(ProgressEvent::stage(
            JobStage::Extracting,
            "Extracting text and mathematics...",
        ));

        let record = store.status("job-1").unwrap();
        assert_eq!(record.progress, 25);
        assert!(matches!(record.state, JobState::Running { .. }));
    }

    #[test]
    fn test_store_progress_forwards_to_broadcast() {
        let store = Arc::new(StatusStore::new());
        store.insert_queued("job-1");
        let (sender, mut rx) = broadcast::channel(10);
        let progress = StoreProgress::new("job-1", Arc::clone(&store), Some(Arc::new(sender)));

        progress.report(ProgressEvent::stage(JobStage::Analyzing, "Analyzing document structure..."));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.job_id, "job-1");
        assert_eq!(event.progress, 10);
    }
}
