//! In-memory status store polled by the status endpoint collaborator.
//!
//! Per-job writes are serialized by the write lock, so pollers always
//! observe a complete record — never a half-written one. Terminal
//! records are immutable: late or duplicate deliveries for a finished
//! job are dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broadcast::job_progress::{JobProgressEvent, JobStage, JobState};

/// Snapshot of one job's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusRecord {
    pub job_id: String,
    pub state: JobState,
    /// Last reported progress. Non-decreasing; frozen on failure.
    pub progress: u8,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStatusRecord {
    fn queued(job_id: &str) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.to_string(),
            state: JobState::Queued,
            progress: 0,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Shared status store. Concurrent reads during execution, linearizable
/// per-job writes.
pub struct StatusStore {
    records: RwLock<HashMap<String, JobStatusRecord>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a freshly accepted job as QUEUED.
    ///
    /// Returns `false` if the id is already known — submission is
    /// idempotent per id, so the caller treats that as a no-op.
    pub fn insert_queued(&self, job_id: &str) -> bool {
        let mut records = self.write_records();
        if records.contains_key(job_id) {
            return false;
        }
        records.insert(job_id.to_string(), JobStatusRecord::queued(job_id));
        true
    }

    /// Applies a progress event to the job's record.
    ///
    /// Updates to an already-terminal record are dropped, which makes a
    /// retried delivery of a finished job a safe no-op. Progress never
    /// decreases; a failure freezes it at the last reported value.
    pub fn apply(&self, event: &JobProgressEvent) {
        let mut records = self.write_records();
        let record = records
            .entry(event.job_id.clone())
            .or_insert_with(|| JobStatusRecord::queued(&event.job_id));

        if record.is_terminal() {
            log::warn!(
                "Dropping update for terminal job {} (stage {})",
                event.job_id,
                event.stage
            );
            return;
        }

        record.updated_at = event.timestamp;

        match event.stage {
            JobStage::Completed => {
                record.progress = 100;
                record.completed_at = Some(event.timestamp);
                let output = match event.output.clone() {
                    Some(output) => output,
                    None => {
                        log::error!("Completion event for job {} carries no output", event.job_id);
                        return;
                    }
                };
                record.state = JobState::Completed { output };
            }
            JobStage::Failed => {
                // Progress deliberately untouched — frozen at last value.
                record.completed_at = Some(event.timestamp);
                record.state = JobState::Failed {
                    stage: event.failed_stage.unwrap_or(JobStage::Failed),
                    message: event
                        .error
                        .clone()
                        .unwrap_or_else(|| event.message.clone()),
                };
            }
            stage => {
                record.progress = record.progress.max(event.progress);
                record.state = JobState::Running {
                    stage,
                    progress: record.progress,
                    message: event.message.clone(),
                };
            }
        }
    }

    /// Returns the status snapshot for a job id.
    ///
    /// `None` is the distinct "not found" answer for unknown ids — an
    /// unknown id is never reported as a queued-looking job.
    pub fn status(&self, job_id: &str) -> Option<JobStatusRecord> {
        self.read_records().get(job_id).cloned()
    }

    /// Returns (queued_or_running, completed, failed) counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        let records = self.read_records();
        let mut active = 0;
        let mut completed = 0;
        let mut failed = 0;
        for record in records.values() {
            match record.state {
                JobState::Completed { .. } => completed += 1,
                JobState::Failed { .. } => failed += 1,
                _ => active += 1,
            }
        }
        (active, completed, failed)
    }

    fn read_records(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, JobStatusRecord>> {
        match self.records.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Status store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_records(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, JobStatusRecord>> {
        match self.records.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Status store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::job::JobOutput;

    fn output() -> JobOutput {
        JobOutput {
            audio_ref: "/audio/job-1".to_string(),
            text_length: 500,
            voice_used: "en_US-lessac-medium".to_string(),
        }
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let store = StatusStore::new();
        assert!(store.status("nope").is_none());
    }

    #[test]
    fn test_insert_queued_is_idempotent() {
        let store = StatusStore::new();
        assert!(store.insert_queued("job-1"));
        assert!(!store.insert_queued("job-1"));

        let record = store.status("job-1").unwrap();
        assert_eq!(record.state, JobState::Queued);
        assert_eq!(record.progress, 0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let store = StatusStore::new();
        store.insert_queued("job-1");

        for (stage, floor) in [
            (JobStage::Analyzing, 10),
            (JobStage::Extracting, 25),
            (JobStage::OcrFallback, 40),
            (JobStage::Processing, 60),
            (JobStage::Synthesizing, 80),
        ] {
            store.apply(&JobProgressEvent::stage("job-1", stage, "..."));
            let record = store.status("job-1").unwrap();
            assert_eq!(record.progress, floor);
        }
    }

    #[test]
    fn test_failure_freezes_progress() {
        let store = StatusStore::new();
        store.insert_queued("job-1");
        store.apply(&JobProgressEvent::stage(
            "job-1",
            JobStage::Synthesizing,
            "Generating audio...",
        ));
        store.apply(&JobProgressEvent::failed(
            "job-1",
            JobStage::Synthesizing,
            "service down",
        ));

        let record = store.status("job-1").unwrap();
        assert_eq!(record.progress, 80);
        assert!(matches!(
            record.state,
            JobState::Failed {
                stage: JobStage::Synthesizing,
                ..
            }
        ));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_terminal_record_is_immutable() {
        let store = StatusStore::new();
        store.insert_queued("job-1");
        store.apply(&JobProgressEvent::completed("job-1", output()));

        // A late duplicate delivery must not mutate the record.
        store.apply(&JobProgressEvent::stage(
            "job-1",
            JobStage::Analyzing,
            "late duplicate",
        ));
        store.apply(&JobProgressEvent::failed(
            "job-1",
            JobStage::Extracting,
            "late failure",
        ));

        let record = store.status("job-1").unwrap();
        assert_eq!(record.progress, 100);
        assert!(matches!(record.state, JobState::Completed { .. }));
    }

    #[test]
    fn test_repeated_polls_return_identical_terminal_record() {
        let store = StatusStore::new();
        store.insert_queued("job-1");
        store.apply(&JobProgressEvent::completed("job-1", output()));

        let first = store.status("job-1").unwrap();
        let second = store.status("job-1").unwrap();
        assert_eq!(first.state, second.state);
        assert_eq!(first.completed_at, second.completed_at);
    }

    #[test]
    fn test_counts() {
        let store = StatusStore::new();
        store.insert_queued("a");
        store.insert_queued("b");
        store.apply(&JobProgressEvent::completed("a", output()));
        store.insert_queued("c");
        store.apply(&JobProgressEvent::failed("c", JobStage::Extracting, "no text"));

        assert_eq!(store.counts(), (1, 1, 1));
    }
}
