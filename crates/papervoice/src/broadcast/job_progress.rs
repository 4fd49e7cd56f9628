//! Job progress events and broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::worker::job::JobOutput;

/// Stage of job processing, in strict forward order.
///
/// Each non-terminal stage carries a fixed progress floor; `Failed` has
/// none — progress is frozen at the last reported value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Queued,
    Analyzing,
    Extracting,
    OcrFallback,
    Processing,
    Synthesizing,
    Completed,
    Failed,
}

impl JobStage {
    /// Fixed progress floor for this stage, `None` for `Failed`.
    pub fn progress_floor(&self) -> Option<u8> {
        match self {
            JobStage::Queued => Some(0),
            JobStage::Analyzing => Some(10),
            JobStage::Extracting => Some(25),
            JobStage::OcrFallback => Some(40),
            JobStage::Processing => Some(60),
            JobStage::Synthesizing => Some(80),
            JobStage::Completed => Some(100),
            JobStage::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Failed)
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStage::Queued => write!(f, "queued"),
            JobStage::Analyzing => write!(f, "analyzing"),
            JobStage::Extracting => write!(f, "extracting"),
            JobStage::OcrFallback => write!(f, "ocr_fallback"),
            JobStage::Processing => write!(f, "processing"),
            JobStage::Synthesizing => write!(f, "synthesizing"),
            JobStage::Completed => write!(f, "completed"),
            JobStage::Failed => write!(f, "failed"),
        }
    }
}

/// Externally visible job state, exhaustively matchable by status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running {
        stage: JobStage,
        progress: u8,
        message: String,
    },
    Completed {
        output: JobOutput,
    },
    Failed {
        stage: JobStage,
        message: String,
    },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }
}

/// Progress event for a single job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Unique job identifier.
    pub job_id: String,
    /// Stage the job just entered.
    pub stage: JobStage,
    /// Progress at this stage (the stage's floor).
    pub progress: u8,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
    /// Conversion output (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<JobOutput>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stage at which the job failed (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<JobStage>,
}

impl JobProgressEvent {
    /// Creates a stage-transition event carrying the stage's progress floor.
    pub fn stage(job_id: &str, stage: JobStage, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage,
            progress: stage.progress_floor().unwrap_or(0),
            message: message.to_string(),
            timestamp: Utc::now(),
            output: None,
            error: None,
            failed_stage: None,
        }
    }

    /// Creates a completion event.
    pub fn completed(job_id: &str, output: JobOutput) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: JobStage::Completed,
            progress: 100,
            message: "Audio generation completed".to_string(),
            timestamp: Utc::now(),
            output: Some(output),
            error: None,
            failed_stage: None,
        }
    }

    /// Creates a failure event. `progress` is not meaningful here — the
    /// status store freezes the last reported value.
    pub fn failed(job_id: &str, failed_stage: JobStage, error: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: JobStage::Failed,
            progress: 0,
            message: format!("Processing failed: {}", error),
            timestamp: Utc::now(),
            output: None,
            error: Some(error.to_string()),
            failed_stage: Some(failed_stage),
        }
    }
}

/// Broadcasts job progress events for streaming to pollers or SSE bridges.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    /// Gets the inner sender for wiring into a worker pool.
    pub fn sender(&self) -> Arc<broadcast::Sender<JobProgressEvent>> {
        Arc::clone(&self.sender)
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
