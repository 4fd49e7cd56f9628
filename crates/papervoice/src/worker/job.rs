use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::broadcast::job_progress::JobStage;

/// Voice parameters supplied at job creation. Immutable for the job's life.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceSettings {
    pub language: String,
    pub voice: String,
    /// Playback speed multiplier, must be > 0.
    pub speed: f32,
}

impl VoiceSettings {
    pub fn is_valid(&self) -> bool {
        self.speed > 0.0 && self.speed.is_finite()
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            voice: "en_US-lessac-medium".to_string(),
            speed: 1.0,
        }
    }
}

/// One document-to-audio conversion request.
///
/// The job exclusively owns `source_path` until it reaches a terminal
/// state; the pipeline deletes the file on every exit path.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source_path: PathBuf,
    pub voice_settings: VoiceSettings,
}

impl Job {
    /// Creates a new job with a generated id.
    pub fn new(source_path: PathBuf, voice_settings: VoiceSettings) -> Self {
        Self::with_id(
            uuid::Uuid::new_v4().to_string(),
            source_path,
            voice_settings,
        )
    }

    /// Creates a job with a caller-chosen id, e.g. when the upload layer
    /// already assigned one.
    pub fn with_id(id: String, source_path: PathBuf, voice_settings: VoiceSettings) -> Self {
        Self {
            id,
            source_path,
            voice_settings,
        }
    }
}

/// Result descriptor for a completed conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput {
    /// Reference to the audio artifact, e.g. `/audio/{job_id}`.
    pub audio_ref: String,
    /// Character count of the text that was synthesized.
    pub text_length: usize,
    /// Voice id the synthesis actually used.
    pub voice_used: String,
}

/// Outcome record sent back from a worker.
#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    pub output: Option<JobOutput>,
    /// Stage at which the job failed, with the error message.
    pub error: Option<(JobStage, String)>,
}

impl JobResult {
    pub fn success(job: &Job, output: JobOutput) -> Self {
        Self {
            job_id: job.id.clone(),
            success: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failure(job: &Job, stage: JobStage, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            success: false,
            output: None,
            error: Some((stage, error)),
        }
    }
}
