use std::path::PathBuf;

use log::warn;

use crate::extract::ExtractedDocument;
use crate::worker::job::Job;

pub struct PipelineContext {
    // Input
    pub job: Job,

    // Extraction result — guaranteed Some after step_extract
    pub extracted: Option<ExtractedDocument>,

    // Normalized narration text — guaranteed Some after step_normalize
    pub speech_text: Option<String>,
}

impl PipelineContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            extracted: None,
            speech_text: None,
        }
    }
}

/// Deletes the job's source file when dropped.
///
/// The guard is created at the top of a pipeline run, so the file goes
/// away on success, failure, and panic alike, exactly once.
pub struct SourceFileGuard {
    path: PathBuf,
}

impl SourceFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for SourceFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to delete source file {}: {}",
                crate::sanitize::redact_path(&self.path),
                e
            ),
        }
    }
}
