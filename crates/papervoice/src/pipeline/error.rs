use thiserror::Error;

use crate::error::{ExtractionError, SynthesisError};

/// Fatal pipeline failures. Each one transitions the job to FAILED and
/// stops further stage execution.
///
/// Math-speech failures are deliberately absent: they degrade to a
/// placeholder at assembly time and never fail the job.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("job exceeded hard time limit ({elapsed_secs}s elapsed)")]
    Timeout { elapsed_secs: u64 },
}
