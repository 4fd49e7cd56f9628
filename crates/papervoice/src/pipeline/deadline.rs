use std::time::{Duration, Instant};

use log::warn;

use super::error::PipelineError;

/// Default soft limit: a job this old logs a warning but keeps running.
pub const DEFAULT_SOFT_LIMIT: Duration = Duration::from_secs(25 * 60);

/// Default hard limit: a job this old fails before its next stage.
pub const DEFAULT_HARD_LIMIT: Duration = Duration::from_secs(30 * 60);

/// Wall-clock budget for one pipeline run, checked at stage boundaries.
///
/// Every external call carries its own timeout, so the boundary check is
/// enough to keep total wall clock bounded without interrupting a stage
/// mid-flight.
pub struct JobDeadline {
    started: Instant,
    soft: Duration,
    hard: Duration,
    soft_warned: bool,
}

impl JobDeadline {
    pub fn new(soft: Duration, hard: Duration) -> Self {
        Self {
            started: Instant::now(),
            soft,
            hard,
            soft_warned: false,
        }
    }

    /// Checks the budget before entering the next stage.
    ///
    /// Past the soft limit, warns once and continues. Past the hard
    /// limit, returns the timeout error that fails the job.
    pub fn check(&mut self, job_id: &str) -> Result<(), PipelineError> {
        let elapsed = self.started.elapsed();

        if elapsed >= self.hard {
            return Err(PipelineError::Timeout {
                elapsed_secs: elapsed.as_secs(),
            });
        }

        if elapsed >= self.soft && !self.soft_warned {
            self.soft_warned = true;
            warn!(
                "Job {} running long ({}s, soft limit {}s)",
                job_id,
                elapsed.as_secs(),
                self.soft.as_secs()
            );
        }

        Ok(())
    }
}

impl Default for JobDeadline {
    fn default() -> Self {
        Self::new(DEFAULT_SOFT_LIMIT, DEFAULT_HARD_LIMIT)
    }
}
