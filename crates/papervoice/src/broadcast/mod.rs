pub mod job_progress;
pub mod job_store;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent, JobStage, JobState};
pub use job_store::{JobStatusRecord, StatusStore};
