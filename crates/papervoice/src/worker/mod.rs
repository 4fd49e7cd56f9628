pub mod job;
pub mod pool;

pub use job::{Job, JobOutput, JobResult, VoiceSettings};
pub use pool::{PipelineFactory, WorkerPool};

// Re-export crossbeam_channel for embedding binaries
pub use crossbeam_channel;
