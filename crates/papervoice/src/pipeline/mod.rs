pub mod config;
pub mod context;
pub mod deadline;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::{PipelineContext, SourceFileGuard};
pub use deadline::JobDeadline;
pub use error::PipelineError;
pub use progress::{NoopProgress, ProgressEvent, ProgressReporter, StoreProgress};
pub use runner::Pipeline;
