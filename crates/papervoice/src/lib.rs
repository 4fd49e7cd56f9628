pub mod artifact;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod mathspeech;
pub mod normalize;
pub mod pipeline;
pub mod sanitize;
pub mod synth;
pub mod worker;

pub use artifact::{ArtifactStore, AudioArtifact};
pub use broadcast::{
    JobProgressBroadcaster, JobProgressEvent, JobStage, JobState, JobStatusRecord, StatusStore,
};
pub use config::{load_config, Config};
pub use error::{
    ConfigError, ExtractionError, MathSpeechError, PapervoiceError, Result, SynthesisError,
    WorkerError,
};
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext, PipelineError};
pub use worker::{Job, JobOutput, JobResult, VoiceSettings, WorkerPool};
