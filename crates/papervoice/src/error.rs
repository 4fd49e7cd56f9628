use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PapervoiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Extraction service returned status {code}")]
    Status { code: u16 },

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),

    #[error("No usable text could be extracted from the document")]
    NoUsableText,
}

#[derive(Error, Debug)]
pub enum MathSpeechError {
    #[error("Failed to spawn math-speech engine '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Math-speech engine I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Math-speech engine timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Math-speech engine failed: {detail}")]
    Engine { detail: String },
}

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Synthesis service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Synthesis service returned status {code}")]
    Status { code: u16 },

    #[error("Synthesis service rejected the request: {message}")]
    Rejected { message: String },

    #[error("Invalid destination path '{path}'")]
    InvalidDestination { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Job failed: {0}")]
    JobFailed(String),
}

pub type Result<T> = std::result::Result<T, PapervoiceError>;
