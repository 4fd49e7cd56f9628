use serde::{Deserialize, Serialize};

use crate::worker::job::VoiceSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Directory where synthesized audio files are written.
    pub audio_directory: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    pub extraction: ServiceConfig,
    pub ocr: ServiceConfig,
    pub synthesis: ServiceConfig,
    #[serde(default)]
    pub math_speech: MathSpeechConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub voice_defaults: VoiceDefaults,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

/// One HTTP collaborator endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub url: String,
    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_service_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathSpeechConfig {
    /// Sidecar command line, program first.
    #[serde(default = "default_math_command")]
    pub command: Vec<String>,
    #[serde(default = "default_math_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_math_command() -> Vec<String> {
    vec!["node".to_string(), "sre-cli.js".to_string()]
}

fn default_math_timeout_secs() -> u64 {
    30
}

impl Default for MathSpeechConfig {
    fn default() -> Self {
        Self {
            command: default_math_command(),
            timeout_secs: default_math_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_min_extracted_chars")]
    pub min_extracted_chars: usize,
    #[serde(default = "default_max_speech_chars")]
    pub max_speech_chars: usize,
    #[serde(default = "default_soft_timeout_secs")]
    pub soft_timeout_secs: u64,
    #[serde(default = "default_hard_timeout_secs")]
    pub hard_timeout_secs: u64,
    #[serde(default = "default_artifact_ttl_hours")]
    pub artifact_ttl_hours: u64,
}

fn default_min_extracted_chars() -> usize {
    100
}

fn default_max_speech_chars() -> usize {
    5000
}

fn default_soft_timeout_secs() -> u64 {
    25 * 60
}

fn default_hard_timeout_secs() -> u64 {
    30 * 60
}

fn default_artifact_ttl_hours() -> u64 {
    24
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_extracted_chars: default_min_extracted_chars(),
            max_speech_chars: default_max_speech_chars(),
            soft_timeout_secs: default_soft_timeout_secs(),
            hard_timeout_secs: default_hard_timeout_secs(),
            artifact_ttl_hours: default_artifact_ttl_hours(),
        }
    }
}

/// Voice parameters applied when a job does not supply its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceDefaults {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_voice() -> String {
    "en_US-lessac-medium".to_string()
}

fn default_speed() -> f32 {
    1.0
}

impl Default for VoiceDefaults {
    fn default() -> Self {
        Self {
            language: default_language(),
            voice: default_voice(),
            speed: default_speed(),
        }
    }
}

impl VoiceDefaults {
    pub fn to_settings(&self) -> VoiceSettings {
        VoiceSettings {
            language: self.language.clone(),
            voice: self.voice.clone(),
            speed: self.speed,
        }
    }
}
