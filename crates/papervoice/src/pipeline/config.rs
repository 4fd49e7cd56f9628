use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::worker::job::VoiceSettings;

/// The slice of configuration one pipeline run needs.
pub struct PipelineConfig {
    pub audio_directory: PathBuf,
    pub extraction_url: String,
    pub extraction_timeout: Duration,
    pub ocr_url: String,
    pub ocr_timeout: Duration,
    pub synthesis_url: String,
    pub synthesis_timeout: Duration,
    pub math_command: Vec<String>,
    pub math_timeout: Duration,
    pub min_extracted_chars: usize,
    pub max_speech_chars: usize,
    pub soft_timeout: Duration,
    pub hard_timeout: Duration,
    pub artifact_ttl: Duration,
    pub voice_defaults: VoiceSettings,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            audio_directory: PathBuf::from(&config.audio_directory),
            extraction_url: config.extraction.url.clone(),
            extraction_timeout: Duration::from_secs(config.extraction.timeout_secs),
            ocr_url: config.ocr.url.clone(),
            ocr_timeout: Duration::from_secs(config.ocr.timeout_secs),
            synthesis_url: config.synthesis.url.clone(),
            synthesis_timeout: Duration::from_secs(config.synthesis.timeout_secs),
            math_command: config.math_speech.command.clone(),
            math_timeout: Duration::from_secs(config.math_speech.timeout_secs),
            min_extracted_chars: config.limits.min_extracted_chars,
            max_speech_chars: config.limits.max_speech_chars,
            soft_timeout: Duration::from_secs(config.limits.soft_timeout_secs),
            hard_timeout: Duration::from_secs(config.limits.hard_timeout_secs),
            artifact_ttl: Duration::from_secs(config.limits.artifact_ttl_hours * 60 * 60),
            voice_defaults: config.voice_defaults.to_settings(),
        }
    }
}
