use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.audio_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "audio_directory must not be empty".to_string(),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    for (name, service) in [
        ("extraction", &config.extraction),
        ("ocr", &config.ocr),
        ("synthesis", &config.synthesis),
    ] {
        if service.url.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("{} url must not be empty", name),
            });
        }
        if service.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                message: format!("{} timeout_secs must be positive", name),
            });
        }
    }

    if config.math_speech.command.is_empty() {
        return Err(ConfigError::Validation {
            message: "math_speech command must not be empty".to_string(),
        });
    }

    let limits = &config.limits;
    if limits.hard_timeout_secs <= limits.soft_timeout_secs {
        return Err(ConfigError::Validation {
            message: "hard_timeout_secs must exceed soft_timeout_secs".to_string(),
        });
    }
    if limits.max_speech_chars == 0 {
        return Err(ConfigError::Validation {
            message: "max_speech_chars must be positive".to_string(),
        });
    }

    if !(config.voice_defaults.speed > 0.0 && config.voice_defaults.speed.is_finite()) {
        return Err(ConfigError::Validation {
            message: "voice_defaults speed must be a positive finite number".to_string(),
        });
    }

    Ok(())
}
