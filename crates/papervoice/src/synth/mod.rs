//! Speech synthesis client.
//!
//! The synthesis collaborator writes the WAV file itself; client and
//! collaborator share a filesystem namespace, so the request carries the
//! destination path instead of streaming audio back.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;
use crate::worker::job::VoiceSettings;

/// Default per-request synthesis timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    speed: f32,
    output_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` to a WAV file at `destination`.
    fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSettings,
        destination: &Path,
    ) -> Result<(), SynthesisError>;
}

/// POSTs synthesis requests to the TTS service.
pub struct HttpSynthesisClient {
    client: reqwest::blocking::Client,
    url: String,
    timeout: Duration,
}

impl HttpSynthesisClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.to_string(),
            timeout,
        }
    }
}

impl SpeechSynthesizer for HttpSynthesisClient {
    fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSettings,
        destination: &Path,
    ) -> Result<(), SynthesisError> {
        let output_path = destination
            .to_str()
            .ok_or_else(|| SynthesisError::InvalidDestination {
                path: destination.to_path_buf(),
            })?;

        let request = SynthesisRequest {
            text,
            voice: &voice.voice,
            speed: voice.speed,
            output_path,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(self.timeout)
            .send()?;

        if !response.status().is_success() {
            return Err(SynthesisError::Status {
                code: response.status().as_u16(),
            });
        }

        let body: SynthesisResponse = response
            .json()
            .map_err(SynthesisError::Transport)?;

        if !body.success {
            return Err(SynthesisError::Rejected {
                message: body
                    .error
                    .unwrap_or_else(|| "synthesis service reported failure".to_string()),
            });
        }

        Ok(())
    }
}
