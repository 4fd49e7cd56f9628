//! OCR fallback extraction: a strictly textual safety net for documents
//! the structured extractor cannot handle (scanned or malformed input).

use std::path::Path;
use std::time::Duration;

use crate::error::ExtractionError;

pub trait OcrExtractor: Send + Sync {
    /// Returns best-effort plain text for the whole document, pages
    /// concatenated. An empty string means "nothing recognized".
    fn extract(&self, document: &Path) -> Result<String, ExtractionError>;
}

/// Posts the document to the OCR service and returns its plain-text body.
pub struct HttpOcrExtractor {
    client: reqwest::blocking::Client,
    url: String,
    timeout: Duration,
}

impl HttpOcrExtractor {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.to_string(),
            timeout,
        }
    }
}

impl OcrExtractor for HttpOcrExtractor {
    fn extract(&self, document: &Path) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(document).map_err(|e| ExtractionError::ReadDocument {
            path: document.to_path_buf(),
            source: e,
        })?;

        let filename = document
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();

        let form = reqwest::blocking::multipart::Form::new().part(
            "input",
            reqwest::blocking::multipart::Part::bytes(bytes).file_name(filename),
        );

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .timeout(self.timeout)
            .send()?;

        if !response.status().is_success() {
            return Err(ExtractionError::Status {
                code: response.status().as_u16(),
            });
        }

        Ok(response.text()?)
    }
}
