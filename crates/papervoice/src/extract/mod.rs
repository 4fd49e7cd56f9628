//! Text extraction: primary structured extraction with OCR fallback.

pub mod assembler;
pub mod document;
pub mod ocr;
pub mod structured;

use std::path::Path;

use log::warn;

use crate::broadcast::job_progress::JobStage;
use crate::error::ExtractionError;
use crate::pipeline::progress::{ProgressEvent, ProgressReporter};

pub use assembler::DocumentAssembler;
pub use document::{DocumentNode, ExtractedDocument, StructuredDocument, TextSource};
pub use ocr::{HttpOcrExtractor, OcrExtractor};
pub use structured::{HttpStructuredExtractor, StructuredExtractor};

/// Assembled text shorter than this is treated as a silent extraction
/// failure (image-only pages and the like) and triggers OCR fallback.
pub const MIN_EXTRACTED_CHARS: usize = 100;

/// Drives primary extraction and decides when to fall back to OCR.
pub struct ExtractionCoordinator {
    primary: Box<dyn StructuredExtractor>,
    ocr: Box<dyn OcrExtractor>,
    assembler: DocumentAssembler,
    min_chars: usize,
}

impl ExtractionCoordinator {
    pub fn new(
        primary: Box<dyn StructuredExtractor>,
        ocr: Box<dyn OcrExtractor>,
        assembler: DocumentAssembler,
    ) -> Self {
        Self {
            primary,
            ocr,
            assembler,
            min_chars: MIN_EXTRACTED_CHARS,
        }
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Extracts narration text for `document`.
    ///
    /// Primary structured extraction runs first; its result is assembled
    /// (math fragments spoken in place). The OCR fallback runs when the
    /// primary call failed or assembled fewer than `min_chars` characters,
    /// and its output replaces the candidate entirely when non-empty. An
    /// OCR error is treated as empty output, so a short-but-nonempty
    /// primary result still proceeds. Only no usable text at all is fatal.
    pub fn extract(
        &self,
        document: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<ExtractedDocument, ExtractionError> {
        let candidate = match self.primary.extract(document) {
            Ok(doc) => {
                let text = self.assembler.assemble(&doc);
                let chars = text.chars().count();
                if chars >= self.min_chars {
                    return Ok(ExtractedDocument {
                        text,
                        source: TextSource::Primary,
                    });
                }
                warn!(
                    "Structured extraction yielded {} chars (threshold {}), trying OCR",
                    chars, self.min_chars
                );
                text
            }
            Err(e) => {
                warn!("Structured extraction failed, trying OCR: {}", e);
                String::new()
            }
        };

        progress.report(ProgressEvent::stage(
            JobStage::OcrFallback,
            "Using OCR fallback for text extraction...",
        ));

        let ocr_text = match self.ocr.extract(document) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("OCR fallback failed: {}", e);
                String::new()
            }
        };

        if !ocr_text.is_empty() {
            return Ok(ExtractedDocument {
                text: ocr_text,
                source: TextSource::Ocr,
            });
        }

        if candidate.trim().is_empty() {
            return Err(ExtractionError::NoUsableText);
        }

        // Short primary text with nothing better from OCR still proceeds.
        Ok(ExtractedDocument {
            text: candidate,
            source: TextSource::Primary,
        })
    }
}
