//! Assembles a structured document into one narration string, converting
//! math fragments to spoken language at their original position.

use log::warn;

use crate::extract::document::{DocumentNode, StructuredDocument};
use crate::mathspeech::{MathSpeech, MATH_PLACEHOLDER};

/// Turns extraction nodes into narration text.
///
/// Math conversion is best-effort: a fragment that fails or times out
/// becomes [`MATH_PLACEHOLDER`] and the job carries on. The assembler
/// itself never fails.
pub struct DocumentAssembler {
    math: Box<dyn MathSpeech>,
}

impl DocumentAssembler {
    pub fn new(math: Box<dyn MathSpeech>) -> Self {
        Self { math }
    }

    /// Flattens `doc` to narration text, each math fragment rendered in
    /// place between its surrounding prose.
    pub fn assemble(&self, doc: &StructuredDocument) -> String {
        let mut out = String::new();
        for node in &doc.nodes {
            match node {
                DocumentNode::Text(text) => {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(text);
                }
                DocumentNode::Math(fragment) => {
                    let spoken = self.speak(fragment);
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(&spoken);
                }
            }
        }
        out
    }

    fn speak(&self, fragment: &str) -> String {
        match self.math.convert(fragment) {
            Ok(spoken) if !spoken.trim().is_empty() => spoken.trim().to_string(),
            Ok(_) => {
                warn!("Math engine returned empty output, using placeholder");
                MATH_PLACEHOLDER.to_string()
            }
            Err(e) => {
                warn!("Math conversion failed, using placeholder: {}", e);
                MATH_PLACEHOLDER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MathSpeechError;

    struct FixedMath(&'static str);

    impl MathSpeech for FixedMath {
        fn convert(&self, _fragment: &str) -> Result<String, MathSpeechError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingMath;

    impl MathSpeech for FailingMath {
        fn convert(&self, _fragment: &str) -> Result<String, MathSpeechError> {
            Err(MathSpeechError::Timeout { secs: 30 })
        }
    }

    fn doc(nodes: Vec<DocumentNode>) -> StructuredDocument {
        StructuredDocument { nodes }
    }

    #[test]
    fn test_math_is_spoken_in_document_position() {
        let assembler = DocumentAssembler::new(Box::new(FixedMath("x squared")));
        let text = assembler.assemble(&doc(vec![
            DocumentNode::Text("The identity".to_string()),
            DocumentNode::Math("<math><mi>x</mi></math>".to_string()),
            DocumentNode::Text("holds.".to_string()),
        ]));
        assert_eq!(text, "The identity x squared holds.");
    }

    #[test]
    fn test_failed_conversion_yields_placeholder() {
        let assembler = DocumentAssembler::new(Box::new(FailingMath));
        let text = assembler.assemble(&doc(vec![
            DocumentNode::Text("Consider".to_string()),
            DocumentNode::Math("<math/>".to_string()),
        ]));
        assert_eq!(text, format!("Consider {}", MATH_PLACEHOLDER));
    }

    #[test]
    fn test_empty_spoken_output_yields_placeholder() {
        let assembler = DocumentAssembler::new(Box::new(FixedMath("   ")));
        let text = assembler.assemble(&doc(vec![DocumentNode::Math("<math/>".to_string())]));
        assert_eq!(text, MATH_PLACEHOLDER);
    }

    #[test]
    fn test_text_only_document_is_joined_with_spaces() {
        let assembler = DocumentAssembler::new(Box::new(FixedMath("unused")));
        let text = assembler.assemble(&doc(vec![
            DocumentNode::Text("One.".to_string()),
            DocumentNode::Text("Two.".to_string()),
        ]));
        assert_eq!(text, "One. Two.");
    }

    #[test]
    fn test_empty_document_yields_empty_string() {
        let assembler = DocumentAssembler::new(Box::new(FixedMath("unused")));
        assert_eq!(assembler.assemble(&doc(vec![])), "");
    }
}
