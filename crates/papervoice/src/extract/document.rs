/// One node of a structured extraction result, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentNode {
    /// A paragraph or heading, already flattened to plain text.
    Text(String),
    /// A raw math markup fragment, exactly as the extraction service
    /// returned it.
    Math(String),
}

/// Structured output of the primary extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredDocument {
    pub nodes: Vec<DocumentNode>,
}

impl StructuredDocument {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn math_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, DocumentNode::Math(_)))
            .count()
    }
}

/// Which extraction path produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Primary,
    Ocr,
}

/// Final extraction result handed to normalization. Transient — produced
/// once per job and not persisted beyond the pipeline run.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub source: TextSource,
}
