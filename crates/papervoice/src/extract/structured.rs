//! Primary structured extraction: HTTP collaborator returning a markup
//! document (text blocks plus embedded math fragments in document order).

use std::path::Path;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ExtractionError;
use crate::extract::document::{DocumentNode, StructuredDocument};

pub trait StructuredExtractor: Send + Sync {
    fn extract(&self, document: &Path) -> Result<StructuredDocument, ExtractionError>;
}

/// Posts the document to the structured-extraction service and parses
/// its markup response. Structured extraction can run for minutes on
/// large documents, hence the long per-request timeout.
pub struct HttpStructuredExtractor {
    client: reqwest::blocking::Client,
    url: String,
    timeout: Duration,
}

impl HttpStructuredExtractor {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.to_string(),
            timeout,
        }
    }
}

impl StructuredExtractor for HttpStructuredExtractor {
    fn extract(&self, document: &Path) -> Result<StructuredDocument, ExtractionError> {
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

        let body = response.text()?;
        parse_structured_markup(&body)
    }
}

/// Parses the extraction service's markup into document-order nodes.
///
/// Paragraphs (`p`) and headings (`head`) become flattened text nodes;
/// `math` elements become raw-markup math nodes at their original
/// position, so a fragment inside a paragraph splits that paragraph's
/// text around it.
pub fn parse_structured_markup(xml: &str) -> Result<StructuredDocument, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut nodes = Vec::new();
    let mut text_buf = String::new();
    let mut in_block = false;
    // >0 while inside a math element; counts all nested element depth.
    let mut math_depth = 0usize;
    let mut math_buf = String::new();

    let mut flush_text = |buf: &mut String, nodes: &mut Vec<DocumentNode>| {
        let text = buf.trim();
        if !text.is_empty() {
            nodes.push(DocumentNode::Text(text.to_string()));
        }
        buf.clear();
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if math_depth > 0 {
                    math_depth += 1;
                    push_start_tag(&mut math_buf, e);
                    continue;
                }
                match e.local_name().as_ref() {
                    b"math" => {
                        flush_text(&mut text_buf, &mut nodes);
                        math_depth = 1;
                        math_buf.clear();
                        push_start_tag(&mut math_buf, e);
                    }
                    b"p" | b"head" => in_block = true,
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                if math_depth > 0 {
                    push_empty_tag(&mut math_buf, e);
                } else if e.local_name().as_ref() == b"math" {
                    // A childless math element is still a fragment; the
                    // assembler decides what to say for it.
                    flush_text(&mut text_buf, &mut nodes);
                    let mut fragment = String::new();
                    push_empty_tag(&mut fragment, e);
                    nodes.push(DocumentNode::Math(fragment));
                }
            }
            Ok(Event::End(ref e)) => {
                if math_depth > 0 {
                    math_depth -= 1;
                    math_buf.push_str("</");
                    math_buf.push_str(&String::from_utf8_lossy(e.name().as_ref()));
                    math_buf.push('>');
                    if math_depth == 0 {
                        nodes.push(DocumentNode::Math(std::mem::take(&mut math_buf)));
                    }
                    continue;
                }
                if matches!(e.local_name().as_ref(), b"p" | b"head") {
                    flush_text(&mut text_buf, &mut nodes);
                    in_block = false;
                }
            }
            Ok(Event::Text(e)) => {
                if math_depth > 0 {
                    // Keep the raw escaped form so the fragment round-trips.
                    math_buf.push_str(&String::from_utf8_lossy(&e));
                } else if in_block {
                    let decoded = e.unescape().unwrap_or_default();
                    if !text_buf.is_empty() {
                        text_buf.push(' ');
                    }
                    text_buf.push_str(&decoded);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::MalformedResponse(format!(
                    "XML parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(StructuredDocument { nodes })
}

fn push_start_tag(buf: &mut String, e: &quick_xml::events::BytesStart<'_>) {
    // BytesStart content is the tag name plus attributes, sans brackets.
    buf.push('<');
    buf.push_str(&String::from_utf8_lossy(e));
    buf.push('>');
}

fn push_empty_tag(buf: &mut String, e: &quick_xml::events::BytesStart<'_>) {
    buf.push('<');
    buf.push_str(&String::from_utf8_lossy(e));
    buf.push_str("/>");
}
