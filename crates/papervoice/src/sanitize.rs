//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Uploaded documents can carry user-identifying names in their paths;
//! these functions keep full paths out of spans and log lines.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields — reveals the file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
