//! Training upload decoding
//!
//! An upload is line-delimited: each line is either a JSON string or a JSON
//! object with a string `text` field. Other lines are skipped.

use docscore_core::{normalize_document, Error, Result};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum UploadLine {
    Bare(String),
    Object { text: String },
}

/// Documents recovered from an upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUpload {
    pub documents: Vec<String>,
    pub skipped: usize,
}

/// Decode every line of `body`, counting the ones that yield no document
///
/// Lines are split on raw bytes so a line with invalid UTF-8 is skipped on
/// its own rather than decoded with replacement characters.
pub fn parse_lines(body: &[u8]) -> ParsedUpload {
    let mut parsed = ParsedUpload::default();

    for (i, raw) in body.split(|&b| b == b'\n').enumerate() {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                debug!(line = i + 1, error = %e, "Upload line is not valid UTF-8");
                parsed.skipped += 1;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let doc = match serde_json::from_str::<UploadLine>(line) {
            Ok(UploadLine::Bare(text)) | Ok(UploadLine::Object { text }) => normalize_document(&text),
            Err(e) => {
                debug!(line = i + 1, error = %e, "Unparseable upload line");
                None
            }
        };

        match doc {
            Some(doc) => parsed.documents.push(doc),
            None => parsed.skipped += 1,
        }
    }

    if parsed.skipped > 0 {
        warn!(skipped = parsed.skipped, kept = parsed.documents.len(), "Skipped malformed upload lines");
    }
    parsed
}

/// Decode an upload that must contain at least one document
pub fn documents_from_upload(body: &[u8]) -> Result<Vec<String>> {
    let parsed = parse_lines(body);
    if parsed.documents.is_empty() {
        return Err(Error::empty_input(format!(
            "upload contained no valid documents ({} lines skipped)",
            parsed.skipped
        )));
    }
    Ok(parsed.documents)
}
