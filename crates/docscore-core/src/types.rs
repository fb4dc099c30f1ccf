//! Core types for docscore

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix marking a class tag in the labeled corpus format
pub const LABEL_PREFIX: &str = "__label__";

/// Collapse every whitespace run (newlines and tabs included) to a single
/// space and trim the ends.
///
/// The result never contains a line break, which the engine requires.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Normalize a document, returning `None` when nothing is left
pub fn normalize_document(raw: &str) -> Option<String> {
    let text = normalize_text(raw);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Binary class tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Positive,
    Negative,
}

impl Label {
    /// Both labels, positive first
    pub const ALL: [Label; 2] = [Label::Positive, Label::Negative];

    /// Bare class name (`positive` / `negative`)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    /// Corpus tag (`__label__positive` / `__label__negative`)
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Positive => "__label__positive",
            Self::Negative => "__label__negative",
        }
    }

    /// Parse either a bare name or a prefixed tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.strip_prefix(LABEL_PREFIX).unwrap_or(tag) {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }

    /// The other class
    pub fn opposite(&self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A normalized document paired with its class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    /// Class tag
    pub label: Label,

    /// Normalized, non-empty text
    pub text: String,
}

impl LabeledExample {
    /// Normalize `raw` and label it; `None` if the document is blank
    pub fn new(label: Label, raw: &str) -> Option<Self> {
        normalize_document(raw).map(|text| Self { label, text })
    }

    /// Parse a `__label__<tag> <text>` line
    pub fn parse_line(line: &str) -> Result<Self> {
        let line = line.trim();
        let (tag, rest) = line.split_once(' ').unwrap_or((line, ""));
        let label = Label::from_tag(tag)
            .filter(|_| tag.starts_with(LABEL_PREFIX))
            .ok_or_else(|| Error::engine(format!("missing class tag in line: {line:?}")))?;
        let text = normalize_document(rest)
            .ok_or_else(|| Error::engine(format!("empty document in line: {line:?}")))?;
        Ok(Self { label, text })
    }
}

impl fmt::Display for LabeledExample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label.tag(), self.text)
    }
}

/// Opaque identity of one trained model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(uuid::Uuid);

impl ModelId {
    /// Mint a fresh random (v4) identity
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for ModelId {
    type Err = Error;

    /// Anything that is not a UUID cannot name a stored model
    fn from_str(s: &str) -> Result<Self> {
        uuid::Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::model_not_found(s))
    }
}

impl From<uuid::Uuid> for ModelId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id)
    }
}
