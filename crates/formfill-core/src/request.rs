use serde::{Deserialize, Serialize};

/// A single field assignment supplied by the caller.
///
/// `value` defaults to the empty string when omitted, which clears the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(rename = "fieldName")]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// A validated fill request: raw document bytes plus the ordered list of
/// field assignments. Field order determines injection and capture order,
/// which in turn determines draw order on shared pages.
#[derive(Debug, Clone, Deserialize)]
pub struct FillRequest {
    pub document: Vec<u8>,
    pub fields: Vec<FieldValue>,
    #[serde(rename = "renderTextOverlay", default)]
    pub render_text_overlay: bool,
}

/// The processed document, in the output mode the caller asked for.
#[derive(Debug, Clone)]
pub enum FillResult {
    /// Original document with values baked in and all interactivity removed.
    Flattened(Vec<u8>),
    /// New blank document with only the supplied text drawn at the original
    /// widget coordinates.
    Overlay(Vec<u8>),
}

impl FillResult {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            FillResult::Flattened(bytes) => bytes,
            FillResult::Overlay(bytes) => bytes,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FillResult::Flattened(bytes) => bytes,
            FillResult::Overlay(bytes) => bytes,
        }
    }
}

/// Result of one fill request, including the field names that matched
/// nothing in the document (a soft outcome, not an error).
#[derive(Debug)]
pub struct FillOutcome {
    pub result: FillResult,
    pub unmatched: Vec<String>,
}
