//! Data models for the FormFill API

use serde::{Deserialize, Serialize};

/// One field assignment in a fill request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInput {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Request to fill a document's form fields
#[derive(Debug, Clone, Deserialize)]
pub struct FillDocumentRequest {
    #[serde(rename = "pdfBase64")]
    pub pdf_base64: String,
    pub fields: Vec<FieldInput>,
    #[serde(rename = "renderTextOverlay", default)]
    pub render_text_overlay: bool,
}

/// Response carrying the processed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillDocumentResponse {
    #[serde(rename = "documentBase64")]
    pub document_base64: String,
}
