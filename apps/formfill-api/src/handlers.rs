//! HTTP handlers for the FormFill API

use axum::Json;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use formfill_core::{fill_form, FieldValue, FillRequest};

use crate::error::ApiError;
use crate::models::*;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Fill a document's form fields and return the processed document
pub async fn fill_document(
    Json(req): Json<FillDocumentRequest>,
) -> Result<Json<FillDocumentResponse>, ApiError> {
    // Decode PDF
    let pdf_data = BASE64
        .decode(&req.pdf_base64)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid PDF base64: {}", e)))?;

    if req.fields.is_empty() {
        return Err(ApiError::InvalidRequest(
            "At least one field is required".into(),
        ));
    }

    let mut fields = Vec::with_capacity(req.fields.len());
    for input in req.fields {
        if input.field_name.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "fieldName must not be empty".into(),
            ));
        }
        fields.push(FieldValue {
            name: input.field_name,
            value: input.value,
        });
    }

    let outcome = fill_form(FillRequest {
        document: pdf_data,
        fields,
        render_text_overlay: req.render_text_overlay,
    })?;

    if !outcome.unmatched.is_empty() {
        tracing::info!(
            "Skipped {} unmatched field(s): {:?}",
            outcome.unmatched.len(),
            outcome.unmatched
        );
    }

    Ok(Json(FillDocumentResponse {
        document_base64: BASE64.encode(outcome.result.into_bytes()),
    }))
}
