//! PDF form filling engine.
//!
//! Fills a document's AcroForm fields with caller-supplied values and
//! produces either a flattened, non-interactive copy of the document or a
//! blank-page overlay carrying only the supplied text at the original
//! widget coordinates.
//!
//! The pipeline per request: parse → structural checks → index the field
//! tree → match and inject each requested value (capturing widget geometry
//! as it goes) → flatten or render → serialize. Everything is request
//! scoped; nothing survives past the returned bytes.

pub mod acroform;
pub mod error;
pub mod flatten;
pub mod index;
pub mod inject;
pub mod overlay;
pub mod request;

pub use acroform::PdfRect;
pub use error::FillError;
pub use index::{FieldIndex, LookupEntry};
pub use overlay::OverlayEntry;
pub use request::{FieldValue, FillOutcome, FillRequest, FillResult};

use tracing::warn;

/// How many known field names an unmatched-field diagnostic may cite.
const UNMATCHED_SAMPLE_LIMIT: usize = 10;

/// Process one fill request end to end.
///
/// Unmatched field names are a soft outcome: they are logged, collected on
/// the returned [`FillOutcome`], and never abort the batch. Structural
/// problems with the document are detected before any mutation.
pub fn fill_form(request: FillRequest) -> Result<FillOutcome, FillError> {
    let FillRequest {
        document,
        fields,
        render_text_overlay,
    } = request;

    let mut doc = acroform::load_document(&document)?;

    let form = acroform::acroform_dict(&doc)?;
    if form.has(b"XFA") {
        return Err(FillError::XfaUnsupported);
    }
    if acroform::top_level_field_ids(&doc)?.is_empty() {
        return Err(FillError::EmptyForm);
    }

    let field_index = FieldIndex::build(&doc);
    let mut entries: Vec<OverlayEntry> = Vec::new();
    let mut unmatched: Vec<String> = Vec::new();

    for field in &fields {
        let Some(entry) = field_index.resolve(&field.name) else {
            let known = field_index.qualified_names();
            let sample = &known[..known.len().min(UNMATCHED_SAMPLE_LIMIT)];
            warn!(
                "no form field matches '{}'; document has {} field(s), e.g. {:?}",
                field.name,
                known.len(),
                sample
            );
            unmatched.push(field.name.clone());
            continue;
        };
        let field_id = entry.field_id;
        let value = field.value.clone().unwrap_or_default();
        inject::set_field_value(&mut doc, field_id, &value)?;
        entries.extend(overlay::capture_entries(&doc, field_id, &value));
    }

    inject::set_need_appearances(&mut doc)?;

    let result = if render_text_overlay {
        let page_sizes = acroform::page_sizes(&doc);
        FillResult::Overlay(overlay::render_overlay(&page_sizes, &entries)?)
    } else {
        flatten::flatten_document(&mut doc, &entries)?;
        FillResult::Flattened(acroform::save_document(&mut doc)?)
    };

    Ok(FillOutcome { result, unmatched })
}

/// Qualified names of every field in a document, sorted. Diagnostic helper
/// for callers that want to inspect a template before filling it.
pub fn field_names(bytes: &[u8]) -> Result<Vec<String>, FillError> {
    let doc = acroform::load_document(bytes)?;
    acroform::acroform_dict(&doc)?;
    Ok(FieldIndex::build(&doc).qualified_names())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_camel_case() {
        let json = r#"{
            "document": [1, 2, 3],
            "fields": [{"fieldName": "Name", "value": "Ada"}],
            "renderTextOverlay": true
        }"#;
        let request: FillRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.fields[0].name, "Name");
        assert_eq!(request.fields[0].value.as_deref(), Some("Ada"));
        assert!(request.render_text_overlay);
    }

    #[test]
    fn overlay_flag_defaults_off_and_value_optional() {
        let json = r#"{"document": [], "fields": [{"fieldName": "Name"}]}"#;
        let request: FillRequest = serde_json::from_str(json).unwrap();
        assert!(!request.render_text_overlay);
        assert!(request.fields[0].value.is_none());
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let request = FillRequest {
            document: b"not a pdf".to_vec(),
            fields: vec![FieldValue {
                name: "Name".into(),
                value: None,
            }],
            render_text_overlay: false,
        };
        assert!(matches!(fill_form(request), Err(FillError::Parse(_))));
    }
}
