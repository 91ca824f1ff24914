//! Field value injection.

use lopdf::{Document, Object, ObjectId};

use crate::acroform;
use crate::error::FillError;

fn op_err(e: lopdf::Error) -> FillError {
    FillError::Operation(e.to_string())
}

/// Write `value` into a field's /V entry and drop any cached appearance
/// streams so the new value is what viewers and the flatten pass see.
/// An empty value clears the field.
pub fn set_field_value(
    doc: &mut Document,
    field_id: ObjectId,
    value: &str,
) -> Result<(), FillError> {
    let widget_kids: Vec<ObjectId> = acroform::widget_ids(doc, field_id)
        .into_iter()
        .filter(|id| *id != field_id)
        .collect();

    let value_obj = acroform::encode_text_string(value);
    let field = doc
        .get_object_mut(field_id)
        .map_err(op_err)?
        .as_dict_mut()
        .map_err(op_err)?;
    field.set("V", value_obj);
    field.remove(b"AP");

    for kid in widget_kids {
        let widget = doc
            .get_object_mut(kid)
            .map_err(op_err)?
            .as_dict_mut()
            .map_err(op_err)?;
        widget.remove(b"AP");
    }
    Ok(())
}

/// Ask viewers to regenerate field appearances for the injected values.
/// The AcroForm dictionary may be referenced from the catalog or inlined.
pub fn set_need_appearances(doc: &mut Document) -> Result<(), FillError> {
    let catalog_id = acroform::catalog_id(doc)?;
    let form_ref = {
        let catalog = doc.get_dictionary(catalog_id).map_err(op_err)?;
        match catalog.get(b"AcroForm") {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(Object::Dictionary(_)) => None,
            _ => return Err(FillError::NoForm),
        }
    };
    match form_ref {
        Some(id) => {
            let form = doc
                .get_object_mut(id)
                .map_err(op_err)?
                .as_dict_mut()
                .map_err(op_err)?;
            form.set("NeedAppearances", true);
        }
        None => {
            let catalog = doc
                .get_object_mut(catalog_id)
                .map_err(op_err)?
                .as_dict_mut()
                .map_err(op_err)?;
            if let Ok(Object::Dictionary(form)) = catalog.get_mut(b"AcroForm") {
                form.set("NeedAppearances", true);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, StringFormat};

    fn doc_with_text_field() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let field_id = doc.add_object(dictionary! {
            "T" => Object::string_literal("name"),
            "FT" => "Tx",
            "Rect" => vec![50.into(), 700.into(), 200.into(), 720.into()],
            "AP" => dictionary! {},
        });
        let acroform_id = doc.add_object(dictionary! {
            "Fields" => vec![Object::Reference(field_id)],
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "AcroForm" => Object::Reference(acroform_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        (doc, field_id)
    }

    #[test]
    fn sets_value_and_drops_appearance() {
        let (mut doc, field_id) = doc_with_text_field();
        set_field_value(&mut doc, field_id, "Ada").unwrap();

        let field = doc.get_dictionary(field_id).unwrap();
        match field.get(b"V").unwrap() {
            Object::String(bytes, _) => assert_eq!(bytes.as_slice(), b"Ada"),
            other => panic!("expected string value, got {:?}", other),
        }
        assert!(!field.has(b"AP"));
    }

    #[test]
    fn empty_value_clears_field() {
        let (mut doc, field_id) = doc_with_text_field();
        set_field_value(&mut doc, field_id, "").unwrap();
        let field = doc.get_dictionary(field_id).unwrap();
        match field.get(b"V").unwrap() {
            Object::String(bytes, _) => assert!(bytes.is_empty()),
            other => panic!("expected string value, got {:?}", other),
        }
    }

    #[test]
    fn non_ascii_value_is_utf16_encoded() {
        let (mut doc, field_id) = doc_with_text_field();
        set_field_value(&mut doc, field_id, "Müller").unwrap();
        let field = doc.get_dictionary(field_id).unwrap();
        match field.get(b"V").unwrap() {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(acroform::decode_text_string(bytes), "Müller");
            }
            other => panic!("expected UTF-16 string, got {:?}", other),
        }
    }

    #[test]
    fn need_appearances_is_set_on_form() {
        let (mut doc, _field_id) = doc_with_text_field();
        set_need_appearances(&mut doc).unwrap();
        let form = acroform::acroform_dict(&doc).unwrap();
        assert_eq!(form.get(b"NeedAppearances").unwrap(), &Object::Boolean(true));
    }
}
