//! Interactivity removal.
//!
//! lopdf exposes no appearance-stream generator, so flattening bakes each
//! captured value directly into its page's content stream, then strips the
//! widget annotations and the form root. The result has zero field nodes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::acroform;
use crate::error::FillError;
use crate::overlay::{self, OverlayEntry};

fn op_err(e: lopdf::Error) -> FillError {
    FillError::Operation(e.to_string())
}

/// Bake the captured entries into the document's pages and remove all
/// interactivity. Mutates the document in place; the caller serializes.
pub fn flatten_document(doc: &mut Document, entries: &[OverlayEntry]) -> Result<(), FillError> {
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    for &(page_number, page_id) in &pages {
        let operations: Vec<Operation> = entries
            .iter()
            .filter(|entry| entry.page == page_number)
            .flat_map(|entry| overlay::text_operations(entry))
            .collect();
        if !operations.is_empty() {
            let encoded = Content { operations }
                .encode()
                .map_err(|e| FillError::Operation(e.to_string()))?;
            append_page_content(doc, page_id, encoded)?;
            ensure_page_font(doc, page_id, font_id)?;
        }
        remove_widget_annotations(doc, page_id)?;
    }

    remove_form_root(doc)?;
    doc.prune_objects();
    doc.compress();
    Ok(())
}

/// Append a content stream after the page's existing content so the baked
/// text draws on top.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    encoded: Vec<u8>,
) -> Result<(), FillError> {
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let current = doc
        .get_dictionary(page_id)
        .map_err(op_err)?
        .get(b"Contents")
        .cloned()
        .ok();
    let new_contents = match current {
        Some(Object::Array(mut refs)) => {
            refs.push(Object::Reference(stream_id));
            Object::Array(refs)
        }
        Some(Object::Reference(id)) => match doc.get_object(id) {
            // /Contents may reference an array of streams rather than a
            // single stream.
            Ok(Object::Array(refs)) => {
                let mut refs = refs.clone();
                refs.push(Object::Reference(stream_id));
                Object::Array(refs)
            }
            _ => Object::Array(vec![Object::Reference(id), Object::Reference(stream_id)]),
        },
        _ => Object::Reference(stream_id),
    };

    let page = doc
        .get_object_mut(page_id)
        .map_err(op_err)?
        .as_dict_mut()
        .map_err(op_err)?;
    page.set("Contents", new_contents);
    Ok(())
}

/// Make the shared Helvetica available under the page's font resources,
/// cloning inherited resources onto the page when it declares none itself.
fn ensure_page_font(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), FillError> {
    let mut resources = match acroform::inherited_page_attr(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };
    let mut fonts = match resources.get(b"Font").cloned() {
        Ok(Object::Dictionary(dict)) => dict,
        Ok(Object::Reference(id)) => doc
            .get_dictionary(id)
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    };
    fonts.set(overlay::FONT_NAME, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let page = doc
        .get_object_mut(page_id)
        .map_err(op_err)?
        .as_dict_mut()
        .map_err(op_err)?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn is_widget(doc: &Document, obj: &Object) -> bool {
    let dict = match obj {
        Object::Reference(id) => match doc.get_dictionary(*id) {
            Ok(dict) => dict,
            Err(_) => return false,
        },
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Widget")
}

/// Drop widget annotations from a page's /Annots, leaving any other
/// annotation types (links, notes) in place.
fn remove_widget_annotations(doc: &mut Document, page_id: ObjectId) -> Result<(), FillError> {
    let annots = doc
        .get_dictionary(page_id)
        .map_err(op_err)?
        .get(b"Annots")
        .cloned()
        .ok();
    let (holder, items) = match annots {
        Some(Object::Array(items)) => (None, items),
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => (Some(id), items.clone()),
            _ => return Ok(()),
        },
        _ => return Ok(()),
    };

    let kept: Vec<Object> = items
        .into_iter()
        .filter(|obj| !is_widget(doc, obj))
        .collect();
    let empty = kept.is_empty();

    if let Some(id) = holder {
        if empty {
            let page = doc
                .get_object_mut(page_id)
                .map_err(op_err)?
                .as_dict_mut()
                .map_err(op_err)?;
            page.remove(b"Annots");
        } else if let Ok(array) = doc.get_object_mut(id).map_err(op_err)?.as_array_mut() {
            *array = kept;
        }
    } else {
        let page = doc
            .get_object_mut(page_id)
            .map_err(op_err)?
            .as_dict_mut()
            .map_err(op_err)?;
        if empty {
            page.remove(b"Annots");
        } else {
            page.set("Annots", Object::Array(kept));
        }
    }
    Ok(())
}

/// Remove the /AcroForm entry from the catalog; the orphaned field objects
/// are pruned afterwards.
fn remove_form_root(doc: &mut Document) -> Result<(), FillError> {
    let catalog_id = acroform::catalog_id(doc)?;
    let catalog = doc
        .get_object_mut(catalog_id)
        .map_err(op_err)?
        .as_dict_mut()
        .map_err(op_err)?;
    catalog.remove(b"AcroForm");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acroform::PdfRect;

    /// One page carrying one merged text field widget.
    fn doc_with_form() -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        let field_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "T" => Object::string_literal("name"),
            "FT" => "Tx",
            "Rect" => vec![50.into(), 700.into(), 200.into(), 720.into()],
            "P" => Object::Reference(page_id),
        });

        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Annots" => vec![Object::Reference(field_id)],
            }),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => 1,
                "Kids" => vec![Object::Reference(page_id)],
            }),
        );
        let acroform_id = doc.add_object(dictionary! {
            "Fields" => vec![Object::Reference(field_id)],
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
            "AcroForm" => Object::Reference(acroform_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    fn entry_on_page_one(text: &str) -> OverlayEntry {
        OverlayEntry {
            page: 1,
            rect: PdfRect {
                x: 50.0,
                y: 700.0,
                width: 150.0,
                height: 20.0,
            },
            text: text.to_string(),
            font_size: 10.0,
        }
    }

    #[test]
    fn flatten_removes_form_root() {
        let mut doc = doc_with_form();
        flatten_document(&mut doc, &[]).unwrap();
        assert!(matches!(
            acroform::acroform_dict(&doc),
            Err(crate::error::FillError::NoForm)
        ));
    }

    #[test]
    fn flatten_removes_widget_annotations() {
        let mut doc = doc_with_form();
        flatten_document(&mut doc, &[]).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(!page.has(b"Annots"));
    }

    #[test]
    fn flatten_bakes_text_into_page_content() {
        let mut doc = doc_with_form();
        flatten_document(&mut doc, &[entry_on_page_one("Ada")]).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.contains("Ada"), "content was: {}", text);
    }

    #[test]
    fn flatten_keeps_non_widget_annotations() {
        let mut doc = doc_with_form();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let link_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
        });
        if let Ok(Object::Array(annots)) = doc
            .get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .get_mut(b"Annots")
        {
            annots.push(Object::Reference(link_id));
        }

        flatten_document(&mut doc, &[]).unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 1);
    }

    #[test]
    fn flatten_survives_pages_without_entries() {
        let mut doc = doc_with_form();
        flatten_document(&mut doc, &[entry_on_page_one("x")]).unwrap();
        let output = acroform::save_document(&mut doc).unwrap();
        assert!(output.starts_with(b"%PDF-"));
    }
}
