//! Low-level AcroForm and page access on top of lopdf.
//!
//! Everything the fill engine needs from the document structure goes through
//! here: catalog and form-root lookup, field dictionary access, widget
//! geometry, text string decoding, and page sizing. The higher-level modules
//! never navigate raw PDF objects themselves.

use std::collections::{BTreeMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use crate::error::FillError;

/// Fallback page size when a page declares no usable /MediaBox (US Letter).
pub const LETTER: (f64, f64) = (612.0, 792.0);

/// Font size applied when a field declares none, or a non-positive one.
pub const DEFAULT_FONT_SIZE: f64 = 10.0;

/// Rectangle in page units, origin at the bottom-left of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub fn load_document(bytes: &[u8]) -> Result<Document, FillError> {
    Document::load_mem(bytes).map_err(|e| FillError::Parse(e.to_string()))
}

pub fn save_document(doc: &mut Document) -> Result<Vec<u8>, FillError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| FillError::Serialize(e.to_string()))?;
    Ok(buffer)
}

/// Follow reference chains to the underlying object. Bounded so a reference
/// loop in a malformed document cannot spin forever.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    let mut hops = 0;
    while let Object::Reference(id) = current {
        if hops >= 16 {
            break;
        }
        match doc.get_object(*id) {
            Ok(next) => current = next,
            Err(_) => break,
        }
        hops += 1;
    }
    current
}

pub fn catalog_id(doc: &Document) -> Result<ObjectId, FillError> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| FillError::Parse("document has no catalog".into()))
}

/// The catalog's /AcroForm dictionary, or `NoForm` when the document carries
/// no interactive form at all.
pub fn acroform_dict(doc: &Document) -> Result<&Dictionary, FillError> {
    let catalog = doc
        .get_dictionary(catalog_id(doc)?)
        .map_err(|e| FillError::Parse(e.to_string()))?;
    let form = catalog.get(b"AcroForm").map_err(|_| FillError::NoForm)?;
    resolve(doc, form).as_dict().map_err(|_| FillError::NoForm)
}

/// Object ids of the top-level entries in the form's /Fields array. A missing
/// or malformed array yields an empty list; the orchestrator decides whether
/// that is an error.
pub fn top_level_field_ids(doc: &Document) -> Result<Vec<ObjectId>, FillError> {
    let form = acroform_dict(doc)?;
    let Ok(fields) = form.get(b"Fields") else {
        return Ok(Vec::new());
    };
    let Ok(array) = resolve(doc, fields).as_array() else {
        return Ok(Vec::new());
    };
    Ok(array.iter().filter_map(|o| o.as_reference().ok()).collect())
}

/// Child field nodes of a field dictionary. A kid carrying /T is a child
/// field; kids without /T are widget annotations and are not tree nodes.
pub fn child_field_ids(doc: &Document, dict: &Dictionary) -> Vec<ObjectId> {
    let mut children = Vec::new();
    if let Ok(kids) = dict.get(b"Kids") {
        if let Ok(array) = resolve(doc, kids).as_array() {
            for kid in array {
                let Ok(id) = kid.as_reference() else { continue };
                let Ok(kid_dict) = doc.get_dictionary(id) else {
                    continue;
                };
                if kid_dict.has(b"T") {
                    children.push(id);
                }
            }
        }
    }
    children
}

/// Widget placements of a field: the field dictionary itself when it is
/// merged with its single widget (carries /Rect), plus any /Kids entries
/// without /T. A field may legitimately have zero, one, or many.
pub fn widget_ids(doc: &Document, field_id: ObjectId) -> Vec<ObjectId> {
    let mut widgets = Vec::new();
    let Ok(dict) = doc.get_dictionary(field_id) else {
        return widgets;
    };
    if dict.has(b"Rect") {
        widgets.push(field_id);
    }
    if let Ok(kids) = dict.get(b"Kids") {
        if let Ok(array) = resolve(doc, kids).as_array() {
            for kid in array {
                let Ok(id) = kid.as_reference() else { continue };
                let Ok(kid_dict) = doc.get_dictionary(id) else {
                    continue;
                };
                if !kid_dict.has(b"T") {
                    widgets.push(id);
                }
            }
        }
    }
    widgets
}

/// Decode a dictionary entry as a text string (handles both literal strings
/// and name objects).
pub fn text_string(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let obj = dict.get(key).ok()?;
    match resolve(doc, obj) {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Decode a PDF text string, handling the UTF-16 BE BOM and falling back to
/// Latin-1-ish bytes.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Encode a text value for a /V entry: a plain literal for ASCII, UTF-16 BE
/// with BOM otherwise.
pub fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::string_literal(value)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(n) => Some(f64::from(*n)),
        _ => None,
    }
}

/// Read a /Rect entry as (x, y, width, height), tolerating corner points in
/// either order. `None` when the rectangle is absent or malformed.
pub fn rect_from_dict(doc: &Document, dict: &Dictionary) -> Option<PdfRect> {
    let obj = dict.get(b"Rect").ok()?;
    let array = resolve(doc, obj).as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let n: Vec<f64> = array
        .iter()
        .map(|o| object_to_f64(resolve(doc, o)))
        .collect::<Option<Vec<_>>>()?;
    Some(PdfRect {
        x: n[0].min(n[2]),
        y: n[1].min(n[3]),
        width: (n[2] - n[0]).abs(),
        height: (n[3] - n[1]).abs(),
    })
}

/// 1-based page number a widget sits on, via its /P reference or, failing
/// that, by scanning each page's /Annots array.
pub fn widget_page(
    doc: &Document,
    widget_id: ObjectId,
    pages: &BTreeMap<u32, ObjectId>,
) -> Option<u32> {
    if let Ok(dict) = doc.get_dictionary(widget_id) {
        if let Ok(Object::Reference(page_ref)) = dict.get(b"P") {
            if let Some((&number, _)) = pages.iter().find(|(_, id)| *id == page_ref) {
                return Some(number);
            }
        }
    }
    for (&number, &page_id) in pages {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Ok(annots) = page.get(b"Annots") else {
            continue;
        };
        if let Ok(array) = resolve(doc, annots).as_array() {
            if array
                .iter()
                .any(|o| matches!(o, Object::Reference(id) if *id == widget_id))
            {
                return Some(number);
            }
        }
    }
    None
}

/// Font size declared in a default-appearance string like `"0 g /Helv 12 Tf"`:
/// the numeric operand preceding the last `Tf` operator.
pub fn font_size_from_da(da: &str) -> Option<f64> {
    let mut size = None;
    let mut previous: Option<&str> = None;
    for token in da.split_whitespace() {
        if token == "Tf" {
            if let Some(value) = previous.and_then(|t| t.parse::<f64>().ok()) {
                size = Some(value);
            }
        }
        previous = Some(token);
    }
    size
}

/// Effective font size for a field: its own /DA, then the form-level /DA,
/// then [`DEFAULT_FONT_SIZE`]. Non-positive declared sizes also fall back.
pub fn effective_font_size(doc: &Document, field_id: ObjectId) -> f64 {
    let declared = doc
        .get_dictionary(field_id)
        .ok()
        .and_then(|dict| text_string(doc, dict, b"DA"))
        .or_else(|| {
            acroform_dict(doc)
                .ok()
                .and_then(|form| text_string(doc, form, b"DA"))
        })
        .and_then(|da| font_size_from_da(&da));
    match declared {
        Some(size) if size > 0.0 => size,
        _ => DEFAULT_FONT_SIZE,
    }
}

/// Look up a page attribute, walking the /Parent chain for inheritable
/// entries like /MediaBox and /Resources. Returns a resolved clone.
pub fn inherited_page_attr(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    let mut seen = HashSet::new();
    while seen.insert(current) {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value).clone());
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// (width, height) of every page, in page order.
pub fn page_sizes(doc: &Document) -> Vec<(f64, f64)> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            inherited_page_attr(doc, page_id, b"MediaBox")
                .and_then(|obj| media_box_size(doc, &obj))
                .unwrap_or(LETTER)
        })
        .collect()
}

fn media_box_size(doc: &Document, obj: &Object) -> Option<(f64, f64)> {
    let array = obj.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let n: Vec<f64> = array
        .iter()
        .map(|o| object_to_f64(resolve(doc, o)))
        .collect::<Option<Vec<_>>>()?;
    Some(((n[2] - n[0]).abs(), (n[3] - n[1]).abs()))
}
