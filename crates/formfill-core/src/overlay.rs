//! Overlay capture and rendering.
//!
//! Capture records where each injected value sits on the page — one entry
//! per widget, so a field repeated across pages is recorded at every
//! occurrence. The renderer replays those records onto a brand-new document
//! whose pages mirror the source's sizes but carry nothing else: no content,
//! no fields, no annotations.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::acroform::{self, PdfRect};
use crate::error::FillError;

/// Resource name of the Helvetica font shared by all drawn text.
pub(crate) const FONT_NAME: &[u8] = b"FfHelv";

/// An immutable "draw this text here" record.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayEntry {
    /// 1-based page number.
    pub page: u32,
    pub rect: PdfRect,
    pub text: String,
    pub font_size: f64,
}

/// Record one entry per resolvable widget of the field. An empty value
/// produces no entries at all; a widget whose rectangle or page cannot be
/// resolved is skipped alone, not the whole field.
pub fn capture_entries(doc: &Document, field_id: ObjectId, value: &str) -> Vec<OverlayEntry> {
    if value.is_empty() {
        return Vec::new();
    }
    let pages = doc.get_pages();
    let font_size = acroform::effective_font_size(doc, field_id);
    let mut entries = Vec::new();
    for widget_id in acroform::widget_ids(doc, field_id) {
        let Ok(widget) = doc.get_dictionary(widget_id) else {
            continue;
        };
        let Some(rect) = acroform::rect_from_dict(doc, widget) else {
            continue;
        };
        let Some(page) = acroform::widget_page(doc, widget_id, &pages) else {
            continue;
        };
        entries.push(OverlayEntry {
            page,
            rect,
            text: value.to_string(),
            font_size,
        });
    }
    entries
}

/// Map text to the byte range drawable with a standard Type1 font; anything
/// outside Latin-1 becomes a placeholder.
fn drawable_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
        .collect()
}

/// Text-showing operations for one entry. The baseline is anchored at the
/// rectangle's top-left (top edge minus the font size), not its vertical
/// center, matching the original field's text origin.
pub(crate) fn text_operations(entry: &OverlayEntry) -> Vec<Operation> {
    let baseline = entry.rect.y + entry.rect.height - entry.font_size;
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_NAME.to_vec()),
                Object::Real(entry.font_size as f32),
            ],
        ),
        Operation::new(
            "Td",
            vec![
                Object::Real(entry.rect.x as f32),
                Object::Real(baseline as f32),
            ],
        ),
        Operation::new(
            "Tj",
            vec![Object::String(
                drawable_bytes(&entry.text),
                StringFormat::Literal,
            )],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Build a new document with one page per captured size and draw every
/// entry on its page, in capture order. The output has no interactive
/// elements at all.
pub fn render_overlay(
    page_sizes: &[(f64, f64)],
    entries: &[OverlayEntry],
) -> Result<Vec<u8>, FillError> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_NAME => Object::Reference(font_id),
        },
    });

    let mut kids = Vec::new();
    for (page_index, &(width, height)) in page_sizes.iter().enumerate() {
        let page_number = (page_index + 1) as u32;
        let operations: Vec<Operation> = entries
            .iter()
            .filter(|entry| entry.page == page_number)
            .flat_map(|entry| text_operations(entry))
            .collect();
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| FillError::Operation(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(width as f32),
                Object::Real(height as f32),
            ],
            "Resources" => Object::Reference(resources_id),
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_sizes.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.compress();

    acroform::save_document(&mut doc)
}
