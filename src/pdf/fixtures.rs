//! In-memory documents for unit tests

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use crate::pdf::source::SourceDocument;

/// A US Letter document whose page `n` shows the text `Page n`
///
/// MediaBox and Resources live on the Pages node, so every page inherits them.
pub fn numbered_document(page_count: u32) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for n in 1..=page_count {
        let content = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", n);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn numbered_source(name: &str, page_count: u32) -> SourceDocument {
    SourceDocument::from_document(name, numbered_document(page_count)).unwrap()
}

/// Decoded content of the page at 1-based `number`
pub fn page_text(doc: &Document, number: u32) -> String {
    let page_id = doc.get_pages()[&number];
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
}

/// Source page number shown on each page, or 0 for pages without one
pub fn page_numbers(doc: &Document) -> Vec<u32> {
    doc.get_pages()
        .keys()
        .map(|&n| shown_page_number(&page_text(doc, n)))
        .collect()
}

fn shown_page_number(content: &str) -> u32 {
    content
        .split("(Page ")
        .nth(1)
        .and_then(|rest| rest.split(')').next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Effective `/Rotate` of the page at 1-based `number`
pub fn page_rotation(doc: &Document, number: u32) -> i64 {
    let page_id = doc.get_pages()[&number];
    doc.get_dictionary(page_id)
        .unwrap()
        .get(b"Rotate")
        .and_then(Object::as_i64)
        .unwrap_or(0)
}
