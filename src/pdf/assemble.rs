//! Building output documents page by page

use std::path::Path;

use chrono::Local;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::Result;
use crate::layout::PageGeometry;

/// Producer string written to the Info dictionary of every output file
pub const PRODUCER: &str = concat!("pdf-duplex ", env!("CARGO_PKG_VERSION"));

/// Incrementally builds a single-level page tree
///
/// Pages are added in output order; [`DocumentBuilder::finish`] writes the
/// Pages node and Catalog.
#[derive(Debug)]
pub struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self { doc, pages_id, kids: Vec::new() }
    }

    /// The document under construction, for cloning pages into it
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append an existing page object to the page tree
    pub fn push_page(&mut self, page_id: ObjectId) -> Result<()> {
        let pages_id = self.pages_id;
        self.doc.get_dictionary_mut(page_id)?.set("Parent", pages_id);
        self.kids.push(page_id);
        Ok(())
    }

    /// Create an empty page of the given size
    ///
    /// The page is built from scratch, so unlike cloning it cannot fail.
    /// It is not yet part of the page tree; see [`DocumentBuilder::push_page`].
    pub fn new_blank_page(&mut self, geometry: &PageGeometry) -> ObjectId {
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        self.doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => geometry.to_rect().iter().map(|&v| Object::Real(v)).collect::<Vec<_>>(),
            "Resources" => Dictionary::new(),
            "Contents" => content_id,
        })
    }

    /// Write the page tree and catalog and hand back the document
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();

        let mut pages_object = Dictionary::new();
        pages_object.set("Type", Object::Name(b"Pages".to_vec()));
        pages_object.set("Count", Object::Integer(self.kids.len() as i64));
        pages_object.set("Kids", Object::Array(kids));
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages_object));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(Object::Dictionary(catalog));

        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stamp the Info dictionary, compress and save
pub fn save_document(doc: &mut Document, path: &Path) -> Result<()> {
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(PRODUCER),
        "CreationDate" => Object::string_literal(pdf_date(Local::now())),
    });
    doc.trailer.set("Info", info_id);

    doc.compress();
    doc.save(path)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSS+HH'mm'`)
fn pdf_date(now: chrono::DateTime<Local>) -> String {
    let offset = now.format("%z").to_string();
    let (hours, minutes) = offset.split_at(offset.len().min(3));
    format!("D:{}{}'{}'", now.format("%Y%m%d%H%M%S"), hours, minutes)
}

/// Number of pages in a document's page tree
pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder_creates_page_tree() {
        let mut builder = DocumentBuilder::new();
        let a = builder.new_blank_page(&PageGeometry::letter());
        let b = builder.new_blank_page(&PageGeometry::a4());
        builder.push_page(a).unwrap();
        builder.push_page(b).unwrap();
        assert_eq!(builder.page_count(), 2);

        let doc = builder.finish();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[&1], a);
        assert_eq!(pages[&2], b);
    }

    #[test]
    fn test_blank_page_has_geometry_and_no_content() {
        let mut builder = DocumentBuilder::new();
        let page_id = builder.new_blank_page(&PageGeometry::new(300.0, 400.0));
        builder.push_page(page_id).unwrap();
        let doc = builder.finish();

        assert!(doc.get_page_content(page_id).unwrap().is_empty());
        let media_box = doc.get_dictionary(page_id).unwrap().get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(crate::pdf::clone::object_to_f32(&media_box[3]), Some(400.0));
    }

    #[test]
    fn test_pdf_date_format() {
        let when = Local.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let date = pdf_date(when);
        assert!(date.starts_with("D:20260314150926"));
        assert!(date.ends_with('\''));
    }

    #[test]
    fn test_save_document_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("blank.pdf");

        let mut builder = DocumentBuilder::new();
        let page_id = builder.new_blank_page(&PageGeometry::letter());
        builder.push_page(page_id).unwrap();
        let mut doc = builder.finish();
        save_document(&mut doc, &path).unwrap();

        let loaded = Document::load(&path).unwrap();
        assert_eq!(page_count(&loaded), 1);
        assert!(loaded.trailer.get(b"Info").is_ok());
    }
}
