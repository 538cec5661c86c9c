//! Loading source documents

use std::path::Path;

use lopdf::{Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::layout::PageGeometry;
use crate::pdf::clone::{dereference, object_to_f32, resolve_inherited};
use crate::report::{Degradation, Outcome};

/// One page of a source document
#[derive(Debug, Clone, Copy)]
pub struct SourcePage {
    /// 1-based page number in the source
    pub number: u32,
    pub id: ObjectId,
    /// The MediaBox
    pub geometry: PageGeometry,
    /// The part of the MediaBox that is displayed and printed
    pub visible: PageGeometry,
}

/// A loaded input PDF
///
/// Never modified after loading; every output page is a clone of one of
/// these pages.
#[derive(Debug)]
pub struct SourceDocument {
    /// File name used for titles and watermarks
    pub name: String,
    pub doc: Document,
    pub pages: Vec<SourcePage>,
    /// Problems found while reading page boxes
    pub degradations: Vec<Degradation>,
}

impl SourceDocument {
    /// Load a PDF file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = std::fs::read(path)?;
        Self::from_bytes(name, &bytes)
    }

    /// Parse a PDF held in memory
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let doc = Document::load_mem(bytes)?;
        Self::from_document(name, doc)
    }

    /// Wrap an already parsed document
    pub fn from_document(name: impl Into<String>, doc: Document) -> Result<Self> {
        let name = name.into();
        let page_ids = doc.get_pages();
        if page_ids.is_empty() {
            return Err(Error::EmptyDocument(name));
        }

        let mut degradations = Vec::new();
        let pages: Vec<SourcePage> = page_ids
            .into_iter()
            .map(|(number, id)| {
                let geometry = page_geometry(&doc, id, number).record(&mut degradations);
                SourcePage { number, id, geometry, visible: visible_area(&doc, id, &geometry) }
            })
            .collect();

        log::debug!("Loaded {} ({} pages)", name, pages.len());

        Ok(Self { name, doc, pages, degradations })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Look up a page by its 1-based number
    pub fn page(&self, number: u32) -> Result<&SourcePage> {
        number
            .checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
            .ok_or_else(|| Error::MissingPage { document: self.name.clone(), page: number })
    }

    /// Name with the extension stripped, as shown on the title page
    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }
}

/// Strip the extension from a file name
pub fn display_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Read a `[llx lly urx ury]` box array
fn read_box(doc: &Document, object: &Object) -> Option<PageGeometry> {
    let items = dereference(doc, object)?.as_array().ok()?;
    let values: Vec<f32> = items
        .iter()
        .filter_map(|item| dereference(doc, item).and_then(object_to_f32))
        .collect();
    <[f32; 4]>::try_from(values).ok().and_then(PageGeometry::from_rect)
}

/// Read the effective MediaBox of a page
///
/// Falls back to the default geometry when the box is missing or malformed.
pub fn page_geometry(doc: &Document, page_id: ObjectId, number: u32) -> Outcome<PageGeometry> {
    let rect = resolve_inherited(doc, page_id, b"MediaBox").and_then(|object| read_box(doc, object));

    match rect {
        Some(geometry) => Outcome::Complete(geometry),
        None => Outcome::Degraded {
            value: PageGeometry::default(),
            reason: Degradation::GeometryDefaulted { page: number },
        },
    }
}

/// The displayed area of a page
///
/// CropBox (inherited) first, then TrimBox, each clipped to `media_box`.
/// Missing, malformed or disjoint boxes fall back to the MediaBox.
pub fn visible_area(doc: &Document, page_id: ObjectId, media_box: &PageGeometry) -> PageGeometry {
    let trim_box = || {
        doc.get_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"TrimBox").ok())
            .and_then(|object| read_box(doc, object))
    };
    resolve_inherited(doc, page_id, b"CropBox")
        .and_then(|object| read_box(doc, object))
        .or_else(trim_box)
        .and_then(|area| area.intersect(media_box))
        .unwrap_or(*media_box)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Dictionary, Stream};

    fn document_with_boxes(boxes: &[Option<Vec<Object>>]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for media_box in boxes {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), b"".to_vec()));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if let Some(media_box) = media_box {
                page.set("MediaBox", media_box.clone());
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = SourceDocument::load(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(SourceDocument::from_bytes("junk.pdf", b"not a pdf").is_err());
    }

    #[test]
    fn test_empty_document_rejected() {
        let doc = document_with_boxes(&[]);
        let result = SourceDocument::from_document("empty.pdf", doc);
        assert!(matches!(result.unwrap_err(), Error::EmptyDocument(name) if name == "empty.pdf"));
    }

    #[test]
    fn test_geometry_read_and_defaulted() {
        let doc = document_with_boxes(&[
            Some(vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Real(842.0)]),
            None,
        ]);
        let source = SourceDocument::from_document("mixed.pdf", doc).unwrap();

        assert_eq!(source.pages[0].geometry, PageGeometry::new(595.0, 842.0));
        assert_eq!(source.pages[1].geometry, PageGeometry::default());
        assert_eq!(source.degradations, vec![Degradation::GeometryDefaulted { page: 2 }]);
    }

    #[test]
    fn test_visible_area_prefers_crop_box() {
        let letter = || vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)];
        let mut doc = document_with_boxes(&[Some(letter()), Some(letter()), Some(letter()), Some(letter())]);
        let pages = doc.get_pages();
        let crop = vec![Object::Integer(36), Object::Integer(36), Object::Integer(576), Object::Integer(756)];
        let trim = vec![Object::Integer(9), Object::Integer(9), Object::Integer(603), Object::Integer(783)];
        doc.get_dictionary_mut(pages[&1]).unwrap().set("CropBox", crop);
        doc.get_dictionary_mut(pages[&2]).unwrap().set("TrimBox", trim);
        let overhang = vec![Object::Integer(-50), Object::Integer(0), Object::Integer(300), Object::Integer(900)];
        doc.get_dictionary_mut(pages[&3]).unwrap().set("CropBox", overhang);

        let source = SourceDocument::from_document("boxes.pdf", doc).unwrap();

        assert_eq!(source.pages[0].geometry, PageGeometry::letter());
        assert_eq!(source.pages[0].visible.to_rect(), [36.0, 36.0, 576.0, 756.0]);
        assert_eq!(source.pages[1].visible.to_rect(), [9.0, 9.0, 603.0, 783.0]);
        assert_eq!(source.pages[2].visible.to_rect(), [0.0, 0.0, 300.0, 792.0]);
        assert_eq!(source.pages[3].visible, PageGeometry::letter());
    }

    #[test]
    fn test_page_lookup() {
        let doc = document_with_boxes(&[None, None]);
        let source = SourceDocument::from_document("two.pdf", doc).unwrap();
        assert_eq!(source.page(2).unwrap().number, 2);
        assert!(matches!(source.page(0), Err(Error::MissingPage { page: 0, .. })));
        assert!(matches!(source.page(3), Err(Error::MissingPage { page: 3, .. })));
    }

    #[test]
    fn test_display_name_strips_extension() {
        assert_eq!(display_name("Quarterly Report.pdf"), "Quarterly Report");
        assert_eq!(display_name("notes"), "notes");
    }
}
