//! PDF metadata extraction

use std::path::Path;

use lopdf::{Document, Object};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::layout::PageGeometry;
use crate::pdf::source::page_geometry;

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages_id = match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        Ok(_) => return Err(Error::General("Pages is not a reference".to_string())),
        Err(_) => return Err(Error::General("No Pages in catalog".to_string())),
    };

    let count = doc
        .get_dictionary(pages_id)?
        .get(b"Count")
        .map_err(|_| Error::General("No Count in Pages".to_string()))?;

    match count {
        Object::Integer(n) if *n >= 0 => Ok(*n as usize),
        _ => Err(Error::General("Count is not a page count".to_string())),
    }
}

/// What the `info` command reports about a PDF
#[derive(Debug, Clone, Serialize)]
pub struct PdfMetadata {
    /// File name of the PDF
    pub name: String,
    /// PDF version from the header
    pub version: String,
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Producing application (if present)
    pub producer: Option<String>,
    /// Size of the first page, if it has a usable page box
    pub first_page: Option<PageGeometry>,
}

/// Read a text entry from the Info dictionary
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    let bytes = info.get(key).ok()?.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;

    // Use catalog-based counting for accuracy
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyDocument(path.display().to_string()));
    }

    let first_page = doc
        .get_pages()
        .into_iter()
        .next()
        .and_then(|(number, page_id)| {
            let outcome = page_geometry(&doc, page_id, number);
            (!outcome.is_degraded()).then(|| *outcome.value())
        });

    Ok(PdfMetadata {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        version: doc.version.clone(),
        page_count,
        title: info_string(&doc, b"Title"),
        author: info_string(&doc, b"Author"),
        producer: info_string(&doc, b"Producer"),
        first_page,
    })
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyDocument(path.display().to_string()));
    }

    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::assemble::{save_document, PRODUCER};
    use crate::pdf::fixtures::numbered_document;
    use tempfile::TempDir;

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_nonexistent_file() {
        let result = extract_metadata(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_of_saved_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("three.pdf");
        save_document(&mut numbered_document(3), &path).unwrap();

        let metadata = extract_metadata(&path).unwrap();
        assert_eq!(metadata.name, "three.pdf");
        assert_eq!(metadata.page_count, 3);
        assert_eq!(metadata.producer.as_deref(), Some(PRODUCER));
        assert_eq!(metadata.title, None);
        assert_eq!(metadata.first_page, Some(PageGeometry::letter()));
        assert_eq!(count_pages(&path).unwrap(), 3);
    }
}
