//! Document concatenation using lopdf
//!
//! Based on the lopdf merge example:
//! https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs

use std::path::PathBuf;

use lopdf::{Document, ObjectId};

use crate::error::{Error, Result};
use crate::pdf::assemble::{save_document, DocumentBuilder};
use crate::pdf::clone::{resolve_inherited, INHERITABLE};

/// Options for merging PDF files
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

/// Concatenate documents in order
///
/// Pages of each document stay contiguous and in their original order.
/// Object ids are renumbered per document so they cannot collide, and
/// objects left unreachable (old catalogs and page tree nodes) are pruned.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        return Err(Error::NoInputs);
    }

    let mut builder = DocumentBuilder::new();

    for mut doc in documents {
        // Renumber objects in this document to avoid conflicts
        let start_id = builder.doc().max_id + 1;
        doc.renumber_objects_with(start_id);

        let pages = doc.get_pages();
        // Pages are about to lose their Parent, and with it anything inherited
        for &page_id in pages.values() {
            flatten_inherited(&mut doc, page_id)?;
        }

        let merged = builder.doc_mut();
        merged.max_id = merged.max_id.max(doc.max_id);
        merged.objects.extend(doc.objects);

        for page_id in pages.into_values() {
            builder.push_page(page_id)?;
        }
    }

    let mut merged = builder.finish();
    let pruned = merged.prune_objects();
    log::debug!(
        "Merged {} page(s), pruned {} unreachable object(s)",
        merged.get_pages().len(),
        pruned.len()
    );
    Ok(merged)
}

/// All pages of `odd` followed by all pages of `even`
pub fn combine(odd: Document, even: Document) -> Result<Document> {
    merge_documents(vec![odd, even])
}

/// Copy inherited page attributes onto the page itself
fn flatten_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let inherited: Vec<(&[u8], lopdf::Object)> = {
        let page = doc.get_dictionary(page_id)?;
        INHERITABLE
            .iter()
            .filter(|key| !page.has(key))
            .filter_map(|&key| resolve_inherited(doc, page_id, key).map(|value| (key, value.clone())))
            .collect()
    };

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

/// Merge multiple PDF files into a single PDF
///
/// # Example
///
/// ```no_run
/// use pdf_duplex::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     input_paths: vec![
///         PathBuf::from("odd_pages.pdf"),
///         PathBuf::from("even_pages_rotated.pdf"),
///     ],
///     output_path: PathBuf::from("merged_combined.pdf"),
/// };
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<()> {
    if options.input_paths.is_empty() {
        return Err(Error::NoInputs);
    }

    // Validate all input files exist
    for path in &options.input_paths {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let mut documents = Vec::with_capacity(options.input_paths.len());
    for path in &options.input_paths {
        let doc = Document::load(path)?;
        if doc.get_pages().is_empty() {
            return Err(Error::EmptyDocument(path.display().to_string()));
        }
        documents.push(doc);
    }

    let mut merged = merge_documents(documents)?;
    save_document(&mut merged, &options.output_path)
}
