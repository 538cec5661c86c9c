//! Splitting a document into fixed-size page ranges

use std::path::{Path, PathBuf};

use lopdf::Document;

use crate::error::{Error, Result};
use crate::pdf::assemble::{save_document, DocumentBuilder};
use crate::pdf::clone::PageCloner;

/// File name of chunk `index` (1-based) out of `total`
pub fn chunk_file_name(base: &str, index: usize, total: usize) -> String {
    format!("{}_part_{}_of_{}.pdf", base, index, total)
}

/// Number of chunks `page_count` pages split into
pub fn chunk_count(page_count: usize, chunk_size: usize) -> usize {
    page_count.div_ceil(chunk_size)
}

/// Split `doc` into chunks of at most `chunk_size` pages
///
/// Chunks hold contiguous pages in order; only the last one may be short.
/// Each chunk is a standalone document with its own copies of the objects
/// its pages use.
pub fn split_into_chunks(doc: &Document, chunk_size: usize) -> Result<Vec<Document>> {
    if chunk_size == 0 {
        return Err(Error::InvalidChunkSize(chunk_size));
    }

    let page_ids: Vec<_> = doc.get_pages().into_values().collect();
    let mut chunks = Vec::with_capacity(chunk_count(page_ids.len(), chunk_size));

    for range in page_ids.chunks(chunk_size) {
        let mut builder = DocumentBuilder::new();
        let mut cloner = PageCloner::new();
        for &page_id in range {
            let cloned = cloner.clone_page(doc, page_id, builder.doc_mut())?;
            builder.push_page(cloned)?;
        }
        chunks.push(builder.finish());
    }

    log::debug!("Split {} page(s) into {} chunk(s)", page_ids.len(), chunks.len());
    Ok(chunks)
}

/// Split `doc` and save the chunks into `dir`
///
/// Returns the written paths in chunk order.
pub fn write_chunks(doc: &Document, base: &str, chunk_size: usize, dir: &Path) -> Result<Vec<PathBuf>> {
    let chunks = split_into_chunks(doc, chunk_size)?;
    let total = chunks.len();

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, mut chunk)| {
            let path = dir.join(chunk_file_name(base, i + 1, total));
            save_document(&mut chunk, &path)?;
            Ok(path)
        })
        .collect()
}
