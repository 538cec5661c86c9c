//! PDF manipulation module

pub mod assemble;
pub mod chunk;
pub mod clone;
pub mod merge;
pub mod metadata;
pub mod overlay;
pub mod plan;
pub mod source;
pub mod split;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used items
pub use assemble::{save_document, DocumentBuilder};
pub use chunk::{chunk_file_name, split_into_chunks, write_chunks};
pub use clone::PageCloner;
pub use merge::{combine, merge_documents, merge_pdfs, MergeOptions};
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
pub use overlay::{Overlay, OverlayContent};
pub use plan::{plan, PageKind, PageRecord, PlanOptions, ProcessingPlan};
pub use source::SourceDocument;
pub use split::{split, OutputStream, SplitOptions, SplitStreams};
