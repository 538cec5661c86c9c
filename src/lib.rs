//! PDF Duplex Library
//!
//! Prepares PDFs for double-sided printing on printers that can only print
//! one side. Each document is turned into two files: print the "odd" file,
//! flip the stack, and print the "even" file on the back.
//!
//! Along the way it can:
//! - Drop the first and last page (cover and back matter)
//! - Add a title page, optionally with an image
//! - Pad to an even page count
//! - Stamp every page with its original page number and file name
//! - Merge several documents and split the result into chunks
//!
//! # Example
//!
//! ```no_run
//! use pdf_duplex::pipeline::{prepare_document, DuplexOptions};
//! use std::path::Path;
//!
//! let report = prepare_document(
//!     Path::new("lecture.pdf"),
//!     Path::new("out"),
//!     &DuplexOptions::default(),
//! )
//! .expect("Failed to prepare PDF");
//!
//! println!("Print {} first", report.odd_output.display());
//! ```

pub mod assets;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod print;
pub mod report;

// Re-export commonly used items
pub use error::{Error, Result};
pub use pipeline::{prepare_document, process_batch, DuplexOptions};
pub use report::{BatchReport, Degradation, DocumentReport, Outcome, ProcessReport};
