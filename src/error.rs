//! Error types for the duplex preparation library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the duplex preparation library
///
/// Only conditions that abort a document (or a whole batch) live here.
/// Recoverable conditions are reported as [`crate::report::Degradation`].
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern
    #[error("No PDF files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// No input documents were supplied
    #[error("No input files provided")]
    NoInputs,

    /// Document has no pages
    #[error("PDF has no pages: {0}")]
    EmptyDocument(String),

    /// Chunk size must be at least one page
    #[error("Invalid chunk size: {0} (must be at least 1)")]
    InvalidChunkSize(usize),

    /// Plan refers to a page the source does not have
    #[error("Page {page} does not exist in {document}")]
    MissingPage { document: String, page: u32 },

    /// Print spooler could not be reached or rejected the job
    #[error("Print failed: {0}")]
    Print(String),

    /// General error
    #[error("{0}")]
    General(String),
}
