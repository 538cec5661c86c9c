//! Processing outcomes and reports
//!
//! Recoverable problems never abort a document. They are carried as
//! [`Degradation`] values from the step that hit them into the final report.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// A condition that changed the output but did not stop processing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// First/last page removal was requested on a document too short for it
    RemovalSkipped { page_count: usize },
    /// A title image was configured but none could be found
    TitleImageMissing { searched: Vec<PathBuf> },
    /// The title image exists but could not be decoded
    TitleImageUnreadable { path: PathBuf, reason: String },
    /// A page box could not be read; the default geometry was used
    GeometryDefaulted { page: u32 },
    /// Rendering an overlay failed; the page was emitted without it
    ///
    /// `page` is the source page number, or 0 for the title page.
    OverlaySkipped { page: u32, reason: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::RemovalSkipped { page_count } => write!(
                f,
                "document has only {} page(s); first/last page kept",
                page_count
            ),
            Degradation::TitleImageMissing { searched } => write!(
                f,
                "no title image found ({} location(s) searched); using text-only title",
                searched.len()
            ),
            Degradation::TitleImageUnreadable { path, reason } => write!(
                f,
                "title image {} unreadable ({}); using text-only title",
                path.display(),
                reason
            ),
            Degradation::GeometryDefaulted { page } => {
                write!(f, "page {} has no usable page box; assuming US Letter", page)
            }
            Degradation::OverlaySkipped { page, reason } => {
                write!(f, "overlay skipped on page {}: {}", page, reason)
            }
        }
    }
}

/// Result of a step that can fall back instead of failing
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(T),
    Degraded { value: T, reason: Degradation },
}

impl<T> Outcome<T> {
    /// Split into the value and the degradation, if any
    pub fn into_parts(self) -> (T, Option<Degradation>) {
        match self {
            Outcome::Complete(value) => (value, None),
            Outcome::Degraded { value, reason } => (value, Some(reason)),
        }
    }

    /// Take the value, pushing any degradation onto `degradations`
    pub fn record(self, degradations: &mut Vec<Degradation>) -> T {
        let (value, reason) = self.into_parts();
        if let Some(reason) = reason {
            log::warn!("{}", reason);
            degradations.push(reason);
        }
        value
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }
}

/// What happened to one source document
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// Display name (file name) of the source
    pub name: String,
    /// Page count of the source document
    pub total_pages: usize,
    /// Original page numbers kept after removal, in order
    pub original_sequence: Vec<u32>,
    pub removed_first_page: Option<u32>,
    pub removed_last_page: Option<u32>,
    pub title_inserted: bool,
    pub padding_added: bool,
    /// Length of the assembled plan (always even)
    pub planned_pages: usize,
    /// Original page numbers on the odd output, in output order
    pub odd_pages_final: Vec<u32>,
    /// Original page numbers on the even output, in output order
    pub even_pages_final: Vec<u32>,
    pub odd_page_count: usize,
    pub even_page_count: usize,
    pub degradations: Vec<Degradation>,
}

impl DocumentReport {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Result of preparing a single document
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub document: DocumentReport,
    pub odd_output: PathBuf,
    pub even_output: PathBuf,
}

/// Result of preparing and merging several documents
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Per-document reports, in submission order
    pub documents: Vec<DocumentReport>,
    pub odd_output: PathBuf,
    pub even_output: PathBuf,
    pub combined_output: PathBuf,
    pub odd_page_count: usize,
    pub even_page_count: usize,
    pub combined_page_count: usize,
    /// Chunk files of the combined document, in order
    pub chunks: Vec<PathBuf>,
}

impl BatchReport {
    /// All degradations across the batch, tagged with the document name
    pub fn degradations(&self) -> impl Iterator<Item = (&str, &Degradation)> {
        self.documents
            .iter()
            .flat_map(|doc| doc.degradations.iter().map(move |d| (doc.name.as_str(), d)))
    }
}
