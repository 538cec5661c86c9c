//! Single-document and batch orchestration
//!
//! Every output is first written into a private temporary workspace. Files
//! are moved into the caller's directory only after all of them have been
//! written, so a failed run never leaves partial results behind.

use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use lopdf::Document;
use rayon::prelude::*;
use tempfile::TempDir;

use crate::assets::{load_title_image, AssetSearch, TitleImage};
use crate::error::{Error, Result};
use crate::pdf::assemble::{page_count, save_document};
use crate::pdf::chunk::write_chunks;
use crate::pdf::merge::{combine, merge_documents};
use crate::pdf::plan::{plan, PlanOptions};
use crate::pdf::source::SourceDocument;
use crate::pdf::split::{split, SplitOptions, SplitStreams};
use crate::report::{BatchReport, Degradation, DocumentReport, ProcessReport};

/// Pages per chunk of the combined batch output
pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// Output file names
pub const ODD_OUTPUT: &str = "odd_pages.pdf";
pub const EVEN_OUTPUT: &str = "even_pages_rotated.pdf";
pub const COMBINED_OUTPUT: &str = "merged_combined.pdf";

/// Base name of the chunk files cut from the combined output
pub const CHUNK_BASE: &str = "merged_combined";

/// Options for duplex preparation
#[derive(Debug, Clone)]
pub struct DuplexOptions {
    /// Drop the first and last page of each document (skipped for 2 pages or fewer)
    pub remove_first_last: bool,
    /// Stamp `P<n> | <file>` on every original page
    pub add_watermarks: bool,
    /// Prepend a title page named after the document
    pub insert_title: bool,
    /// Where to look for the title page image
    pub title_image: AssetSearch,
    /// Pages per chunk of the combined batch output; `None` disables chunking
    pub chunk_size: Option<usize>,
}

impl Default for DuplexOptions {
    fn default() -> Self {
        Self {
            remove_first_last: true,
            add_watermarks: true,
            insert_title: true,
            title_image: AssetSearch::default(),
            chunk_size: Some(DEFAULT_CHUNK_SIZE),
        }
    }
}

impl DuplexOptions {
    fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            remove_first_last: self.remove_first_last,
            insert_title: self.insert_title,
        }
    }

    fn split_options(&self) -> SplitOptions {
        SplitOptions { add_watermarks: self.add_watermarks }
    }
}

/// A document planned and split, not yet written anywhere
#[derive(Debug)]
pub struct PreparedDocument {
    pub report: DocumentReport,
    pub streams: SplitStreams,
}

/// The title image and whatever went wrong finding it
#[derive(Debug, Default)]
struct TitleAsset {
    image: Option<TitleImage>,
    degradations: Vec<Degradation>,
}

impl TitleAsset {
    fn load(options: &DuplexOptions) -> Self {
        let mut asset = Self::default();
        if options.insert_title {
            asset.image = load_title_image(&options.title_image, &mut asset.degradations);
        }
        asset
    }
}

/// Plan and split one loaded document
///
/// `title_degradations` are problems with the title image, copied into the
/// report when the document gets a title page.
pub fn prepare(
    source: &SourceDocument,
    options: &DuplexOptions,
    title_image: Option<&TitleImage>,
    title_degradations: &[Degradation],
) -> Result<PreparedDocument> {
    log::info!("Preparing {} ({} pages)", source.name, source.page_count());

    let plan = plan(source, &options.plan_options());
    let streams = split(&plan, source, &options.split_options(), title_image)?;

    let mut degradations = source.degradations.clone();
    degradations.extend(plan.degradations.iter().cloned());
    if plan.has_title() {
        degradations.extend(title_degradations.iter().cloned());
    }
    degradations.extend(streams.degradations.iter().cloned());

    let report = DocumentReport {
        name: source.name.clone(),
        total_pages: source.page_count(),
        original_sequence: plan.original_sequence(),
        removed_first_page: plan.removed_first_page,
        removed_last_page: plan.removed_last_page,
        title_inserted: plan.has_title(),
        padding_added: plan.has_padding(),
        planned_pages: plan.len(),
        odd_pages_final: streams.odd.original_numbers(),
        even_pages_final: streams.even.original_numbers(),
        odd_page_count: streams.odd.len(),
        even_page_count: streams.even.len(),
        degradations,
    };

    Ok(PreparedDocument { report, streams })
}

/// Prepare one PDF file, writing `odd_pages.pdf` and `even_pages_rotated.pdf`
/// into `output_dir`
pub fn prepare_document(input: &Path, output_dir: &Path, options: &DuplexOptions) -> Result<ProcessReport> {
    let source = SourceDocument::load(input)?;
    prepare_source(&source, output_dir, options)
}

/// Prepare an already loaded document, writing both outputs into `output_dir`
pub fn prepare_source(source: &SourceDocument, output_dir: &Path, options: &DuplexOptions) -> Result<ProcessReport> {
    let title = TitleAsset::load(options);
    let PreparedDocument { report, streams } = prepare(source, options, title.image.as_ref(), &title.degradations)?;
    let SplitStreams { odd, even, .. } = streams;

    let mut workspace = Workspace::new()?;
    workspace.save(odd.doc, ODD_OUTPUT)?;
    workspace.save(even.doc, EVEN_OUTPUT)?;
    workspace.publish(output_dir)?;

    Ok(ProcessReport {
        document: report,
        odd_output: output_dir.join(ODD_OUTPUT),
        even_output: output_dir.join(EVEN_OUTPUT),
    })
}

/// Prepare several PDF files and merge the results
///
/// Documents are prepared in parallel but merged in the order given. Writes
/// the merged odd and even outputs, their combination, and (unless disabled)
/// the chunks of the combination. Any fatal error on any document aborts the
/// whole batch before anything is published.
pub fn process_batch(inputs: &[PathBuf], output_dir: &Path, options: &DuplexOptions) -> Result<BatchReport> {
    if inputs.is_empty() {
        return Err(Error::NoInputs);
    }
    if options.chunk_size == Some(0) {
        return Err(Error::InvalidChunkSize(0));
    }

    let title = TitleAsset::load(options);
    log::info!("Preparing {} document(s)", inputs.len());

    let prepared: Vec<PreparedDocument> = inputs
        .par_iter()
        .map(|path| {
            let source = SourceDocument::load(path)?;
            prepare(&source, options, title.image.as_ref(), &title.degradations)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut documents = Vec::with_capacity(prepared.len());
    let mut odd_docs = Vec::with_capacity(prepared.len());
    let mut even_docs = Vec::with_capacity(prepared.len());
    for PreparedDocument { report, streams } in prepared {
        documents.push(report);
        odd_docs.push(streams.odd.doc);
        even_docs.push(streams.even.doc);
    }

    log::info!("Merging odd and even outputs");
    let odd = merge_documents(odd_docs)?;
    let even = merge_documents(even_docs)?;
    let combined = combine(odd.clone(), even.clone())?;

    let odd_page_count = page_count(&odd);
    let even_page_count = page_count(&even);
    let combined_page_count = page_count(&combined);

    let mut workspace = Workspace::new()?;
    let chunk_names = match options.chunk_size {
        Some(size) => {
            log::info!("Splitting {} combined page(s) into chunks of {}", combined_page_count, size);
            workspace.write_chunks(&combined, size)?
        }
        None => Vec::new(),
    };
    workspace.save(odd, ODD_OUTPUT)?;
    workspace.save(even, EVEN_OUTPUT)?;
    workspace.save(combined, COMBINED_OUTPUT)?;
    workspace.publish(output_dir)?;

    Ok(BatchReport {
        documents,
        odd_output: output_dir.join(ODD_OUTPUT),
        even_output: output_dir.join(EVEN_OUTPUT),
        combined_output: output_dir.join(COMBINED_OUTPUT),
        odd_page_count,
        even_page_count,
        combined_page_count,
        chunks: chunk_names.iter().map(|name| output_dir.join(name)).collect(),
    })
}

/// Expand glob patterns in input paths
///
/// Patterns are expanded in argument order; matches of a single pattern come
/// back sorted. Arguments without glob characters are taken literally.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if !(pattern.contains('*') || pattern.contains('?') || pattern.contains('[')) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let entries = glob(pattern).map_err(|e| Error::InvalidGlob(format!("{}: {}", pattern, e)))?;
        let mut matched = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => matched.push(path),
                Err(e) => log::warn!("Glob error for {}: {}", pattern, e),
            }
        }
        if matched.is_empty() {
            return Err(Error::NoFilesMatched(pattern.clone()));
        }
        matched.sort();
        paths.extend(matched);
    }

    Ok(paths)
}

/// Private staging directory for output files
///
/// Dropping it removes everything that was not published.
struct Workspace {
    dir: TempDir,
    staged: Vec<String>,
}

impl Workspace {
    fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("pdf-duplex-").tempdir()?;
        log::debug!("Staging outputs in {}", dir.path().display());
        Ok(Self { dir, staged: Vec::new() })
    }

    fn save(&mut self, mut doc: Document, name: &str) -> Result<()> {
        save_document(&mut doc, &self.dir.path().join(name))?;
        self.staged.push(name.to_string());
        Ok(())
    }

    /// Write the chunks of `doc` and return their file names
    fn write_chunks(&mut self, doc: &Document, chunk_size: usize) -> Result<Vec<String>> {
        let paths = write_chunks(doc, CHUNK_BASE, chunk_size, self.dir.path())?;
        let names: Vec<String> = paths
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        self.staged.extend(names.iter().cloned());
        Ok(names)
    }

    /// Move every staged file into `output_dir`
    fn publish(self, output_dir: &Path) -> Result<()> {
        fs::create_dir_all(output_dir)?;
        for name in &self.staged {
            let from = self.dir.path().join(name);
            let to = output_dir.join(name);
            // Rename fails across file systems; copy instead
            if fs::rename(&from, &to).is_err() {
                fs::copy(&from, &to)?;
            }
            log::info!("Wrote {}", to.display());
        }
        Ok(())
    }
}
