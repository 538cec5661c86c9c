//! PDF Duplex CLI tool
//!
//! A command-line tool for preparing PDFs for manual double-sided printing.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lopdf::Document;
use serde::Serialize;

use pdf_duplex::assets::AssetSearch;
use pdf_duplex::pdf::{extract_metadata, write_chunks};
use pdf_duplex::pipeline::{expand_inputs, prepare_document, process_batch, DuplexOptions, DEFAULT_CHUNK_SIZE};
use pdf_duplex::print::print_file;
use pdf_duplex::report::{BatchReport, DocumentReport, ProcessReport};

/// PDF Duplex - Reorder PDFs for manual duplex printing
#[derive(Parser)]
#[command(name = "pdf-duplex")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Prepare one document, then print odd_pages.pdf, flip the stack, print even_pages_rotated.pdf
    pdf-duplex prepare lecture.pdf -o out

    # Prepare and merge every chapter, chunked into 20-page files
    pdf-duplex batch -o out \"chapters/*.pdf\"

    # Keep covers, skip the title page
    pdf-duplex prepare --keep-first-last --no-title notes.pdf -o out

    # Send a file to a named printer
    pdf-duplex print out/odd_pages.pdf --printer Office")]
struct Cli {
    /// Print reports as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by `prepare` and `batch`
#[derive(Args)]
struct DuplexArgs {
    /// Keep the first and last page of each document
    #[arg(long)]
    keep_first_last: bool,

    /// Do not stamp original page numbers on the pages
    #[arg(long)]
    no_watermarks: bool,

    /// Do not add a title page
    #[arg(long)]
    no_title: bool,

    /// Image shown on the title page
    #[arg(long)]
    title_image: Option<PathBuf>,

    /// Directory searched for title.png, title.jpg, title.jpeg, logo.png or logo.jpg
    #[arg(long, env = "PDF_DUPLEX_ASSET_DIR")]
    asset_dir: Option<PathBuf>,
}

impl DuplexArgs {
    fn options(self, chunk_size: Option<usize>) -> DuplexOptions {
        let mut title_image = AssetSearch { explicit: self.title_image, dirs: Vec::new() };
        if let Some(dir) = self.asset_dir {
            title_image = title_image.with_dir(dir);
        }
        DuplexOptions {
            remove_first_last: !self.keep_first_last,
            add_watermarks: !self.no_watermarks,
            insert_title: !self.no_title,
            title_image,
            chunk_size,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Split one PDF into odd and even print files
    Prepare {
        /// Input PDF file
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        duplex: DuplexArgs,

        /// Send the odd pages to the printer when done
        #[arg(long)]
        print: bool,

        /// Printer name (system default if omitted)
        #[arg(long, requires = "print")]
        printer: Option<String>,
    },

    /// Prepare several PDFs and merge them into one print job
    Batch {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        duplex: DuplexArgs,

        /// Pages per chunk of the combined output
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Do not split the combined output into chunks
        #[arg(long, conflicts_with = "chunk_size")]
        no_chunks: bool,
    },

    /// Split a PDF into fixed-size parts
    Chunk {
        /// Input PDF file
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Pages per part
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        size: usize,
    },

    /// Send a PDF to the printer
    Print {
        /// PDF file to print
        file: PathBuf,

        /// Printer name (system default if omitted)
        #[arg(long)]
        printer: Option<String>,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let json = cli.json;
    let result = match cli.command {
        Commands::Prepare { input, output, duplex, print, printer } => {
            cmd_prepare(&input, &output, duplex.options(None), print.then_some(printer), json)
        }
        Commands::Batch { inputs, output, duplex, chunk_size, no_chunks } => {
            let chunk_size = (!no_chunks).then_some(chunk_size);
            cmd_batch(inputs, &output, duplex.options(chunk_size), json)
        }
        Commands::Chunk { input, output, size } => cmd_chunk(&input, &output, size, json),
        Commands::Print { file, printer } => cmd_print(&file, printer.as_deref()),
        Commands::Info { input } => cmd_info(&input, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn page_list(label: &str, pages: &[u32]) -> String {
    let pages: Vec<String> = pages.iter().map(u32::to_string).collect();
    format!("  {}: {}", label, if pages.is_empty() { "-".to_string() } else { pages.join(", ") })
}

/// Human-readable summary of one prepared document, degradations included
fn document_summary(report: &DocumentReport) -> Vec<String> {
    let mut lines = vec![format!("{} ({} pages)", report.name, report.total_pages)];
    if let (Some(first), Some(last)) = (report.removed_first_page, report.removed_last_page) {
        lines.push(format!("  Removed pages {} and {}", first, last));
    }
    if report.title_inserted {
        lines.push("  Added title page".to_string());
    }
    if report.padding_added {
        lines.push("  Added blank page to even out the count".to_string());
    }
    lines.push(page_list("Odd side (in print order)", &report.odd_pages_final));
    lines.push(page_list("Even side (in print order)", &report.even_pages_final));
    lines.extend(report.degradations.iter().map(|d| format!("  Note: {}", d)));
    lines
}

fn print_document_summary(report: &DocumentReport) {
    for line in document_summary(report) {
        eprintln!("{}", line);
    }
}

/// Prepare one PDF
fn cmd_prepare(
    input: &Path,
    output: &Path,
    options: DuplexOptions,
    print: Option<Option<String>>,
    json: bool,
) -> Result<()> {
    let report: ProcessReport = prepare_document(input, output, &options)
        .with_context(|| format!("Failed to prepare {}", input.display()))?;

    if json {
        print_json(&report)?;
    } else {
        print_document_summary(&report.document);
        eprintln!("Odd pages:  {}", report.odd_output.display());
        eprintln!("Even pages: {}", report.even_output.display());
    }

    if let Some(printer) = print {
        print_file(&report.odd_output, printer.as_deref())?;
        eprintln!(
            "Odd pages sent. Flip the printed stack and reinsert it, then run:\n    pdf-duplex print {}{}",
            report.even_output.display(),
            printer.map(|p| format!(" --printer \"{}\"", p)).unwrap_or_default()
        );
    }

    Ok(())
}

/// Prepare and merge several PDFs
fn cmd_batch(inputs: Vec<String>, output: &Path, options: DuplexOptions, json: bool) -> Result<()> {
    // Expand glob patterns
    let inputs = expand_inputs(&inputs)?;

    eprintln!("Preparing {} PDF files...", inputs.len());
    let report: BatchReport = process_batch(&inputs, output, &options).context("Batch failed")?;

    if json {
        return print_json(&report);
    }

    for document in &report.documents {
        print_document_summary(document);
    }
    eprintln!("Odd pages:  {} ({} pages)", report.odd_output.display(), report.odd_page_count);
    eprintln!("Even pages: {} ({} pages)", report.even_output.display(), report.even_page_count);
    eprintln!("Combined:   {} ({} pages)", report.combined_output.display(), report.combined_page_count);
    for chunk in &report.chunks {
        eprintln!("  {}", chunk.display());
    }
    Ok(())
}

/// Split a PDF into parts
fn cmd_chunk(input: &Path, output: &Path, size: usize, json: bool) -> Result<()> {
    let doc = Document::load(input).with_context(|| format!("Failed to load {}", input.display()))?;
    let base = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chunk".to_string());

    std::fs::create_dir_all(output)?;
    let paths = write_chunks(&doc, &base, size, output)?;

    if json {
        return print_json(&paths);
    }
    eprintln!("Split {} into {} parts:", input.display(), paths.len());
    for path in &paths {
        eprintln!("  {}", path.display());
    }
    Ok(())
}

/// Send a PDF to the printer
fn cmd_print(file: &Path, printer: Option<&str>) -> Result<()> {
    print_file(file, printer)?;
    eprintln!("Print job sent: {}", file.display());
    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path, json: bool) -> Result<()> {
    let metadata = extract_metadata(input)?;

    if json {
        return print_json(&metadata);
    }

    println!("File: {}", input.display());
    println!("Version: {}", metadata.version);
    println!("Pages: {}", metadata.page_count);

    if let Some(geometry) = metadata.first_page {
        println!("Page size: {:.0} x {:.0} pt", geometry.width, geometry.height);
    }
    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }
    if let Some(producer) = metadata.producer {
        println!("Producer: {}", producer);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_duplex::Degradation;

    #[test]
    fn test_summary_lists_degradations() {
        let report = DocumentReport {
            name: "two.pdf".to_string(),
            total_pages: 2,
            original_sequence: vec![1, 2],
            removed_first_page: None,
            removed_last_page: None,
            title_inserted: true,
            padding_added: true,
            planned_pages: 4,
            odd_pages_final: vec![2],
            even_pages_final: vec![1],
            odd_page_count: 2,
            even_page_count: 2,
            degradations: vec![Degradation::RemovalSkipped { page_count: 2 }],
        };

        let lines = document_summary(&report);

        assert_eq!(lines[0], "two.pdf (2 pages)");
        assert!(lines.contains(&"  Odd side (in print order): 2".to_string()));
        let note = format!("  Note: {}", Degradation::RemovalSkipped { page_count: 2 });
        assert_eq!(lines.last(), Some(&note));
    }
}
