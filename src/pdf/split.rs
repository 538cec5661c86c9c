//! Splitting a plan into the two duplex output streams
//!
//! Plan positions are 1-based. Odd positions go to the "odd" stream in
//! reverse order so the printed stack comes out with the first sheet on top.
//! Even positions go to the "even" stream in plan order, and every real page
//! there is turned 180 degrees for the flipped stack. Synthetic pages are
//! never rotated and never watermarked.

use lopdf::{Document, ObjectId};
use serde::Serialize;

use crate::assets::TitleImage;
use crate::error::Result;
use crate::layout::{PageGeometry, Rotation};
use crate::pdf::assemble::DocumentBuilder;
use crate::pdf::clone::{dereference, PageCloner};
use crate::pdf::overlay::{self, OverlayContent};
use crate::pdf::plan::{PageKind, PageRecord, ProcessingPlan};
use crate::pdf::source::SourceDocument;
use crate::report::Degradation;

/// One page of an output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamPage {
    pub original_page_number: u32,
    pub kind: PageKind,
    pub rotation: Rotation,
    pub watermarked: bool,
}

/// A finished output document and what is on it
#[derive(Debug)]
pub struct OutputStream {
    pub doc: Document,
    pub pages: Vec<StreamPage>,
}

impl OutputStream {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Original page numbers in output order, synthetic pages left out
    pub fn original_numbers(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.kind == PageKind::Original)
            .map(|p| p.original_page_number)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    pub add_watermarks: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self { add_watermarks: true }
    }
}

/// Both output streams of one document
#[derive(Debug)]
pub struct SplitStreams {
    pub odd: OutputStream,
    pub even: OutputStream,
    pub degradations: Vec<Degradation>,
}

/// Partition plan records by position
///
/// Returns `(odd, even)`: odd positions reversed, even positions in order.
pub fn partition_plan(plan: &ProcessingPlan) -> (Vec<PageRecord>, Vec<PageRecord>) {
    let (odd, even): (Vec<PageRecord>, Vec<PageRecord>) =
        plan.records.iter().partition(|record| record.position() % 2 == 1);
    (odd.into_iter().rev().collect(), even)
}

/// Build the odd and even output documents for `plan`
///
/// The title page shows the source's display name and `title_image`, if any.
pub fn split(
    plan: &ProcessingPlan,
    source: &SourceDocument,
    options: &SplitOptions,
    title_image: Option<&TitleImage>,
) -> Result<SplitStreams> {
    let (odd_records, even_records) = partition_plan(plan);
    let title = source.display_name();

    let mut stream_builder = StreamBuilder {
        source,
        options,
        title: &title,
        title_image,
        degradations: Vec::new(),
    };
    let odd = stream_builder.build(&odd_records, Rotation::Upright)?;
    let even = stream_builder.build(&even_records, Rotation::Flipped)?;

    log::debug!(
        "{}: odd stream {:?}, even stream {:?}",
        source.name,
        odd.original_numbers(),
        even.original_numbers()
    );

    Ok(SplitStreams { odd, even, degradations: stream_builder.degradations })
}

struct StreamBuilder<'a> {
    source: &'a SourceDocument,
    options: &'a SplitOptions,
    title: &'a str,
    title_image: Option<&'a TitleImage>,
    degradations: Vec<Degradation>,
}

impl StreamBuilder<'_> {
    /// Assemble one output document; `rotation` applies to original pages only
    fn build(&mut self, records: &[PageRecord], rotation: Rotation) -> Result<OutputStream> {
        let mut builder = DocumentBuilder::new();
        let mut cloner = PageCloner::new();
        let mut pages = Vec::with_capacity(records.len());
        let source = self.source;

        for record in records {
            let page = match record.kind {
                PageKind::Original => {
                    let source_page = source.page(record.original_page_number)?;
                    let page_id = cloner.clone_page(&source.doc, source_page.id, builder.doc_mut())?;
                    let page_rotate = rotate_page(builder.doc_mut(), page_id, rotation)?;
                    let watermarked = self.options.add_watermarks
                        && self.apply_overlay(
                            builder.doc_mut(),
                            page_id,
                            &source_page.visible,
                            OverlayContent::Watermark {
                                original_page_number: record.original_page_number,
                                file_name: &source.name,
                                page_rotate,
                            },
                            record.original_page_number,
                        );
                    builder.push_page(page_id)?;
                    StreamPage {
                        original_page_number: record.original_page_number,
                        kind: record.kind,
                        rotation,
                        watermarked,
                    }
                }
                PageKind::Title => {
                    let page_id = builder.new_blank_page(&record.geometry);
                    let content = OverlayContent::Title { text: self.title, image: self.title_image };
                    self.apply_overlay(builder.doc_mut(), page_id, &record.geometry, content, record.original_page_number);
                    builder.push_page(page_id)?;
                    StreamPage::synthetic(record.kind)
                }
                PageKind::Padding => {
                    let page_id = builder.new_blank_page(&record.geometry);
                    builder.push_page(page_id)?;
                    StreamPage::synthetic(record.kind)
                }
            };
            pages.push(page);
        }

        Ok(OutputStream { doc: builder.finish(), pages })
    }

    /// Render and composite an overlay, recording a failure instead of
    /// returning it. Returns whether the overlay was applied.
    fn apply_overlay(
        &mut self,
        doc: &mut Document,
        page_id: ObjectId,
        geometry: &PageGeometry,
        content: OverlayContent<'_>,
        page: u32,
    ) -> bool {
        let result = overlay::render(geometry, content).and_then(|rendered| overlay::merge(doc, page_id, &rendered));
        match result {
            Ok(()) => true,
            Err(e) => {
                let reason = Degradation::OverlaySkipped { page, reason: e.to_string() };
                log::warn!("{}: {}", self.source.name, reason);
                self.degradations.push(reason);
                false
            }
        }
    }
}

impl StreamPage {
    fn synthetic(kind: PageKind) -> Self {
        Self { original_page_number: 0, kind, rotation: Rotation::Upright, watermarked: false }
    }
}

/// Add `rotation` to a page's `/Rotate` and return the result
///
/// The page must be a clone; its inherited `/Rotate` has already been
/// resolved onto it.
fn rotate_page(doc: &mut Document, page_id: ObjectId, rotation: Rotation) -> Result<i64> {
    let existing = {
        let page = doc.get_dictionary(page_id)?;
        page.get(b"Rotate")
            .ok()
            .and_then(|value| dereference(doc, value))
            .and_then(|value| value.as_i64().ok())
            .unwrap_or(0)
    };
    let rotate = (existing + rotation.degrees()).rem_euclid(360);
    if rotate != existing {
        doc.get_dictionary_mut(page_id)?.set("Rotate", rotate);
    }
    Ok(rotate)
}
