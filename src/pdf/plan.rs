//! Page planning: which page goes into which output slot
//!
//! The plan is a flat list of records, one per output page, built in three
//! passes (first/last removal, title insertion, even padding). Each pass
//! produces a new list and renumbers the slots; nothing is patched in place.

use serde::Serialize;

use crate::layout::PageGeometry;
use crate::pdf::source::SourceDocument;
use crate::report::{Degradation, Outcome};

/// `original_page_number` of pages that do not come from the source
pub const SYNTHETIC_PAGE: u32 = 0;

/// Where a planned page comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Original,
    Title,
    Padding,
}

/// One page of the assembled document
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageRecord {
    /// 0-based position in the plan
    pub slot: usize,
    /// Page number in the source, or [`SYNTHETIC_PAGE`]
    pub original_page_number: u32,
    pub kind: PageKind,
    pub geometry: PageGeometry,
}

impl PageRecord {
    fn original(number: u32, geometry: PageGeometry) -> Self {
        Self { slot: 0, original_page_number: number, kind: PageKind::Original, geometry }
    }

    fn synthetic(kind: PageKind, geometry: PageGeometry) -> Self {
        Self { slot: 0, original_page_number: SYNTHETIC_PAGE, kind, geometry }
    }

    pub fn is_synthetic(&self) -> bool {
        self.original_page_number == SYNTHETIC_PAGE
    }

    /// 1-based position in the plan
    pub fn position(&self) -> usize {
        self.slot + 1
    }
}

/// Planning switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    pub remove_first_last: bool,
    pub insert_title: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self { remove_first_last: true, insert_title: true }
    }
}

/// The fully assembled page sequence of one document, before splitting
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingPlan {
    pub records: Vec<PageRecord>,
    pub source_page_count: usize,
    pub removed_first_page: Option<u32>,
    pub removed_last_page: Option<u32>,
    pub degradations: Vec<Degradation>,
}

impl ProcessingPlan {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_title(&self) -> bool {
        self.records.iter().any(|r| r.kind == PageKind::Title)
    }

    pub fn has_padding(&self) -> bool {
        self.records.iter().any(|r| r.kind == PageKind::Padding)
    }

    /// Source page numbers that made it into the plan, in order
    pub fn original_sequence(&self) -> Vec<u32> {
        original_numbers(&self.records)
    }
}

/// Non-synthetic page numbers of `records`, in order
pub fn original_numbers<'a>(records: impl IntoIterator<Item = &'a PageRecord>) -> Vec<u32> {
    records
        .into_iter()
        .filter(|r| !r.is_synthetic())
        .map(|r| r.original_page_number)
        .collect()
}

/// Plan a loaded source document
pub fn plan(source: &SourceDocument, options: &PlanOptions) -> ProcessingPlan {
    let geometries: Vec<PageGeometry> = source.pages.iter().map(|p| p.geometry).collect();
    plan_pages(&geometries, options)
}

/// Plan a document given the geometry of each of its pages, in order
pub fn plan_pages(geometries: &[PageGeometry], options: &PlanOptions) -> ProcessingPlan {
    let mut degradations = Vec::new();

    let records = reslot(
        geometries
            .iter()
            .zip(1u32..)
            .map(|(geometry, number)| PageRecord::original(number, *geometry)),
    );

    let (records, removed) = if options.remove_first_last {
        remove_first_last(records).record(&mut degradations)
    } else {
        (records, None)
    };

    let records = if options.insert_title { insert_title(records) } else { records };
    let records = pad_to_even(records);

    log::debug!(
        "Planned {} page(s) from {} source page(s)",
        records.len(),
        geometries.len()
    );

    ProcessingPlan {
        records,
        source_page_count: geometries.len(),
        removed_first_page: removed.map(|(first, _)| first),
        removed_last_page: removed.map(|(_, last)| last),
        degradations,
    }
}

/// Renumber slots after a structural change
fn reslot(records: impl IntoIterator<Item = PageRecord>) -> Vec<PageRecord> {
    records
        .into_iter()
        .enumerate()
        .map(|(slot, record)| PageRecord { slot, ..record })
        .collect()
}

/// Geometry for synthetic pages: the first page's, or the default
fn leading_geometry(records: &[PageRecord]) -> PageGeometry {
    records.first().map(|r| r.geometry).unwrap_or_default()
}

/// Drop the first and last page
///
/// Documents with two pages or fewer are returned whole, degraded.
fn remove_first_last(records: Vec<PageRecord>) -> Outcome<(Vec<PageRecord>, Option<(u32, u32)>)> {
    let count = records.len();
    if count <= 2 {
        return Outcome::Degraded {
            value: (records, None),
            reason: Degradation::RemovalSkipped { page_count: count },
        };
    }

    let first = records[0].original_page_number;
    let last = records[count - 1].original_page_number;
    let kept = reslot(records.into_iter().skip(1).take(count - 2));
    Outcome::Complete((kept, Some((first, last))))
}

/// Prepend the title page
fn insert_title(records: Vec<PageRecord>) -> Vec<PageRecord> {
    let title = PageRecord::synthetic(PageKind::Title, leading_geometry(&records));
    reslot(std::iter::once(title).chain(records))
}

/// Append a blank page if the count is odd
fn pad_to_even(records: Vec<PageRecord>) -> Vec<PageRecord> {
    if records.len() % 2 == 0 {
        return records;
    }
    // Match the first real page rather than the title, which copies it anyway
    let geometry = records
        .iter()
        .find(|r| !r.is_synthetic())
        .map(|r| r.geometry)
        .unwrap_or_else(|| leading_geometry(&records));
    let padding = PageRecord::synthetic(PageKind::Padding, geometry);
    reslot(records.into_iter().chain(std::iter::once(padding)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(n: usize) -> Vec<PageGeometry> {
        vec![PageGeometry::letter(); n]
    }

    fn kinds(plan: &ProcessingPlan) -> Vec<(PageKind, u32)> {
        plan.records.iter().map(|r| (r.kind, r.original_page_number)).collect()
    }

    #[test]
    fn test_five_pages_with_removal() {
        let plan = plan_pages(&letters(5), &PlanOptions::default());

        assert_eq!(
            kinds(&plan),
            vec![
                (PageKind::Title, 0),
                (PageKind::Original, 2),
                (PageKind::Original, 3),
                (PageKind::Original, 4),
            ]
        );
        assert_eq!(plan.removed_first_page, Some(1));
        assert_eq!(plan.removed_last_page, Some(5));
        assert!(plan.degradations.is_empty());
        assert!(!plan.has_padding());
    }

    #[test]
    fn test_two_pages_skip_removal() {
        let plan = plan_pages(&letters(2), &PlanOptions::default());

        assert_eq!(plan.original_sequence(), vec![1, 2]);
        assert_eq!(plan.removed_first_page, None);
        assert_eq!(plan.removed_last_page, None);
        assert_eq!(plan.degradations, vec![Degradation::RemovalSkipped { page_count: 2 }]);
        // Title + 2 pages + padding
        assert_eq!(plan.len(), 4);
        assert!(plan.has_padding());
    }

    #[test]
    fn test_four_pages_need_padding() {
        let plan = plan_pages(&letters(4), &PlanOptions::default());
        assert_eq!(
            kinds(&plan),
            vec![
                (PageKind::Title, 0),
                (PageKind::Original, 2),
                (PageKind::Original, 3),
                (PageKind::Padding, 0),
            ]
        );
    }

    #[test]
    fn test_no_options_only_pads() {
        let options = PlanOptions { remove_first_last: false, insert_title: false };
        let plan = plan_pages(&letters(3), &options);
        assert_eq!(plan.original_sequence(), vec![1, 2, 3]);
        assert_eq!(plan.records[3].kind, PageKind::Padding);
    }

    #[test]
    fn test_untouched_plan_has_sequential_slots() {
        let options = PlanOptions { remove_first_last: false, insert_title: false };
        let plan = plan_pages(&letters(4), &options);
        assert_eq!(plan.original_sequence(), vec![1, 2, 3, 4]);
        let slots: Vec<usize> = plan.records.iter().map(|r| r.slot).collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);

        // Removal skipped and no title: nothing else renumbers the slots
        let plan = plan_pages(&letters(2), &options);
        let slots: Vec<usize> = plan.records.iter().map(|r| r.slot).collect();
        assert_eq!(slots, vec![0, 1]);
    }

    #[test]
    fn test_empty_document_uses_default_geometry() {
        let plan = plan_pages(&[], &PlanOptions::default());
        assert_eq!(plan.len(), 2);
        assert!(plan.records.iter().all(|r| r.is_synthetic()));
        assert!(plan.records.iter().all(|r| r.geometry == PageGeometry::default()));
    }

    #[test]
    fn test_synthetic_pages_copy_first_page_geometry() {
        let mut geometries = letters(4);
        geometries[1] = PageGeometry::a4();
        let plan = plan_pages(&geometries, &PlanOptions::default());

        // Page 1 removed, so page 2 (A4) leads
        assert_eq!(plan.records[0].geometry, PageGeometry::a4());
        assert_eq!(plan.records[3].geometry, PageGeometry::a4());
    }

    #[test]
    fn test_plan_invariants_hold_for_many_sizes() {
        for n in 0..40 {
            for remove_first_last in [false, true] {
                for insert_title in [false, true] {
                    let options = PlanOptions { remove_first_last, insert_title };
                    let plan = plan_pages(&letters(n), &options);

                    assert_eq!(plan.len() % 2, 0, "odd plan for n={} {:?}", n, options);
                    for (i, record) in plan.records.iter().enumerate() {
                        assert_eq!(record.slot, i);
                    }
                    let sequence = plan.original_sequence();
                    assert!(sequence.windows(2).all(|w| w[0] < w[1]));
                    assert!(sequence.iter().all(|&p| p >= 1 && p as usize <= n));
                }
            }
        }
    }
}
