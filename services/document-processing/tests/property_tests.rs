//! Property-based tests for the page pipeline
//!
//! Row grouping, region classification, masking, page selection and unit
//! suppression checked over generated pages.

use std::collections::BTreeSet;
use std::sync::Arc;

use integra_document_processing::layout::PageLayout;
use integra_document_processing::pdf_processor::{RetainedPage, UnitFileResult};
use integra_document_processing::regions::classify;
use integra_document_processing::rows::group_rows;
use integra_document_processing::selector::is_retained;
use integra_document_processing::{
    IdentifierMatcher, PageAnnotator, PdfProcessor, ProcessedFile, SourceDocument, UnitAssembler,
};
use integra_models::{
    DocumentKind, HighlightScope, MergeOrder, OverlayKind, OverlayMode, PagePolicy, PageSize, PageText, Rect,
    Region, RegionThresholds, RunConfig, UnitIdentifierMap, Word,
};
use integra_utils::StatementResult;
use proptest::prelude::*;

const IDENTIFIERS: [&str; 3] = ["1234567890", "9999999999", "5555555555"];

prop_compose! {
    fn arb_word()(
        text in prop_oneof![
            prop::sample::select(IDENTIFIERS.to_vec()).prop_map(str::to_string),
            "[a-z]{3,8}",
        ],
        x0 in 0.0..500.0f64,
        top in 0.0..800.0f64,
        w in 1.0..90.0f64,
        h in 4.0..14.0f64,
    ) -> Word {
        Word::new(text, Rect::new(x0, top, x0 + w, top + h), 0)
    }
}

prop_compose! {
    fn arb_page()(words in prop::collection::vec(arb_word(), 0..40), page_index in 0usize..3) -> PageText {
        let words = words
            .into_iter()
            .map(|word| Word { page_index, ..word })
            .collect();
        PageText { page_index, size: PageSize::new(595.0, 842.0), words }
    }
}

struct PagesDocument(Vec<PageText>);

impl SourceDocument for PagesDocument {
    fn page_count(&self) -> usize {
        self.0.len()
    }

    fn page_text(&self, page_index: usize) -> StatementResult<PageText> {
        Ok(self.0[page_index].clone())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Words whose tops lie within the tolerance share each other's rows.
    #[test]
    fn prop_row_grouping_symmetric(page in arb_page(), tolerance in 1.0..30.0f64) {
        let rows = group_rows(&page.words, tolerance);
        prop_assert_eq!(rows.len(), page.words.len());

        for (i, a) in page.words.iter().enumerate() {
            prop_assert!(rows[i].contains(&a.bbox));
            for (j, b) in page.words.iter().enumerate() {
                if (a.bbox.top() - b.bbox.top()).abs() < tolerance {
                    prop_assert!(rows[i].contains(&b.bbox));
                    prop_assert!(rows[j].contains(&a.bbox));
                }
            }
        }
    }

    /// Every row lands in exactly the region its position implies.
    #[test]
    fn prop_regions_partition_rows(
        page in arb_page(),
        header in 0.0..0.5f64,
        footer in 0.5..1.0f64,
    ) {
        let thresholds = RegionThresholds { header_first_page: header, header_other: header, footer };
        let layout = PageLayout::new(&page, 10.0, &thresholds);
        let height = page.size.height;

        for row in &layout.rows {
            let is_header = row.rect.top() < header * height;
            let is_footer = !is_header && row.rect.bottom() > footer * height;
            let expected = if is_header {
                Region::Header
            } else if is_footer {
                Region::Footer
            } else {
                Region::Body
            };
            prop_assert_eq!(row.region, expected);
            prop_assert_eq!(classify(&row.rect, page.size, page.page_index, &thresholds), row.region);
        }
    }

    /// Masks only ever cover body rows free of matched words.
    #[test]
    fn prop_masks_exempt_matches_and_margins(page in arb_page()) {
        let thresholds = RegionThresholds::default();
        let layout = PageLayout::new(&page, 10.0, &thresholds);
        let matcher = IdentifierMatcher::new(DocumentKind::Esic.default_pattern()).unwrap();
        let identifiers: BTreeSet<String> = ["1234567890".to_string()].into_iter().collect();

        let candidates = matcher.candidates(&page.words);
        let matched = matcher.match_unit(&page.words, &candidates, &identifiers);
        let annotator = PageAnnotator::new(OverlayMode::Mask, HighlightScope::Row, None);
        let annotations = annotator.annotate(&layout, &matched, "A12");

        for mask in annotations.iter().filter(|a| a.kind == OverlayKind::Mask) {
            for &idx in &matched.word_indices {
                prop_assert!(!mask.rect.contains(&page.words[idx].bbox));
            }
            prop_assert!(layout
                .rows
                .iter()
                .any(|row| row.region == Region::Body && row.rect.key() == mask.rect.key()));
        }
        prop_assert_eq!(
            annotations.iter().filter(|a| a.kind == OverlayKind::Highlight).count() > 0,
            matched.is_relevant()
        );
    }

    /// The first and last page always survive relevant-only selection.
    #[test]
    fn prop_boundary_pages_retained(page_count in 1usize..50, relevant in prop::collection::vec(any::<bool>(), 50)) {
        for page_index in 0..page_count {
            let kept = is_retained(PagePolicy::RelevantPagesOnly, page_index, page_count, relevant[page_index]);
            if page_index == 0 || page_index + 1 == page_count || relevant[page_index] {
                prop_assert!(kept);
            } else {
                prop_assert!(!kept);
            }
            prop_assert!(is_retained(PagePolicy::AllPages, page_index, page_count, relevant[page_index]));
        }
    }

    /// Units without pages or without matches never produce output.
    #[test]
    fn prop_units_without_matches_suppressed(
        files in prop::collection::vec(
            prop::collection::vec((prop::collection::vec(0usize..5, 0..4), any::<bool>()), 3),
            1..6,
        ),
    ) {
        let units: UnitIdentifierMap = [("A12", "1234567890"), ("B07", "9999999999"), ("C01", "5555555555")]
            .into_iter()
            .collect();
        let names = ["A12", "B07", "C01"];
        let mut assembler = UnitAssembler::new(&units);

        for (file_index, per_unit) in files.iter().enumerate() {
            let results = per_unit
                .iter()
                .zip(names)
                .zip(IDENTIFIERS)
                .map(|(((pages, matched), unit), identifier)| {
                    let result = UnitFileResult {
                        pages: pages
                            .iter()
                            .map(|&page_index| RetainedPage { page_index, annotations: Vec::new() })
                            .collect(),
                        matches: if *matched {
                            [identifier.to_string()].into_iter().collect()
                        } else {
                            BTreeSet::new()
                        },
                    };
                    (unit.to_string(), result)
                })
                .collect();
            assembler.absorb(ProcessedFile {
                file_index,
                file_name: format!("file{}.pdf", file_index),
                page_count: 5,
                units: results,
                highlight_count: 0,
                mask_count: 0,
                unit_name_count: 0,
                page_warnings: Vec::new(),
            });
        }

        let (emitted, ledger) = assembler.finish(MergeOrder::Submission);
        for (u, unit) in names.iter().enumerate() {
            let has_pages = files.iter().any(|file| !file[u].0.is_empty());
            let has_matches = files.iter().any(|file| file[u].1);
            let output = emitted.iter().find(|e| e.unit == *unit);

            prop_assert_eq!(output.is_some(), has_pages && has_matches);
            prop_assert_eq!(ledger.has_matches(unit), has_matches);
            if let Some(output) = output {
                prop_assert!(!output.pages.is_empty());
                prop_assert!(!output.matches.is_empty());
            }
        }
    }

    /// Processing the same document twice gives the same result.
    #[test]
    fn prop_all_pages_rerun_idempotent(pages in prop::collection::vec(arb_page(), 1..4)) {
        let pages: Vec<PageText> = pages
            .into_iter()
            .enumerate()
            .map(|(page_index, page)| PageText {
                page_index,
                words: page.words.into_iter().map(|w| Word { page_index, ..w }).collect(),
                ..page
            })
            .collect();
        let document = PagesDocument(pages);
        let units: UnitIdentifierMap = [("A12", "1234567890"), ("B07", "9999999999")].into_iter().collect();
        let config = RunConfig::new(DocumentKind::Esic).with_page_policy(PagePolicy::AllPages);
        let processor = PdfProcessor::new(config, Arc::new(units)).unwrap();

        let first = processor.process(0, "a.pdf", &document);
        let second = processor.process(0, "a.pdf", &document);

        prop_assert_eq!(&first.units, &second.units);
        prop_assert_eq!(first.highlight_count, second.highlight_count);
        for (_, result) in &first.units {
            prop_assert_eq!(result.pages.len(), document.0.len());
        }
    }
}
