//! PDF Processor
//!
//! Runs one source file through the page pipeline: words, rows, regions,
//! per-unit matching, page selection and overlays. The result only refers to
//! pages by index; nothing is rendered here.

use std::collections::BTreeSet;
use std::sync::Arc;

use integra_models::{Annotation, OverlayKind, PageSize, PageText, RunConfig, UnitIdentifierMap};
use integra_utils::StatementResult;

use crate::annotator::{count, PageAnnotator};
use crate::layout::PageLayout;
use crate::matcher::IdentifierMatcher;
use crate::pdf::SourceDocument;
use crate::selector::is_retained;

/// A page kept for a unit, with the overlays to stamp on it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedPage {
    pub page_index: usize,
    pub annotations: Vec<Annotation>,
}

/// What one file contributed to one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitFileResult {
    pub pages: Vec<RetainedPage>,
    pub matches: BTreeSet<String>,
}

/// Immutable outcome of processing one source file.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub file_index: usize,
    pub file_name: String,
    pub page_count: usize,
    /// Per unit, in reference sheet order.
    pub units: Vec<(String, UnitFileResult)>,
    pub highlight_count: usize,
    pub mask_count: usize,
    pub unit_name_count: usize,
    /// Pages whose text could not be read; they are treated as empty.
    pub page_warnings: Vec<String>,
}

/// Per-file page pipeline, shared by all worker tasks of a run.
#[derive(Debug)]
pub struct PdfProcessor {
    config: RunConfig,
    matcher: IdentifierMatcher,
    annotator: PageAnnotator,
    units: Arc<UnitIdentifierMap>,
}

impl PdfProcessor {
    pub fn new(config: RunConfig, units: Arc<UnitIdentifierMap>) -> StatementResult<Self> {
        let matcher = IdentifierMatcher::new(config.pattern())?;
        let annotator = PageAnnotator::from_config(&config);

        Ok(Self {
            config,
            matcher,
            annotator,
            units,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn units(&self) -> &UnitIdentifierMap {
        &self.units
    }

    /// Process every page of `document` for every unit.
    pub fn process<D: SourceDocument>(&self, file_index: usize, file_name: &str, document: &D) -> ProcessedFile {
        let page_count = document.page_count();
        let mut units: Vec<(String, UnitFileResult)> = self
            .units
            .units()
            .map(|unit| (unit.to_string(), UnitFileResult::default()))
            .collect();
        let mut page_warnings = Vec::new();
        let (mut highlight_count, mut mask_count, mut unit_name_count) = (0, 0, 0);

        for page_index in 0..page_count {
            let page = match document.page_text(page_index) {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(file = file_name, page = page_index + 1, error = %e, "Unreadable page treated as empty");
                    page_warnings.push(format!("{} page {}: {}", file_name, page_index + 1, e));
                    PageText {
                        page_index,
                        size: PageSize::A4,
                        words: Vec::new(),
                    }
                }
            };

            let layout = PageLayout::new(&page, self.config.row_tolerance, &self.config.region_thresholds);
            let candidates = self.matcher.candidates(&page.words);

            for (unit, result) in units.iter_mut() {
                let Some(identifiers) = self.units.identifiers(unit) else {
                    continue;
                };
                let found = self.matcher.match_unit(&page.words, &candidates, identifiers);

                if !is_retained(self.config.page_policy, page_index, page_count, found.is_relevant()) {
                    continue;
                }

                let annotations = self.annotator.annotate(&layout, &found, unit);
                highlight_count += count(&annotations, OverlayKind::Highlight);
                mask_count += count(&annotations, OverlayKind::Mask);
                unit_name_count += count(&annotations, OverlayKind::UnitName);

                result.matches.extend(found.identifiers);
                result.pages.push(RetainedPage {
                    page_index,
                    annotations,
                });
            }
        }

        tracing::debug!(
            file = file_name,
            pages = page_count,
            highlights = highlight_count,
            masks = mask_count,
            "File processed"
        );

        ProcessedFile {
            file_index,
            file_name: file_name.to_string(),
            page_count,
            units,
            highlight_count,
            mask_count,
            unit_name_count,
            page_warnings,
        }
    }
}
