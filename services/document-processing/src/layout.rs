use integra_models::{PageText, Rect, RegionThresholds, Row};

use crate::regions::classify_rows;
use crate::rows::{distinct_rows, group_rows};

/// Row structure of one page, computed once and shared by every unit.
#[derive(Debug, Clone)]
pub struct PageLayout<'a> {
    pub page: &'a PageText,
    /// Row rectangle of each word, index-aligned with `page.words`.
    pub word_rows: Vec<Rect>,
    /// Distinct rows with their region.
    pub rows: Vec<Row>,
}

impl<'a> PageLayout<'a> {
    pub fn new(page: &'a PageText, tolerance: f64, thresholds: &RegionThresholds) -> Self {
        let word_rows = group_rows(&page.words, tolerance);
        let rows = classify_rows(&distinct_rows(&word_rows), page.size, page.page_index, thresholds);

        Self { page, word_rows, rows }
    }
}
