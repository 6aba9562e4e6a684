//! Region Classifier

use integra_models::{PageSize, Rect, Region, RegionThresholds, Row};

/// Header if the row starts above the header band, Footer if it ends below
/// the footer line, Body otherwise. Header wins when both apply.
pub fn classify(row: &Rect, page: PageSize, page_index: usize, thresholds: &RegionThresholds) -> Region {
    let height = page.height;

    if row.top() < thresholds.header_fraction(page_index) * height {
        Region::Header
    } else if row.bottom() > thresholds.footer * height {
        Region::Footer
    } else {
        Region::Body
    }
}

pub fn classify_rows(rows: &[Rect], page: PageSize, page_index: usize, thresholds: &RegionThresholds) -> Vec<Row> {
    rows.iter()
        .map(|rect| Row {
            rect: *rect,
            region: classify(rect, page, page_index, thresholds),
        })
        .collect()
}
