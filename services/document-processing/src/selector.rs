//! Page Selector

use integra_models::PagePolicy;

/// Whether page `page_index` of a `page_count`-page file is kept for a unit.
///
/// Under [`PagePolicy::RelevantPagesOnly`] the first and last page of every
/// file are kept as well, so statement headers and totals survive.
pub fn is_retained(policy: PagePolicy, page_index: usize, page_count: usize, relevant: bool) -> bool {
    match policy {
        PagePolicy::AllPages => true,
        PagePolicy::RelevantPagesOnly => {
            relevant || page_index == 0 || page_index + 1 == page_count
        }
    }
}
