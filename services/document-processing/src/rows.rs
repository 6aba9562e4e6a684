//! Row Grouper
//!
//! Clusters the words of a page into visual rows by vertical proximity.

use std::collections::HashSet;

use integra_models::{Rect, Word};

/// Row rectangle of every word, index-aligned with `words`.
///
/// A word's row is the union of all words whose top edge lies within
/// `tolerance` of its own. This is a pairwise join, not a transitive
/// clustering: two words linked only through a third keep distinct rows.
pub fn group_rows(words: &[Word], tolerance: f64) -> Vec<Rect> {
    words
        .iter()
        .map(|word| {
            words
                .iter()
                .filter(|other| (other.bbox.top() - word.bbox.top()).abs() < tolerance)
                .fold(word.bbox, |row, other| row.union(&other.bbox))
        })
        .collect()
}

/// Distinct row rectangles in first-seen order.
pub fn distinct_rows(rows: &[Rect]) -> Vec<Rect> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| seen.insert(row.key()))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x0: f64, top: f64) -> Word {
        Word::new(text, Rect::new(x0, top, x0 + 40.0, top + 10.0), 0)
    }

    #[test]
    fn test_words_on_one_line_share_a_row() {
        let words = vec![word("1234567890", 50.0, 300.0), word("Salary", 120.0, 302.0), word("Total", 50.0, 340.0)];
        let rows = group_rows(&words, 10.0);

        assert_eq!(rows[0], rows[1]);
        assert_eq!(rows[0], Rect::new(50.0, 300.0, 160.0, 312.0));
        assert_eq!(rows[2], words[2].bbox);
        assert_eq!(distinct_rows(&rows).len(), 2);
    }

    #[test]
    fn test_grouping_is_not_transitive() {
        // a-b and b-c are within tolerance, a-c is not
        let words = vec![word("a", 0.0, 100.0), word("b", 50.0, 107.0), word("c", 100.0, 114.0)];
        let rows = group_rows(&words, 10.0);

        assert_ne!(rows[0], rows[2]);
        assert_eq!(rows[1], Rect::new(0.0, 100.0, 140.0, 124.0));
        assert_eq!(distinct_rows(&rows).len(), 3);
    }

    #[test]
    fn test_tolerance_is_strict() {
        let words = vec![word("a", 0.0, 100.0), word("b", 50.0, 110.0)];
        let rows = group_rows(&words, 10.0);
        assert_ne!(rows[0], rows[1]);
    }

    #[test]
    fn test_empty_page_has_no_rows() {
        assert!(group_rows(&[], 10.0).is_empty());
    }
}
