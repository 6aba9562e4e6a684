//! Identifier Matcher
//!
//! A word matches a unit when its whole text fits the identifier format and
//! is one of the unit's identifiers. The format check is shared by all units
//! of a page, so it runs once per page through [`IdentifierMatcher::candidates`].

use std::collections::BTreeSet;

use integra_models::Word;
use integra_utils::{compile_identifier_pattern, StatementResult};
use regex::Regex;

#[derive(Debug, Clone)]
pub struct IdentifierMatcher {
    pattern: Regex,
}

/// Words of one page that matched one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitPageMatch {
    /// Indices into the page's word list, ascending.
    pub word_indices: Vec<usize>,
    pub identifiers: BTreeSet<String>,
}

impl UnitPageMatch {
    /// A page is relevant for a unit iff at least one word matched.
    pub fn is_relevant(&self) -> bool {
        !self.word_indices.is_empty()
    }
}

impl IdentifierMatcher {
    pub fn new(pattern: &str) -> StatementResult<Self> {
        Ok(Self {
            pattern: compile_identifier_pattern(pattern)?,
        })
    }

    /// Full-match of `text` against the identifier format.
    pub fn is_candidate(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Indices of the words whose text has the identifier format.
    pub fn candidates(&self, words: &[Word]) -> Vec<usize> {
        words
            .iter()
            .enumerate()
            .filter(|(_, word)| self.is_candidate(&word.text))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Candidates of a page that belong to `identifiers`.
    pub fn match_unit(&self, words: &[Word], candidates: &[usize], identifiers: &BTreeSet<String>) -> UnitPageMatch {
        let mut found = UnitPageMatch::default();

        for &idx in candidates {
            let Some(word) = words.get(idx) else {
                continue;
            };
            if identifiers.contains(&word.text) {
                found.word_indices.push(idx);
                found.identifiers.insert(word.text.clone());
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use integra_models::{DocumentKind, Rect};

    fn words(texts: &[&str]) -> Vec<Word> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Word::new(*text, Rect::new(i as f64 * 50.0, 0.0, i as f64 * 50.0 + 40.0, 10.0), 0))
            .collect()
    }

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_esi_format_requires_full_match() {
        let matcher = IdentifierMatcher::new(DocumentKind::Esic.default_pattern()).unwrap();
        assert!(matcher.is_candidate("1234567890"));
        assert!(matcher.is_candidate("123456789012"));
        assert!(!matcher.is_candidate("123456789"));
        assert!(!matcher.is_candidate("1234567890123"));
        assert!(!matcher.is_candidate("1234567890,"));
        assert!(!matcher.is_candidate("ESI1234567890"));
    }

    #[test]
    fn test_match_unit_requires_membership() {
        let matcher = IdentifierMatcher::new(DocumentKind::Esic.default_pattern()).unwrap();
        let page = words(&["Name", "1234567890", "9999999999", "1234567890"]);
        let candidates = matcher.candidates(&page);
        assert_eq!(candidates, vec![1, 2, 3]);

        let found = matcher.match_unit(&page, &candidates, &ids(&["1234567890"]));
        assert_eq!(found.word_indices, vec![1, 3]);
        assert_eq!(found.identifiers, ids(&["1234567890"]));
        assert!(found.is_relevant());

        let none = matcher.match_unit(&page, &candidates, &ids(&["5555555555"]));
        assert!(!none.is_relevant());
    }

    #[test]
    fn test_leading_zeros_are_significant() {
        let matcher = IdentifierMatcher::new(DocumentKind::Bank.default_pattern()).unwrap();
        let page = words(&["001234", "1234"]);
        let candidates = matcher.candidates(&page);

        let found = matcher.match_unit(&page, &candidates, &ids(&["001234"]));
        assert_eq!(found.word_indices, vec![0]);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(IdentifierMatcher::new("[0-9").is_err());
    }
}
