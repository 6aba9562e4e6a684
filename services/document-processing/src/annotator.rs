//! Page Annotator
//!
//! Turns the matches of one unit on one page into overlays. Overlays are
//! produced in draw order: masks first, then highlights, then unit-name marks,
//! so translucent layers stay visible on top of opaque ones.

use std::collections::HashSet;

use integra_models::{
    Annotation, HighlightScope, OverlayKind, OverlayMode, OverlayStyle, Rect, Region, RunConfig, Word,
};

use crate::layout::PageLayout;
use crate::matcher::UnitPageMatch;

#[derive(Debug, Clone)]
pub struct PageAnnotator {
    mode: OverlayMode,
    scope: HighlightScope,
    unit_name_style: Option<OverlayStyle>,
}

impl PageAnnotator {
    pub fn new(mode: OverlayMode, scope: HighlightScope, unit_name_style: Option<OverlayStyle>) -> Self {
        Self {
            mode,
            scope,
            unit_name_style,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        let unit_name_style = config.mark_unit_names.then(|| config.kind.unit_name_style());
        Self::new(config.overlay_mode, config.highlight_scope, unit_name_style)
    }

    /// Overlays for `unit` on a retained page.
    pub fn annotate(&self, layout: &PageLayout<'_>, matched: &UnitPageMatch, unit: &str) -> Vec<Annotation> {
        let words = &layout.page.words;
        let mut annotations = Vec::new();

        if self.mode == OverlayMode::Mask {
            let matched_words: Vec<&Rect> = matched
                .word_indices
                .iter()
                .filter_map(|&idx| words.get(idx).map(|word| &word.bbox))
                .collect();

            for row in &layout.rows {
                // header and footer rows are never masked
                if row.region != Region::Body {
                    continue;
                }
                if matched_words.iter().any(|bbox| row.rect.contains(bbox)) {
                    continue;
                }
                annotations.extend(OverlayStyle::MASK.stamp(row.rect, OverlayKind::Mask));
            }
        }

        let mut highlighted = HashSet::new();
        for &idx in &matched.word_indices {
            let (Some(word), Some(row)) = (words.get(idx), layout.word_rows.get(idx)) else {
                continue;
            };
            let rect = match self.scope {
                HighlightScope::Row => *row,
                HighlightScope::Word => word.bbox,
                HighlightScope::Padded { left, top, right, bottom } => {
                    word.bbox.padded(left, top, right, bottom).clamped(layout.page.size)
                }
            };
            if highlighted.insert(rect.key()) {
                annotations.extend(OverlayStyle::HIGHLIGHT.stamp(rect, OverlayKind::Highlight));
            }
        }

        if let Some(style) = &self.unit_name_style {
            for rect in find_phrase(words, unit) {
                annotations.extend(style.stamp(rect, OverlayKind::UnitName));
            }
        }

        annotations
    }
}

fn normalize(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Boxes of every run of consecutive words spelling `phrase`, ignoring case
/// and surrounding punctuation.
pub fn find_phrase(words: &[Word], phrase: &str) -> Vec<Rect> {
    let tokens: Vec<String> = phrase
        .split_whitespace()
        .map(normalize)
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() || tokens.len() > words.len() {
        return Vec::new();
    }

    words
        .windows(tokens.len())
        .filter(|window| window.iter().zip(&tokens).all(|(word, token)| normalize(&word.text) == *token))
        .filter_map(|window| {
            let (first, rest) = window.split_first()?;
            Some(rest.iter().fold(first.bbox, |rect, word| rect.union(&word.bbox)))
        })
        .collect()
}

/// Number of overlays of a given kind.
pub fn count(annotations: &[Annotation], kind: OverlayKind) -> usize {
    annotations.iter().filter(|a| a.kind == kind).count()
}
