//! Positioned text extraction.
//!
//! `pdf-extract` interprets the page content (fonts, encodings, Form
//! XObjects) and reports every shown glyph with its text rendering matrix.
//! [`WordCollector`] turns those into glyph boxes and joins adjacent glyphs
//! into words. Coordinates stay in PDF user space (y up) here; the backend
//! flips them to the top-left origin the engine works in.

use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::{anyhow, Result};
use lopdf::Document;
use pdf_extract::{output_doc_page, MediaBox, OutputDev, OutputError, Transform};

/// Glyph box relative to the baseline, in em.
const DESCENT: f64 = -0.2;
const ASCENT: f64 = 0.8;

/// A word in PDF user space: `(x0, y0)` bottom-left, `(x1, y1)` top-right.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawWord {
    pub text: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

#[derive(Debug, Clone)]
struct Glyph {
    text: String,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Glyph {
    /// Box of a glyph `advance` text-space units wide, placed by `trm`.
    ///
    /// `trm` carries the text and graphics matrices but not the font size,
    /// so both axes are scaled by `font_size` here.
    fn place(trm: &Transform, advance: f64, font_size: f64, text: &str) -> Self {
        let apply = |x: f64, y: f64| {
            (
                x * trm.m11 + y * trm.m21 + trm.m31,
                x * trm.m12 + y * trm.m22 + trm.m32,
            )
        };

        let (low, high) = (DESCENT * font_size, ASCENT * font_size);
        let corners = [apply(0.0, low), apply(advance, low), apply(0.0, high), apply(advance, high)];

        let (mut x0, mut y0, mut x1, mut y1) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for (x, y) in corners {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }

        Self {
            text: text.to_string(),
            x0,
            y0,
            x1,
            y1,
        }
    }
}

/// [`OutputDev`] recording the box of every glyph shown on a page.
#[derive(Debug, Default)]
pub(crate) struct WordCollector {
    glyphs: Vec<Glyph>,
}

impl WordCollector {
    pub(crate) fn into_words(self) -> Vec<RawWord> {
        join_words(self.glyphs)
    }
}

impl OutputDev for WordCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.glyphs.clear();
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        self.glyphs.push(Glyph::place(trm, width * font_size, font_size, char));
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Whether `next` continues the word whose last glyph is `last`.
fn continues(last: &Glyph, next: &Glyph) -> bool {
    let height = (last.y1 - last.y0).max(next.y1 - next.y0).max(1.0);
    let same_line = (last.y0 - next.y0).abs() < height * 0.5;
    let gap = next.x0 - last.x1;

    same_line && gap > -height * 0.5 && gap < height * 0.25
}

fn join_words(glyphs: Vec<Glyph>) -> Vec<RawWord> {
    let mut words = Vec::new();
    let mut current: Option<(RawWord, Glyph)> = None;

    for glyph in glyphs {
        if glyph.text.chars().all(char::is_whitespace) {
            words.extend(current.take().map(|(word, _)| word));
            continue;
        }

        let extends = matches!(&current, Some((_, last)) if continues(last, &glyph));

        if extends {
            if let Some((word, last)) = current.as_mut() {
                word.text.push_str(&glyph.text);
                word.x0 = word.x0.min(glyph.x0);
                word.y0 = word.y0.min(glyph.y0);
                word.x1 = word.x1.max(glyph.x1);
                word.y1 = word.y1.max(glyph.y1);
                *last = glyph;
            }
            continue;
        }

        words.extend(current.take().map(|(word, _)| word));
        let word = RawWord {
            text: glyph.text.clone(),
            x0: glyph.x0,
            y0: glyph.y0,
            x1: glyph.x1,
            y1: glyph.y1,
        };
        current = Some((word, glyph));
    }

    words.extend(current.map(|(word, _)| word));
    words
}

/// Extract the words of page `page_number` (1-based, as in `get_pages`),
/// in content-stream order.
///
/// The interpreter panics on some malformed fonts and pages without a
/// `/MediaBox`; those surface as errors for the page.
pub(crate) fn extract_words(doc: &Document, page_number: u32) -> Result<Vec<RawWord>> {
    let mut collector = WordCollector::default();

    match catch_unwind(AssertUnwindSafe(|| output_doc_page(doc, &mut collector, page_number))) {
        Ok(Ok(())) => Ok(collector.into_words()),
        Ok(Err(e)) => Err(anyhow!("text extraction failed: {}", e)),
        Err(_) => Err(anyhow!("text extraction panicked on a malformed page")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(text: &str, x0: f64, x1: f64) -> Glyph {
        Glyph {
            text: text.to_string(),
            x0,
            y0: 100.0,
            x1,
            y1: 112.0,
        }
    }

    fn translation(x: f64, y: f64) -> Transform {
        Transform::row_major(1.0, 0.0, 0.0, 1.0, x, y)
    }

    #[test]
    fn test_glyphs_join_into_words() {
        let glyphs = vec![
            glyph("1", 10.0, 16.0),
            glyph("2", 16.0, 22.0),
            glyph(" ", 22.0, 25.0),
            glyph("A", 25.0, 31.0),
            glyph("B", 60.0, 66.0),
        ];

        let words = join_words(glyphs);
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["12", "A", "B"]);
        assert_eq!(words[0].x0, 10.0);
        assert_eq!(words[0].x1, 22.0);
    }

    #[test]
    fn test_collector_places_glyphs() {
        let mut collector = WordCollector::default();
        // two glyphs half an em wide at 10pt, the second advanced by 5
        collector.output_character(&translation(100.0, 700.0), 0.5, 0.0, 10.0, "4").unwrap();
        collector.output_character(&translation(105.0, 700.0), 0.5, 0.0, 10.0, "2").unwrap();

        let words = collector.into_words();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "42");
        assert_eq!(words[0].x0, 100.0);
        assert_eq!(words[0].x1, 110.0);
        assert_eq!(words[0].y0, 698.0);
        assert_eq!(words[0].y1, 708.0);
    }

    #[test]
    fn test_scaled_matrix_grows_box() {
        let trm = Transform::row_major(2.0, 0.0, 0.0, 2.0, 50.0, 50.0);
        let glyph = Glyph::place(&trm, 5.0, 10.0, "7");

        assert_eq!(glyph.x0, 50.0);
        assert_eq!(glyph.x1, 60.0);
        assert_eq!(glyph.y0, 46.0);
        assert_eq!(glyph.y1, 66.0);
    }

    #[test]
    fn test_begin_page_resets_glyphs() {
        let mut collector = WordCollector::default();
        collector.output_character(&translation(10.0, 10.0), 0.5, 0.0, 10.0, "x").unwrap();
        let media_box = MediaBox { llx: 0.0, lly: 0.0, urx: 595.0, ury: 842.0 };
        collector.begin_page(1, &media_box, None).unwrap();

        assert!(collector.into_words().is_empty());
    }
}
