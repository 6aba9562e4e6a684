use serde::{Deserialize, Serialize};

use crate::geometry::{PageSize, Rect};

/// A single word extracted from a page, with its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub bbox: Rect,
    pub page_index: usize,
}

impl Word {
    pub fn new(text: impl Into<String>, bbox: Rect, page_index: usize) -> Self {
        Self {
            text: text.into(),
            bbox,
            page_index,
        }
    }
}

/// Everything the engine needs to know about one source page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page_index: usize,
    pub size: PageSize,
    pub words: Vec<Word>,
}

/// Vertical page region a row falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Header,
    Footer,
    Body,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Footer => write!(f, "footer"),
            Self::Body => write!(f, "body"),
        }
    }
}

/// A visual line of text: the union of the words judged to share it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub rect: Rect,
    pub region: Region,
}

/// RGB color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const YELLOW: Color = Color { r: 1.0, g: 1.0, b: 0.0 };
    pub const BLUE: Color = Color { r: 0.0, g: 0.0, b: 1.0 };
    pub const GRAY: Color = Color { r: 0.5, g: 0.5, b: 0.5 };

    pub fn components(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// What an overlay stands for; used for statistics and draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Highlight,
    Mask,
    UnitName,
}

/// A rectangle overlay stamped onto a page. Never mutated once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub rect: Rect,
    pub fill: Color,
    pub stroke: Color,
    pub opacity: f32,
    pub border_width: f32,
    pub read_only: bool,
    pub kind: OverlayKind,
}

/// Visual parameters shared by every overlay of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub fill: Color,
    pub stroke: Color,
    pub opacity: f32,
    pub border_width: f32,
    pub read_only: bool,
}

impl OverlayStyle {
    /// Translucent highlight for matched rows.
    pub const HIGHLIGHT: OverlayStyle = OverlayStyle {
        fill: Color::YELLOW,
        stroke: Color::YELLOW,
        opacity: 0.3,
        border_width: 1.0,
        read_only: true,
    };

    /// Opaque gray block covering irrelevant body rows.
    pub const MASK: OverlayStyle = OverlayStyle {
        fill: Color::GRAY,
        stroke: Color::GRAY,
        opacity: 1.0,
        border_width: 1.0,
        read_only: true,
    };

    /// Build an annotation, or `None` when the rectangle has no area.
    pub fn stamp(&self, rect: Rect, kind: OverlayKind) -> Option<Annotation> {
        if rect.is_degenerate() {
            return None;
        }

        Some(Annotation {
            rect,
            fill: self.fill,
            stroke: self.stroke,
            opacity: self.opacity,
            border_width: self.border_width,
            read_only: self.read_only,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_skips_degenerate_rect() {
        let flat = Rect::new(0.0, 10.0, 50.0, 10.0);
        assert!(OverlayStyle::MASK.stamp(flat, OverlayKind::Mask).is_none());

        let annotation = OverlayStyle::HIGHLIGHT
            .stamp(Rect::new(0.0, 0.0, 50.0, 10.0), OverlayKind::Highlight)
            .unwrap();
        assert_eq!(annotation.opacity, 0.3);
        assert!(annotation.read_only);
        assert_eq!(annotation.fill, Color::YELLOW);
    }
}
