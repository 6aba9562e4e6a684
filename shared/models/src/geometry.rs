use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in layout units.
///
/// Origin is the top-left corner of the page and `y` grows downwards, so
/// `y0` is the top edge and `y1` the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Bit-exact identity of a [`Rect`], usable as a set or map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RectKey([u64; 4]);

impl Rect {
    /// Build a rectangle, swapping coordinates so that `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn top(&self) -> f64 {
        self.y0
    }

    pub fn bottom(&self) -> f64 {
        self.y1
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Zero-area or non-finite rectangles never produce overlays.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
            || !(self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite())
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && self.x1 >= other.x1 && self.y1 >= other.y1
    }

    /// Grow each edge outwards by the given amounts.
    pub fn padded(&self, left: f64, top: f64, right: f64, bottom: f64) -> Rect {
        Rect::new(self.x0 - left, self.y0 - top, self.x1 + right, self.y1 + bottom)
    }

    /// Clamp to `[0, width] x [0, height]`.
    pub fn clamped(&self, size: PageSize) -> Rect {
        Rect {
            x0: self.x0.clamp(0.0, size.width),
            y0: self.y0.clamp(0.0, size.height),
            x1: self.x1.clamp(0.0, size.width),
            y1: self.y1.clamp(0.0, size.height),
        }
    }

    pub fn key(&self) -> RectKey {
        // `+ 0.0` folds -0.0 into 0.0 so equal rectangles share a key
        RectKey([
            (self.x0 + 0.0).to_bits(),
            (self.y0 + 0.0).to_bits(),
            (self.x1 + 0.0).to_bits(),
            (self.y1 + 0.0).to_bits(),
        ])
    }
}

/// Page dimensions in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const A4: PageSize = PageSize { width: 595.0, height: 842.0 };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}
