//! Genomic ↔ screen coordinate transform.
//!
//! A [`CoordinateMapper`] is a snapshot of one viewport. Every call
//! recomputes from the absolute viewport bounds so no rounding error can
//! accumulate while scrolling.

use crate::model::Orientation;
use crate::viewport::ViewportState;

/// Maps genomic positions to horizontal screen offsets and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    start: i64,
    end: i64,
    scale: f64,
    orientation: Orientation,
    window_width: f64,
}

impl CoordinateMapper {
    /// Creates a mapper from a viewport snapshot and the window width in pixels.
    pub fn new(state: &ViewportState, window_width: f64) -> Self {
        Self {
            start: state.start,
            end: state.end,
            scale: state.scale,
            orientation: state.orientation,
            window_width,
        }
    }

    /// Pixels per base.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn window_width(&self) -> f64 {
        self.window_width
    }

    /// Number of bases that fit in the window at the current scale.
    pub fn visible_bases(&self) -> f64 {
        self.window_width / self.scale
    }

    /// Screen offset of the left edge of the base at `pos`.
    pub fn genomic_to_screen(&self, pos: i64) -> f64 {
        match self.orientation {
            Orientation::Direct => (pos - self.start) as f64 * self.scale,
            Orientation::Reverse => (self.end - pos) as f64 * self.scale,
        }
    }

    /// Inclusive genomic interval covered by the pixel at `x`.
    ///
    /// When zoomed out one pixel spans several bases, so this is a range
    /// rather than a single position.
    pub fn screen_to_genomic_range(&self, x: f64) -> (i64, i64) {
        let near = (x / self.scale).floor() as i64;
        let far = ((x + 1.0) / self.scale).floor() as i64;
        match self.orientation {
            Orientation::Direct => (self.start + near, self.start + far),
            Orientation::Reverse => (self.end - far, self.end - near),
        }
    }

    /// Left and right screen edges of the inclusive genomic span `[start, end]`.
    pub fn span_to_screen(&self, start: i64, end: i64) -> (f64, f64) {
        match self.orientation {
            Orientation::Direct => (
                self.genomic_to_screen(start),
                self.genomic_to_screen(end) + self.scale,
            ),
            Orientation::Reverse => (
                self.genomic_to_screen(end),
                self.genomic_to_screen(start) + self.scale,
            ),
        }
    }
}
