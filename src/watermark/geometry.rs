//! Geometry resolution for watermark placement.
//!
//! Converts alignment and tiling configuration into absolute page anchors.
//! The page origin is top-left; all arithmetic is integer EMUs, so anchor
//! sequences are deterministic and restartable.

use crate::common::unit::Emu;
use crate::watermark::spec::{HorizontalAlignment, Measure, VerticalAlignment};

/// Resolve a spacing measure against the page dimension it applies to.
pub fn resolve_spacing(measure: Measure, page_dim: Emu) -> Emu {
    match measure {
        Measure::Percent(p) => Emu((page_dim.0 as f64 * p / 100.0) as i64),
        Measure::Absolute(emu) => emu,
    }
}

/// Resolve the absolute anchor for an aligned (untiled) shape.
///
/// Center alignment splits the leftover space evenly; Left/Top anchor at
/// the margin; Right/Bottom anchor at `page - shape - margin`.
pub fn resolve_anchor(
    halign: HorizontalAlignment,
    valign: VerticalAlignment,
    page_width: Emu,
    page_height: Emu,
    shape_width: Emu,
    shape_height: Emu,
    margin: Emu,
) -> (Emu, Emu) {
    let x = match halign {
        HorizontalAlignment::Left => margin,
        HorizontalAlignment::Center => Emu((page_width.0 - shape_width.0) / 2),
        HorizontalAlignment::Right => page_width - shape_width - margin,
    };
    let y = match valign {
        VerticalAlignment::Top => margin,
        VerticalAlignment::Center => Emu((page_height.0 - shape_height.0) / 2),
        VerticalAlignment::Bottom => page_height - shape_height - margin,
    };
    (x, y)
}

/// A finite sequence of tile anchors covering a page.
///
/// Anchors start at the margin and advance by `shape + spacing` per axis,
/// row-major, yielding every position where the shape still fits entirely
/// on the page. The iterator is a pure function of its inputs: cloning it
/// restarts the sequence.
///
/// A shape that does not fit the page at all yields exactly one anchor at
/// the margin. Steps are floored at one EMU, so zero-size shapes with zero
/// spacing still terminate.
#[derive(Debug, Clone)]
pub struct TileAnchors {
    page_width: Emu,
    page_height: Emu,
    shape_width: Emu,
    shape_height: Emu,
    h_step: i64,
    v_step: i64,
    margin: Emu,
    x: i64,
    y: i64,
    oversize: bool,
    done: bool,
}

impl TileAnchors {
    /// Create the anchor sequence for a page, shape, and resolved spacing.
    pub fn new(
        page_width: Emu,
        page_height: Emu,
        shape_width: Emu,
        shape_height: Emu,
        watermark_spacing: Emu,
        line_spacing: Emu,
        margin: Emu,
    ) -> Self {
        let oversize = margin.0 + shape_width.0 > page_width.0
            || margin.0 + shape_height.0 > page_height.0;
        Self {
            page_width,
            page_height,
            shape_width,
            shape_height,
            // Minimum-step floor of one EMU guards against a zero advance.
            h_step: (shape_width.0 + watermark_spacing.0).max(1),
            v_step: (shape_height.0 + line_spacing.0).max(1),
            margin,
            x: margin.0,
            y: margin.0,
            oversize,
            done: false,
        }
    }
}

impl Iterator for TileAnchors {
    type Item = (Emu, Emu);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.oversize {
            self.done = true;
            return Some((self.margin, self.margin));
        }

        let anchor = (Emu(self.x), Emu(self.y));

        self.x += self.h_step;
        if self.x + self.shape_width.0 > self.page_width.0 {
            self.x = self.margin.0;
            self.y += self.v_step;
            if self.y + self.shape_height.0 > self.page_height.0 {
                self.done = true;
            }
        }

        Some(anchor)
    }
}
