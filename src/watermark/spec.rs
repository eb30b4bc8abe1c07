//! Watermark specification types.
//!
//! These are immutable configuration structs: built once with `with_*`
//! setters, then passed by reference into the engine. Opacity and rotation
//! are normalized at construction, so a spec in hand always satisfies the
//! model invariants.

use crate::common::color::Color;
use crate::common::unit::{Emu, clamp_opacity, normalize_rotation};
use crate::error::Result;
use std::path::Path;

/// Horizontal page alignment of a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical page alignment of a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    Top,
    #[default]
    Center,
    Bottom,
}

/// A tiling spacing measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    /// Percentage of the corresponding page dimension
    Percent(f64),
    /// An absolute length
    Absolute(Emu),
}

/// Tiling configuration: repeat the watermark across the page.
///
/// Spacing values are non-negative by construction; negative inputs are
/// clamped to zero. A spacing of zero with a non-zero shape size produces
/// touching tiles, which is a caller choice the engine does not forbid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileOptions {
    /// Vertical gap between tile rows
    line_spacing: Measure,
    /// Horizontal gap between tiles in a row
    watermark_spacing: Measure,
}

impl TileOptions {
    /// Create tile options from row and column spacing.
    pub fn new(line_spacing: Measure, watermark_spacing: Measure) -> Self {
        Self {
            line_spacing: clamp_measure(line_spacing),
            watermark_spacing: clamp_measure(watermark_spacing),
        }
    }

    /// Vertical gap between tile rows.
    #[inline]
    pub fn line_spacing(&self) -> Measure {
        self.line_spacing
    }

    /// Horizontal gap between tiles in a row.
    #[inline]
    pub fn watermark_spacing(&self) -> Measure {
        self.watermark_spacing
    }
}

fn clamp_measure(measure: Measure) -> Measure {
    match measure {
        Measure::Percent(p) => Measure::Percent(p.max(0.0)),
        Measure::Absolute(emu) => Measure::Absolute(Emu(emu.0.max(0))),
    }
}

/// Font selection for a text watermark.
///
/// Style flags are independent booleans rather than a bitmask, so there
/// are no undefined combinations.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    /// Font family name
    pub family: String,
    /// Size in points
    pub size_pt: f64,
    /// Bold style
    pub bold: bool,
    /// Italic style
    pub italic: bool,
}

impl Font {
    /// Create a regular font of the given family and point size.
    pub fn new(family: impl Into<String>, size_pt: f64) -> Self {
        Self {
            family: family.into(),
            size_pt,
            bold: false,
            italic: false,
        }
    }

    /// Enable bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Enable italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// A text watermark specification.
#[derive(Debug, Clone)]
pub struct TextWatermark {
    text: String,
    font: Font,
    color: Color,
    opacity: f64,
    rotate_angle: f64,
    horizontal_alignment: HorizontalAlignment,
    vertical_alignment: VerticalAlignment,
    tile_options: Option<TileOptions>,
}

impl TextWatermark {
    /// Create a text watermark with default appearance: silver, fully
    /// opaque, unrotated, centered.
    pub fn new(text: impl Into<String>, font: Font) -> Self {
        Self {
            text: text.into(),
            font,
            color: Color::SILVER,
            opacity: 1.0,
            rotate_angle: 0.0,
            horizontal_alignment: HorizontalAlignment::default(),
            vertical_alignment: VerticalAlignment::default(),
            tile_options: None,
        }
    }

    /// Set the foreground color.
    pub fn with_foreground_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Set the opacity, clamped to [0, 1].
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = clamp_opacity(opacity);
        self
    }

    /// Set the rotation angle in degrees, counter-clockwise positive,
    /// normalized to (-360, 360).
    pub fn with_rotate_angle(mut self, degrees: f64) -> Self {
        self.rotate_angle = normalize_rotation(degrees);
        self
    }

    /// Set the horizontal alignment.
    pub fn with_horizontal_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.horizontal_alignment = alignment;
        self
    }

    /// Set the vertical alignment.
    pub fn with_vertical_alignment(mut self, alignment: VerticalAlignment) -> Self {
        self.vertical_alignment = alignment;
        self
    }

    /// Tile the watermark across the page.
    pub fn with_tile_options(mut self, tile: TileOptions) -> Self {
        self.tile_options = Some(tile);
        self
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn font(&self) -> &Font {
        &self.font
    }

    #[inline]
    pub fn foreground_color(&self) -> Color {
        self.color
    }
}

/// An image watermark specification.
#[derive(Debug, Clone)]
pub struct ImageWatermark {
    bytes: Vec<u8>,
    opacity: f64,
    rotate_angle: f64,
    horizontal_alignment: HorizontalAlignment,
    vertical_alignment: VerticalAlignment,
    tile_options: Option<TileOptions>,
    size_override: Option<(Emu, Emu)>,
}

impl ImageWatermark {
    /// Create an image watermark from raw image bytes.
    ///
    /// The bytes are decoded lazily by the shape builder; an undecodable
    /// image surfaces there as an invalid-image error.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            opacity: 1.0,
            rotate_angle: 0.0,
            horizontal_alignment: HorizontalAlignment::default(),
            vertical_alignment: VerticalAlignment::default(),
            tile_options: None,
            size_override: None,
        }
    }

    /// Create an image watermark from a file on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }

    /// Set the opacity, clamped to [0, 1].
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = clamp_opacity(opacity);
        self
    }

    /// Set the rotation angle in degrees, counter-clockwise positive,
    /// normalized to (-360, 360).
    pub fn with_rotate_angle(mut self, degrees: f64) -> Self {
        self.rotate_angle = normalize_rotation(degrees);
        self
    }

    /// Set the horizontal alignment.
    pub fn with_horizontal_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.horizontal_alignment = alignment;
        self
    }

    /// Set the vertical alignment.
    pub fn with_vertical_alignment(mut self, alignment: VerticalAlignment) -> Self {
        self.vertical_alignment = alignment;
        self
    }

    /// Tile the watermark across the page.
    pub fn with_tile_options(mut self, tile: TileOptions) -> Self {
        self.tile_options = Some(tile);
        self
    }

    /// Override the shape size instead of using the image's intrinsic
    /// dimensions.
    pub fn with_size(mut self, width: Emu, height: Emu) -> Self {
        self.size_override = Some((width, height));
        self
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn size_override(&self) -> Option<(Emu, Emu)> {
        self.size_override
    }
}

/// A watermark specification: text or image.
#[derive(Debug, Clone)]
pub enum Watermark {
    Text(TextWatermark),
    Image(ImageWatermark),
}

impl Watermark {
    /// The watermark's opacity.
    pub fn opacity(&self) -> f64 {
        match self {
            Watermark::Text(t) => t.opacity,
            Watermark::Image(i) => i.opacity,
        }
    }

    /// The rotation angle in degrees, counter-clockwise positive.
    pub fn rotate_angle(&self) -> f64 {
        match self {
            Watermark::Text(t) => t.rotate_angle,
            Watermark::Image(i) => i.rotate_angle,
        }
    }

    /// The horizontal alignment.
    pub fn horizontal_alignment(&self) -> HorizontalAlignment {
        match self {
            Watermark::Text(t) => t.horizontal_alignment,
            Watermark::Image(i) => i.horizontal_alignment,
        }
    }

    /// The vertical alignment.
    pub fn vertical_alignment(&self) -> VerticalAlignment {
        match self {
            Watermark::Text(t) => t.vertical_alignment,
            Watermark::Image(i) => i.vertical_alignment,
        }
    }

    /// The tiling configuration, if any.
    pub fn tile_options(&self) -> Option<&TileOptions> {
        match self {
            Watermark::Text(t) => t.tile_options.as_ref(),
            Watermark::Image(i) => i.tile_options.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opacity_clamped_at_construction() {
        let wm = TextWatermark::new("x", Font::new("Arial", 19.0)).with_opacity(1.7);
        assert_eq!(Watermark::Text(wm).opacity(), 1.0);

        let wm = ImageWatermark::new(vec![]).with_opacity(-0.5);
        assert_eq!(Watermark::Image(wm).opacity(), 0.0);
    }

    #[test]
    fn test_rotation_normalized_at_construction() {
        let wm = TextWatermark::new("x", Font::new("Arial", 19.0)).with_rotate_angle(385.0);
        assert_eq!(Watermark::Text(wm).rotate_angle(), 25.0);
    }

    #[test]
    fn test_negative_spacing_clamped() {
        let tile = TileOptions::new(Measure::Percent(-5.0), Measure::Absolute(Emu(-100)));
        assert_eq!(tile.line_spacing(), Measure::Percent(0.0));
        assert_eq!(tile.watermark_spacing(), Measure::Absolute(Emu(0)));
    }

    #[test]
    fn test_font_style_flags() {
        let font = Font::new("Arial", 36.0).bold().italic();
        assert!(font.bold);
        assert!(font.italic);
    }
}
