//! Watermark shape building.
//!
//! Turns a [`Watermark`] into one reusable [`Shape`] template: text
//! sizes come from the font-metrics collaborator, image sizes from the
//! decoded image's intrinsic pixel dimensions. The builder never decides
//! placement; the placement engine instantiates the template with anchors
//! from the geometry resolver, possibly many times for tiling.

use crate::common::unit::Emu;
use crate::error::{Result, WatermarkError};
use crate::watermark::shape::{Shape, ShapeContent};
use crate::watermark::spec::{Font, TextWatermark, Watermark};

/// Measured bounding box of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextExtent {
    /// Width of the widest line
    pub width: Emu,
    /// Height of all lines
    pub height: Emu,
}

/// Text-measurement collaborator.
///
/// Supplies the bounding box of rendered text for a font. Implementations
/// signal an unsupported-font error when the family cannot be resolved.
/// Providers are `Send + Sync` so documents can be processed on any
/// thread; the engine itself never shares one document across threads.
pub trait FontMetricsProvider: Send + Sync {
    /// Measure the bounding box of `text` rendered in `font`.
    ///
    /// Multi-line content (embedded `\n`) measures as the widest line by
    /// the stacked line height.
    fn measure(&self, font: &Font, text: &str) -> Result<TextExtent>;
}

/// Per-family average metrics, in em units.
#[derive(Debug, Clone, Copy)]
pub struct FamilyMetrics {
    /// Average advance width of a glyph, as a fraction of the point size
    pub avg_width_em: f64,
    /// Line height as a fraction of the point size
    pub line_height_em: f64,
}

/// Metrics table for common families, keyed by lowercase family name.
static FAMILY_METRICS: phf::Map<&'static str, FamilyMetrics> = phf::phf_map! {
    "arial" => FamilyMetrics { avg_width_em: 0.52, line_height_em: 1.15 },
    "helvetica" => FamilyMetrics { avg_width_em: 0.52, line_height_em: 1.15 },
    "calibri" => FamilyMetrics { avg_width_em: 0.47, line_height_em: 1.22 },
    "cambria" => FamilyMetrics { avg_width_em: 0.50, line_height_em: 1.17 },
    "courier new" => FamilyMetrics { avg_width_em: 0.60, line_height_em: 1.13 },
    "georgia" => FamilyMetrics { avg_width_em: 0.51, line_height_em: 1.14 },
    "garamond" => FamilyMetrics { avg_width_em: 0.45, line_height_em: 1.15 },
    "segoe ui" => FamilyMetrics { avg_width_em: 0.49, line_height_em: 1.33 },
    "tahoma" => FamilyMetrics { avg_width_em: 0.54, line_height_em: 1.21 },
    "times new roman" => FamilyMetrics { avg_width_em: 0.48, line_height_em: 1.15 },
    "trebuchet ms" => FamilyMetrics { avg_width_em: 0.52, line_height_em: 1.16 },
    "verdana" => FamilyMetrics { avg_width_em: 0.58, line_height_em: 1.22 },
};

/// Width penalty applied for bold text.
const BOLD_WIDTH_FACTOR: f64 = 1.06;

/// The built-in metrics provider.
///
/// Estimates text extents from a static table of average per-family glyph
/// widths. Families outside the table resolve to an unsupported-font
/// error; callers with real font files can substitute their own
/// [`FontMetricsProvider`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFontMetrics;

impl FontMetricsProvider for BuiltinFontMetrics {
    fn measure(&self, font: &Font, text: &str) -> Result<TextExtent> {
        let metrics = FAMILY_METRICS
            .get(font.family.to_lowercase().as_str())
            .ok_or_else(|| WatermarkError::UnsupportedFont(font.family.clone()))?;

        let mut width_factor = metrics.avg_width_em;
        if font.bold {
            width_factor *= BOLD_WIDTH_FACTOR;
        }

        let mut max_chars = 0usize;
        let mut lines = 0usize;
        for line in text.split('\n') {
            max_chars = max_chars.max(line.chars().count());
            lines += 1;
        }

        let width_pt = max_chars as f64 * font.size_pt * width_factor;
        let height_pt = lines.max(1) as f64 * font.size_pt * metrics.line_height_em;

        Ok(TextExtent {
            width: Emu::from_pt(width_pt),
            height: Emu::from_pt(height_pt),
        })
    }
}

/// Identify the media kind of image bytes: partname extension and content
/// type for the media part.
pub fn media_kind(bytes: &[u8]) -> Result<(&'static str, &'static str)> {
    let format =
        image::guess_format(bytes).map_err(|e| WatermarkError::InvalidImage(e.to_string()))?;
    match format {
        image::ImageFormat::Png => Ok(("png", crate::opc::content_type::PNG)),
        image::ImageFormat::Jpeg => Ok(("jpeg", crate::opc::content_type::JPEG)),
        image::ImageFormat::Gif => Ok(("gif", crate::opc::content_type::GIF)),
        other => Err(WatermarkError::InvalidImage(format!(
            "unsupported image format {:?}",
            other
        ))),
    }
}

/// Decode image bytes and return their intrinsic size at the 96 dpi
/// reference resolution.
fn intrinsic_size(bytes: &[u8]) -> Result<(Emu, Emu)> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| WatermarkError::InvalidImage(e.to_string()))?;
    Ok((
        Emu::from_pixels(decoded.width()),
        Emu::from_pixels(decoded.height()),
    ))
}

/// Builds one reusable shape template from a watermark.
pub struct ShapeBuilder<'a> {
    metrics: &'a dyn FontMetricsProvider,
}

impl<'a> ShapeBuilder<'a> {
    /// Create a builder over a metrics collaborator.
    pub fn new(metrics: &'a dyn FontMetricsProvider) -> Self {
        Self { metrics }
    }

    /// Build the shape template for a watermark.
    ///
    /// Fails with an unsupported-font or invalid-image error without any
    /// document mutation; the caller may skip this watermark and continue.
    pub fn build(&self, watermark: &Watermark) -> Result<Shape> {
        let (content, width, height) = match watermark {
            Watermark::Text(text) => self.text_content(text)?,
            Watermark::Image(img) => {
                // Validates decodability even when the size is overridden.
                media_kind(img.bytes())?;
                let (width, height) = match img.size_override() {
                    Some(size) => size,
                    None => intrinsic_size(img.bytes())?,
                };
                (ShapeContent::Picture, width, height)
            },
        };

        Ok(Shape {
            content,
            width,
            height,
            rotation: watermark.rotate_angle(),
            opacity: watermark.opacity(),
            name: None,
            alt_text: None,
            behind_text: true,
        })
    }

    fn text_content(&self, text: &TextWatermark) -> Result<(ShapeContent, Emu, Emu)> {
        let extent = self.metrics.measure(text.font(), text.text())?;
        let content = ShapeContent::Text {
            text: text.text().to_string(),
            font_family: text.font().family.clone(),
            font_size_pt: text.font().size_pt,
            bold: text.font().bold,
            italic: text.font().italic,
            color: text.foreground_color(),
        };
        Ok((content, extent.width, extent.height))
    }
}
