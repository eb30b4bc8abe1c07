//! Read-side inventory of watermark shapes in a document part.
//!
//! Watermarks are VML `<v:shape>` elements inside `<w:pict>` runs. This
//! scan recovers the attributes the engine wrote — name, alternative text,
//! geometry, opacity, text content — so callers and tests can verify what
//! a part contains (for example, counting shapes tagged with a given name
//! after repeated placement).

use crate::error::{Result, WatermarkError};
use quick_xml::Reader;
use quick_xml::events::Event;

/// What kind of drawing a scanned shape is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// A text-path (WordArt style) watermark
    TextPath,
    /// A picture watermark
    Picture,
}

/// A watermark shape recovered from part XML.
#[derive(Debug, Clone)]
pub struct ShapeInfo {
    /// Shape name (the `id` attribute)
    pub name: Option<String>,
    /// Alternative text
    pub alt_text: Option<String>,
    /// Text content for text-path shapes
    pub text: Option<String>,
    /// Shape kind; defaults to text-path until imagedata is seen
    pub kind: ShapeKind,
    /// Rotation in degrees, counter-clockwise positive
    pub rotation: f64,
    /// Fill opacity in [0, 1]
    pub opacity: f64,
    /// Left offset in points
    pub left_pt: f64,
    /// Top offset in points
    pub top_pt: f64,
    /// Width in points
    pub width_pt: f64,
    /// Height in points
    pub height_pt: f64,
    /// Fill color as written (e.g. "#ff0000")
    pub fill_color: Option<String>,
    /// Relationship ID of the image part for pictures
    pub image_r_id: Option<String>,
}

impl ShapeInfo {
    fn new() -> Self {
        Self {
            name: None,
            alt_text: None,
            text: None,
            kind: ShapeKind::TextPath,
            rotation: 0.0,
            opacity: 1.0,
            left_pt: 0.0,
            top_pt: 0.0,
            width_pt: 0.0,
            height_pt: 0.0,
            fill_color: None,
            image_r_id: None,
        }
    }

    /// Apply a VML `style` attribute.
    fn apply_style(&mut self, style: &str) {
        for entry in style.split(';') {
            let Some((key, value)) = entry.split_once(':') else {
                continue;
            };
            match key.trim() {
                "rotation" => {
                    if let Ok(vml_rotation) = value.trim().parse::<f64>() {
                        // VML rotation is clockwise positive; the engine
                        // works counter-clockwise positive.
                        self.rotation = crate::common::unit::normalize_rotation(-vml_rotation);
                    }
                },
                "margin-left" => self.left_pt = parse_pt(value),
                "margin-top" => self.top_pt = parse_pt(value),
                "width" => self.width_pt = parse_pt(value),
                "height" => self.height_pt = parse_pt(value),
                _ => {},
            }
        }
    }
}

/// Parse a point-valued style entry like "153.5pt".
fn parse_pt(value: &str) -> f64 {
    value
        .trim()
        .trim_end_matches("pt")
        .parse::<f64>()
        .unwrap_or(0.0)
}

/// Parse a VML opacity attribute: a plain fraction ("0.8") or 1/65536
/// fixed-point notation ("52428f").
fn parse_opacity(value: &str) -> f64 {
    let value = value.trim();
    if let Some(fixed) = value.strip_suffix('f') {
        fixed.parse::<f64>().map(|v| v / 65536.0).unwrap_or(1.0)
    } else {
        value.parse::<f64>().unwrap_or(1.0)
    }
}

/// Scan a part's XML for VML watermark shapes.
pub fn scan_shapes(xml: &[u8]) -> Result<Vec<ShapeInfo>> {
    let mut shapes: Vec<ShapeInfo> = Vec::new();
    let mut in_shape = false;

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                match e.local_name().as_ref() {
                    b"shape" => {
                        let mut shape = ShapeInfo::new();
                        for attr in e.attributes().flatten() {
                            let Ok(value) = attr.decode_and_unescape_value(reader.decoder())
                            else {
                                continue;
                            };
                            match attr.key.local_name().as_ref() {
                                b"id" => shape.name = Some(value.into_owned()),
                                b"alt" => shape.alt_text = Some(value.into_owned()),
                                b"style" => shape.apply_style(&value),
                                b"fillcolor" => shape.fill_color = Some(value.into_owned()),
                                _ => {},
                            }
                        }
                        shapes.push(shape);
                        in_shape = true;
                    },
                    b"fill" => {
                        if in_shape {
                            for attr in e.attributes().flatten() {
                                if attr.key.local_name().as_ref() == b"opacity"
                                    && let Ok(value) =
                                        attr.decode_and_unescape_value(reader.decoder())
                                    && let Some(shape) = shapes.last_mut()
                                {
                                    shape.opacity = parse_opacity(&value);
                                }
                            }
                        }
                    },
                    b"textpath" => {
                        if in_shape {
                            for attr in e.attributes().flatten() {
                                if attr.key.local_name().as_ref() == b"string"
                                    && let Ok(value) =
                                        attr.decode_and_unescape_value(reader.decoder())
                                    && let Some(shape) = shapes.last_mut()
                                {
                                    shape.text = Some(value.into_owned());
                                    shape.kind = ShapeKind::TextPath;
                                }
                            }
                        }
                    },
                    b"imagedata" => {
                        if in_shape {
                            for attr in e.attributes().flatten() {
                                match attr.key.local_name().as_ref() {
                                    b"id" => {
                                        if let Ok(value) =
                                            attr.decode_and_unescape_value(reader.decoder())
                                            && let Some(shape) = shapes.last_mut()
                                        {
                                            shape.image_r_id = Some(value.into_owned());
                                            shape.kind = ShapeKind::Picture;
                                        }
                                    },
                                    b"gain" => {
                                        if let Ok(value) =
                                            attr.decode_and_unescape_value(reader.decoder())
                                            && let Some(shape) = shapes.last_mut()
                                        {
                                            shape.opacity = parse_opacity(&value);
                                        }
                                    },
                                    _ => {},
                                }
                            }
                        }
                    },
                    _ => {},
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"shape" => {
                in_shape = false;
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(WatermarkError::Xml(e.to_string())),
            _ => {},
        }
    }

    Ok(shapes)
}

/// Count shapes tagged with a given name.
pub fn count_shapes_named(xml: &[u8], name: &str) -> Result<usize> {
    Ok(scan_shapes(xml)?
        .iter()
        .filter(|shape| shape.name.as_deref() == Some(name))
        .count())
}
