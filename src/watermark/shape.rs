//! Shape templates and VML emission.
//!
//! A [`Shape`] is the reusable template the builder produces from a
//! watermark spec: content, size, rotation, opacity, metadata. The
//! placement engine instantiates it once per anchor, emitting a
//! `<w:pict>` run element containing a VML shape. Text watermarks use the
//! WordArt text-path shape type (136), pictures the picture-frame shape
//! type (75).

use crate::common::color::Color;
use crate::common::unit::Emu;
use crate::opc::rel::escape_xml;

/// Base shape-id offset Word uses for shapes in stories.
const SPID_BASE: u32 = 2048;

/// What a shape renders.
#[derive(Debug, Clone)]
pub enum ShapeContent {
    /// WordArt-style text path
    Text {
        text: String,
        font_family: String,
        font_size_pt: f64,
        bold: bool,
        italic: bool,
        color: Color,
    },
    /// A picture; the image part is related per target part at placement
    /// time, so the relationship ID is supplied on emission.
    Picture,
}

/// A positioned drawing object template.
///
/// Geometry is a size plus rotation and opacity; the anchor is supplied
/// per instantiation by the geometry resolver.
#[derive(Debug, Clone)]
pub struct Shape {
    /// What the shape renders
    pub content: ShapeContent,
    /// Shape width
    pub width: Emu,
    /// Shape height
    pub height: Emu,
    /// Rotation in degrees, counter-clockwise positive
    pub rotation: f64,
    /// Fill opacity in [0, 1]
    pub opacity: f64,
    /// Shape name shared by every emitted copy
    pub name: Option<String>,
    /// Alternative text
    pub alt_text: Option<String>,
    /// Whether the shape renders behind body text
    pub behind_text: bool,
}

impl Shape {
    /// Emit a `<w:pict>` element placing one copy of this shape at the
    /// given anchor.
    ///
    /// `shape_seq` individualizes the VML shape id per copy;
    /// `image_r_id` must be the relationship ID of the image part, as
    /// related from the part receiving this markup (pictures only).
    pub fn to_pict(&self, anchor: (Emu, Emu), shape_seq: u32, image_r_id: Option<&str>) -> String {
        let style = self.style_attr(anchor);
        let id_attr = match &self.name {
            Some(name) => escape_xml(name),
            None => format!("Watermark{}", shape_seq),
        };
        let alt_attr = match &self.alt_text {
            Some(alt) => format!(r#" alt="{}""#, escape_xml(alt)),
            None => String::new(),
        };
        let spid = SPID_BASE + shape_seq;

        match &self.content {
            ShapeContent::Text {
                text,
                font_family,
                font_size_pt,
                bold,
                italic,
                color,
            } => {
                let mut textpath_style = format!(
                    "font-family:&quot;{}&quot;;font-size:{}pt",
                    escape_xml(font_family),
                    fmt_f64(*font_size_pt)
                );
                if *bold {
                    textpath_style.push_str(";font-weight:bold");
                }
                if *italic {
                    textpath_style.push_str(";font-style:italic");
                }

                format!(
                    concat!(
                        r#"<w:pict>"#,
                        r#"<v:shapetype xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office" id="_x0000_t136" coordsize="21600,21600" o:spt="136" adj="10800" path="m@7,l@8,m@5,21600l@6,21600e">"#,
                        r#"<v:path textpathok="t"/>"#,
                        r#"<v:textpath on="t" fitshape="t"/>"#,
                        r#"</v:shapetype>"#,
                        r##"<v:shape xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office" id="{id}" o:spid="_x0000_s{spid}"{alt} type="#_x0000_t136" style="{style}" o:allowincell="f" fillcolor="{fill}" stroked="f">"##,
                        r#"<v:fill opacity="{opacity}"/>"#,
                        r#"<v:textpath style="{tp_style}" string="{text}"/>"#,
                        r#"</v:shape>"#,
                        r#"</w:pict>"#,
                    ),
                    id = id_attr,
                    spid = spid,
                    alt = alt_attr,
                    style = style,
                    fill = color.to_hex(),
                    opacity = fmt_f64(self.opacity),
                    tp_style = textpath_style,
                    text = escape_xml(text),
                )
            },
            ShapeContent::Picture => {
                let r_id = image_r_id.unwrap_or_default();
                // Image washout is carried in the imagedata gain, in
                // 1/65536 "f" units.
                let gain = (self.opacity * 65536.0).round() as u32;

                format!(
                    concat!(
                        r#"<w:pict>"#,
                        r#"<v:shapetype xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office" id="_x0000_t75" coordsize="21600,21600" o:spt="75" o:preferrelative="t" path="m@4@5l@4@11@9@11@9@5xe" filled="f" stroked="f">"#,
                        r#"<v:path o:extrusionok="f" gradientshapeok="t" o:connecttype="rect"/>"#,
                        r#"</v:shapetype>"#,
                        r##"<v:shape xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" id="{id}" o:spid="_x0000_s{spid}"{alt} type="#_x0000_t75" style="{style}" o:allowincell="f" stroked="f">"##,
                        r#"<v:imagedata r:id="{r_id}" o:title="" gain="{gain}f"/>"#,
                        r#"</v:shape>"#,
                        r#"</w:pict>"#,
                    ),
                    id = id_attr,
                    spid = spid,
                    alt = alt_attr,
                    style = style,
                    r_id = escape_xml(r_id),
                    gain = gain,
                )
            },
        }
    }

    /// Emit a paragraph wrapping one run with one pict per anchor.
    ///
    /// `first_seq` is the shape-id sequence number of the first copy.
    pub fn to_paragraph(
        &self,
        anchors: &[(Emu, Emu)],
        first_seq: u32,
        image_r_id: Option<&str>,
    ) -> String {
        let mut xml = String::with_capacity(512 * anchors.len().max(1));
        xml.push_str("<w:p><w:r>");
        for (i, anchor) in anchors.iter().enumerate() {
            xml.push_str(&self.to_pict(*anchor, first_seq + i as u32, image_r_id));
        }
        xml.push_str("</w:r></w:p>");
        xml
    }

    /// Build the VML style attribute for a copy at `anchor`.
    fn style_attr(&self, anchor: (Emu, Emu)) -> String {
        let mut style = format!(
            "position:absolute;margin-left:{}pt;margin-top:{}pt;width:{}pt;height:{}pt",
            fmt_f64(anchor.0.to_pt()),
            fmt_f64(anchor.1.to_pt()),
            fmt_f64(self.width.to_pt()),
            fmt_f64(self.height.to_pt()),
        );
        if self.rotation != 0.0 {
            // VML rotation is clockwise positive; the engine stores
            // counter-clockwise positive.
            style.push_str(&format!(";rotation:{}", fmt_f64(-self.rotation)));
        }
        let z_index: i64 = if self.behind_text {
            -251_654_144
        } else {
            251_654_144
        };
        style.push_str(&format!(
            ";z-index:{};mso-position-horizontal-relative:page;mso-position-vertical-relative:page;mso-wrap-style:none",
            z_index
        ));
        style
    }
}

/// Format a float with at most two decimals, trimming trailing zeros.
fn fmt_f64(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}
