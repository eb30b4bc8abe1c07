//! Section - document section with page setup, header/footer references,
//! and an optional protection record.

use crate::common::unit::Emu;
use crate::docx::enums::{HdrFtrType, Orientation};
use crate::docx::protection::ProtectionRecord;
use crate::error::Result;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Page size for a section.
///
/// Both dimensions are in EMUs (English Metric Units).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize {
    /// Page width
    pub width: Emu,
    /// Page height
    pub height: Emu,
    /// Page orientation
    pub orientation: Orientation,
}

impl Default for PageSize {
    fn default() -> Self {
        // US Letter, the WordprocessingML default (12240 x 15840 twips).
        Self {
            width: Emu::from_twips(12_240),
            height: Emu::from_twips(15_840),
            orientation: Orientation::Portrait,
        }
    }
}

/// Page margins for a section, in EMUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    /// Top margin
    pub top: Option<Emu>,
    /// Right margin
    pub right: Option<Emu>,
    /// Bottom margin
    pub bottom: Option<Emu>,
    /// Left margin
    pub left: Option<Emu>,
    /// Header distance from top edge
    pub header: Option<Emu>,
    /// Footer distance from bottom edge
    pub footer: Option<Emu>,
}

/// A header or footer reference held by a section.
#[derive(Debug, Clone)]
pub struct HdrFtrRef {
    /// Which page class the part covers
    pub kind: HdrFtrType,
    /// Relationship ID resolving to the part
    pub r_id: String,
}

/// Byte offsets of a section's `<w:sectPr>` within `word/document.xml`.
///
/// Offsets are only valid against the revision of the part they were
/// scanned from; any mutation invalidates them and triggers a rescan.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SectPrSpan {
    /// Offset of the `<` of the sectPr open tag
    pub start: usize,
    /// Offset just past the `>` of the open tag (insertion point for
    /// header/footer references, which lead the sectPr content model)
    pub content: usize,
    /// Offset just past the closing tag
    pub end: usize,
    /// Whether the element is self-closing (`<w:sectPr/>`)
    pub empty: bool,
    /// Insertion point for body content belonging to this section
    pub body_insert: usize,
}

/// A section in a Word document.
///
/// Represents a `<w:sectPr>` element in the document XML. Each section can
/// have different page setup properties, its own header/footer parts per
/// page class, and a protection record.
#[derive(Debug, Clone)]
pub struct Section {
    page_size: PageSize,
    margins: Margins,
    header_refs: Vec<HdrFtrRef>,
    footer_refs: Vec<HdrFtrRef>,
    title_pg: bool,
    form_prot: bool,
    protection: Option<ProtectionRecord>,
    pub(crate) span: SectPrSpan,
}

impl Section {
    /// Parse a section from the XML bytes of its `<w:sectPr>` element.
    pub(crate) fn from_sect_pr(xml: &[u8], span: SectPrSpan) -> Result<Self> {
        let mut section = Self {
            page_size: PageSize::default(),
            margins: Margins::default(),
            header_refs: Vec::new(),
            footer_refs: Vec::new(),
            title_pg: false,
            form_prot: false,
            protection: None,
            span,
        };

        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"pgSz" => {
                        for attr in e.attributes().flatten() {
                            let Ok(value) = attr.decode_and_unescape_value(reader.decoder())
                            else {
                                continue;
                            };
                            match attr.key.local_name().as_ref() {
                                b"w" => {
                                    if let Ok(twips) = value.parse::<i64>() {
                                        section.page_size.width = Emu::from_twips(twips);
                                    }
                                },
                                b"h" => {
                                    if let Ok(twips) = value.parse::<i64>() {
                                        section.page_size.height = Emu::from_twips(twips);
                                    }
                                },
                                b"orient" => {
                                    section.page_size.orientation =
                                        Orientation::from_xml(&value).unwrap_or_default();
                                },
                                _ => {},
                            }
                        }
                    },
                    b"pgMar" => {
                        for attr in e.attributes().flatten() {
                            let Ok(value) = attr.decode_and_unescape_value(reader.decoder())
                            else {
                                continue;
                            };
                            let Ok(twips) = value.parse::<i64>() else {
                                continue;
                            };
                            let emu = Some(Emu::from_twips(twips));
                            match attr.key.local_name().as_ref() {
                                b"top" => section.margins.top = emu,
                                b"right" => section.margins.right = emu,
                                b"bottom" => section.margins.bottom = emu,
                                b"left" => section.margins.left = emu,
                                b"header" => section.margins.header = emu,
                                b"footer" => section.margins.footer = emu,
                                _ => {},
                            }
                        }
                    },
                    b"headerReference" | b"footerReference" => {
                        let is_header = e.local_name().as_ref() == b"headerReference";
                        let mut kind = HdrFtrType::Default;
                        let mut r_id = None;
                        for attr in e.attributes().flatten() {
                            let Ok(value) = attr.decode_and_unescape_value(reader.decoder())
                            else {
                                continue;
                            };
                            match attr.key.local_name().as_ref() {
                                b"type" => {
                                    kind = HdrFtrType::from_xml(&value).unwrap_or(HdrFtrType::Default);
                                },
                                b"id" => r_id = Some(value.into_owned()),
                                _ => {},
                            }
                        }
                        if let Some(r_id) = r_id {
                            let hf = HdrFtrRef { kind, r_id };
                            if is_header {
                                section.header_refs.push(hf);
                            } else {
                                section.footer_refs.push(hf);
                            }
                        }
                    },
                    b"titlePg" => section.title_pg = true,
                    b"formProt" => section.form_prot = true,
                    _ => {},
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(crate::error::WatermarkError::Xml(e.to_string())),
                _ => {},
            }
        }

        Ok(section)
    }

    /// Get the page size for this section.
    #[inline]
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Get the page width for this section.
    #[inline]
    pub fn page_width(&self) -> Emu {
        self.page_size.width
    }

    /// Get the page height for this section.
    #[inline]
    pub fn page_height(&self) -> Emu {
        self.page_size.height
    }

    /// Get the margins for this section.
    #[inline]
    pub fn margins(&self) -> Margins {
        self.margins
    }

    /// Header references, one per page class present.
    #[inline]
    pub fn header_refs(&self) -> &[HdrFtrRef] {
        &self.header_refs
    }

    /// Footer references, one per page class present.
    #[inline]
    pub fn footer_refs(&self) -> &[HdrFtrRef] {
        &self.footer_refs
    }

    /// Whether the section has a distinct first-page header/footer.
    #[inline]
    pub fn has_title_page(&self) -> bool {
        self.title_pg
    }

    /// Whether the section carries a `w:formProt` marker.
    #[inline]
    pub fn has_form_protection(&self) -> bool {
        self.form_prot
    }

    /// The section's protection record, if a lock has been applied.
    #[inline]
    pub fn protection(&self) -> Option<&ProtectionRecord> {
        self.protection.as_ref()
    }

    pub(crate) fn set_protection(&mut self, record: ProtectionRecord) {
        self.protection = Some(record);
    }
}
