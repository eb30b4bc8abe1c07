//! WordDocument - the in-memory model of a .docx package.
//!
//! The model keeps every part as raw bytes and scans `word/document.xml`
//! once per revision to locate the structural landmarks mutation needs:
//! section properties, their header/footer references, and the insertion
//! point for body content in each section. Edits splice XML at those byte
//! offsets and trigger a rescan, so offsets never go stale.

use crate::docx::protection::{DocumentProtection, ProtectionRecord};
use crate::docx::section::{Section, SectPrSpan};
use crate::error::{Result, WatermarkError};
use crate::opc::{OpcPackage, PackURI, content_type as ct, relationship_type};
use log::{debug, warn};
use memchr::memmem;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

/// XML skeleton for a newly created header part.
const EMPTY_HEADER_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:p/></w:hdr>"#,
);

/// XML skeleton for a newly created settings part.
const EMPTY_SETTINGS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"></w:settings>"#,
);

/// A Word document open for watermarking.
///
/// This is the main entry point of the document model. It wraps the OPC
/// package and exposes the section-level structure the placement engine
/// and protection manager operate on.
///
/// # Examples
///
/// ```rust,no_run
/// use filigree::WordDocument;
///
/// let doc = WordDocument::open("document.docx")?;
/// println!("document has {} sections", doc.section_count());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct WordDocument {
    /// The underlying OPC package
    opc: OpcPackage,
    /// Partname of the main document part
    main_partname: PackURI,
    /// Sections in document order
    sections: Vec<Section>,
    /// Protection records by section index, survives rescans
    protection: HashMap<usize, ProtectionRecord>,
}

impl WordDocument {
    /// Open a .docx document from a file path.
    ///
    /// Fails with a parse error when the file is missing, not a ZIP
    /// package, or not a Word document.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let opc = OpcPackage::open(path).map_err(|e| WatermarkError::Parse(e.to_string()))?;
        Self::from_package(opc)
    }

    /// Open a .docx document from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let opc =
            OpcPackage::from_reader(reader).map_err(|e| WatermarkError::Parse(e.to_string()))?;
        Self::from_package(opc)
    }

    /// Open a .docx document from owned bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let opc =
            OpcPackage::from_bytes(data).map_err(|e| WatermarkError::Parse(e.to_string()))?;
        Self::from_package(opc)
    }

    fn from_package(opc: OpcPackage) -> Result<Self> {
        let main_partname = opc
            .main_document_partname()
            .map_err(|e| WatermarkError::Parse(format!("main document part: {}", e)))?;

        // Verify it's a Word document by checking the main part's content type
        let main_part = opc
            .part(&main_partname)
            .map_err(|e| WatermarkError::Parse(e.to_string()))?;
        if main_part.content_type() != ct::WML_DOCUMENT_MAIN {
            return Err(WatermarkError::Parse(format!(
                "not a Word document: main part has content type {}",
                main_part.content_type()
            )));
        }

        let mut doc = Self {
            opc,
            main_partname,
            sections: Vec::new(),
            protection: HashMap::new(),
        };
        doc.rescan()?;

        if doc.sections.is_empty() {
            return Err(WatermarkError::Parse(
                "document body has no section properties".to_string(),
            ));
        }
        doc.load_protection()?;

        debug!("opened document with {} sections", doc.sections.len());
        Ok(doc)
    }

    /// Hydrate section protection records from an existing
    /// `w:documentProtection` element. Word enforces the restriction at
    /// document scope, so an enforced element marks every section.
    fn load_protection(&mut self) -> Result<()> {
        let Some(rels) = self.opc.rels_for(&self.main_partname) else {
            return Ok(());
        };
        let Ok(rel) = rels.part_with_reltype(relationship_type::SETTINGS) else {
            return Ok(());
        };
        let partname = rel.target_partname()?;
        let Ok(part) = self.opc.part(&partname) else {
            return Ok(());
        };
        let protection = DocumentProtection::from_settings_xml(part.blob())?;

        if protection.is_enforced()
            && let Some(restriction) = protection.restriction
        {
            let record = ProtectionRecord {
                enforced: true,
                restriction,
            };
            for index in 0..self.sections.len() {
                self.protection.insert(index, record);
                self.sections[index].set_protection(record);
            }
        }
        Ok(())
    }

    /// Get the number of sections in the document.
    #[inline]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Get the sections in document order.
    #[inline]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Get a section by index.
    ///
    /// Fails with `SectionOutOfRange` for an invalid index; the document
    /// is not modified.
    pub fn section(&self, index: usize) -> Result<&Section> {
        self.sections
            .get(index)
            .ok_or_else(|| WatermarkError::SectionOutOfRange {
                index,
                count: self.sections.len(),
            })
    }

    /// Visit every section in document order.
    pub fn for_each_section<F: FnMut(usize, &Section)>(&self, mut f: F) {
        for (i, section) in self.sections.iter().enumerate() {
            f(i, section);
        }
    }

    /// Visit every distinct header part in the document.
    pub fn for_each_header<F: FnMut(&PackURI)>(&self, mut f: F) -> Result<()> {
        let mut seen = Vec::new();
        for index in 0..self.sections.len() {
            for (_, partname) in self.header_partnames(index)? {
                if !seen.contains(&partname) {
                    f(&partname);
                    seen.push(partname);
                }
            }
        }
        Ok(())
    }

    /// Get the underlying OPC package.
    #[inline]
    pub fn package(&self) -> &OpcPackage {
        &self.opc
    }

    /// Get the partname of the main document part.
    #[inline]
    pub fn main_partname(&self) -> &PackURI {
        &self.main_partname
    }

    /// Add an image to the package media directory, returning its
    /// partname. The part still needs to be related from each part that
    /// references it.
    pub fn add_image_part(
        &mut self,
        ext: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<PackURI> {
        let partname = self
            .opc
            .next_partname(&format!("/word/media/image%d.{}", ext))?;
        self.opc.add_part(partname.clone(), content_type, bytes);
        Ok(partname)
    }

    /// Get or create a relationship from `source` to `target`, returning
    /// the relationship ID.
    pub fn relate_part(
        &mut self,
        source: &PackURI,
        reltype: &str,
        target: &PackURI,
    ) -> Result<String> {
        let target_ref = target.relative_ref(source.base_uri());
        Ok(self
            .opc
            .rels_for_mut(source)?
            .get_or_add(reltype, &target_ref)
            .r_id()
            .to_string())
    }

    /// Resolve the header parts referenced by a section.
    pub fn header_partnames(
        &self,
        section_index: usize,
    ) -> Result<Vec<(crate::docx::enums::HdrFtrType, PackURI)>> {
        let section = self.section(section_index)?;
        let rels = self.opc.rels_for(&self.main_partname);

        let mut parts = Vec::new();
        for hf_ref in section.header_refs() {
            let Some(rels) = rels else { break };
            match rels.get(&hf_ref.r_id) {
                Some(rel) => parts.push((hf_ref.kind, rel.target_partname()?)),
                None => warn!(
                    "section {} references unknown relationship {}",
                    section_index, hf_ref.r_id
                ),
            }
        }
        Ok(parts)
    }

    /// Get the header parts of a section, creating a default header when
    /// the section has none.
    ///
    /// Returns the distinct partnames: a section that differentiates
    /// first/even/default headers yields each variant part exactly once,
    /// so callers can apply identical content to every variant without
    /// double-writing shared parts.
    pub fn ensure_section_headers(&mut self, section_index: usize) -> Result<Vec<PackURI>> {
        let existing = self.header_partnames(section_index)?;
        if !existing.is_empty() {
            let mut unique = Vec::new();
            for (_, partname) in existing {
                if !unique.contains(&partname) {
                    unique.push(partname);
                }
            }
            return Ok(unique);
        }

        // No header yet: create a part, relate it, and reference it.
        let partname = self.opc.next_partname("/word/header%d.xml")?;
        self.opc.add_part(
            partname.clone(),
            ct::WML_HEADER,
            EMPTY_HEADER_XML.as_bytes().to_vec(),
        );

        let target_ref = partname.relative_ref(self.main_partname.base_uri());
        let r_id = self
            .opc
            .rels_for_mut(&self.main_partname)?
            .get_or_add(relationship_type::HEADER, &target_ref)
            .r_id()
            .to_string();

        let reference = format!(r#"<w:headerReference w:type="default" r:id="{}"/>"#, r_id);
        self.insert_in_sect_pr(section_index, &reference)?;

        debug!(
            "created header part {} for section {}",
            partname, section_index
        );
        Ok(vec![partname])
    }

    /// Append content before the closing tag of a header part.
    pub fn append_to_header(&mut self, partname: &PackURI, xml: &str) -> Result<()> {
        let blob = self.opc.part(partname)?.blob().to_vec();
        let close = memmem::rfind(&blob, b"</w:hdr>").ok_or_else(|| {
            WatermarkError::Xml(format!("header part {} has no closing tag", partname))
        })?;

        let mut out = Vec::with_capacity(blob.len() + xml.len());
        out.extend_from_slice(&blob[..close]);
        out.extend_from_slice(xml.as_bytes());
        out.extend_from_slice(&blob[close..]);
        self.opc.set_part_blob(partname, out)?;
        Ok(())
    }

    /// Insert body content at the end of a section's content.
    ///
    /// The content lands immediately before the section's properties (or
    /// before the paragraph carrying them), keeping it inside the section.
    pub fn insert_body_content(&mut self, section_index: usize, xml: &str) -> Result<()> {
        let offset = self.section(section_index)?.span.body_insert;
        self.splice_main_part(offset, xml)
    }

    /// Insert content at the head of a section's `<w:sectPr>` element.
    ///
    /// Header and footer references lead the sectPr content model, so this
    /// is the insertion point for them.
    pub fn insert_in_sect_pr(&mut self, section_index: usize, xml: &str) -> Result<()> {
        let span = self.section(section_index)?.span;
        if span.empty {
            self.expand_empty_sect_pr(span, xml, "")
        } else {
            self.splice_main_part(span.content, xml)
        }
    }

    /// Append content at the tail of a section's `<w:sectPr>` element.
    pub fn append_in_sect_pr(&mut self, section_index: usize, xml: &str) -> Result<()> {
        let span = self.section(section_index)?.span;
        if span.empty {
            self.expand_empty_sect_pr(span, "", xml)
        } else {
            // span.end points past "</w:sectPr>"
            let close = span.end - "</w:sectPr>".len();
            self.splice_main_part(close, xml)
        }
    }

    /// Record a protection lock on a section.
    ///
    /// The record survives rescans and is reflected by `Section::protection`.
    pub fn set_section_protection(&mut self, section_index: usize, record: ProtectionRecord) {
        self.protection.insert(section_index, record);
        if let Some(section) = self.sections.get_mut(section_index) {
            section.set_protection(record);
        }
    }

    /// Get the settings part, creating it (with its relationship and
    /// content-type entry) when the document has none.
    pub fn ensure_settings_part(&mut self) -> Result<PackURI> {
        if let Some(rels) = self.opc.rels_for(&self.main_partname)
            && let Ok(rel) = rels.part_with_reltype(relationship_type::SETTINGS)
        {
            return Ok(rel.target_partname()?);
        }

        let partname = PackURI::new("/word/settings.xml").map_err(WatermarkError::Parse)?;
        if !self.opc.contains_part(&partname) {
            self.opc.add_part(
                partname.clone(),
                ct::WML_SETTINGS,
                EMPTY_SETTINGS_XML.as_bytes().to_vec(),
            );
        }
        let target_ref = partname.relative_ref(self.main_partname.base_uri());
        self.opc
            .rels_for_mut(&self.main_partname)?
            .get_or_add(relationship_type::SETTINGS, &target_ref);

        debug!("created settings part {}", partname);
        Ok(partname)
    }

    /// Write a `w:documentProtection` element into the settings part,
    /// replacing any existing one.
    pub fn write_document_protection(&mut self, element: &str) -> Result<()> {
        let partname = self.ensure_settings_part()?;
        let blob = self.opc.part(&partname)?.blob().to_vec();

        let out = match memmem::find(&blob, b"<w:documentProtection") {
            Some(start) => {
                let end = element_end(&blob, start, b"</w:documentProtection>")?;
                let mut out = Vec::with_capacity(blob.len() + element.len());
                out.extend_from_slice(&blob[..start]);
                out.extend_from_slice(element.as_bytes());
                out.extend_from_slice(&blob[end..]);
                out
            },
            None => {
                // Insert directly after the settings open tag.
                let open = memmem::find(&blob, b"<w:settings").ok_or_else(|| {
                    WatermarkError::Xml("settings part has no w:settings element".to_string())
                })?;
                let gt = find_byte(&blob, b'>', open).ok_or_else(|| {
                    WatermarkError::Xml("unterminated w:settings open tag".to_string())
                })?;
                let mut out = Vec::with_capacity(blob.len() + element.len());
                out.extend_from_slice(&blob[..gt + 1]);
                out.extend_from_slice(element.as_bytes());
                out.extend_from_slice(&blob[gt + 1..]);
                out
            },
        };

        self.opc.set_part_blob(&partname, out)?;
        Ok(())
    }

    /// Serialize the document to package bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.opc.to_bytes()?)
    }

    /// Write the document to a file, atomically.
    ///
    /// The package is written to a temporary file and renamed into place;
    /// on failure no partial output is visible and any existing file at
    /// `path` is untouched.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Ok(self.opc.save(path)?)
    }

    /// Splice XML into the main document part and rescan.
    fn splice_main_part(&mut self, offset: usize, xml: &str) -> Result<()> {
        let blob = self.opc.part(&self.main_partname)?.blob();
        if offset > blob.len() {
            return Err(WatermarkError::Xml(
                "stale offset into document part".to_string(),
            ));
        }
        let mut out = Vec::with_capacity(blob.len() + xml.len());
        out.extend_from_slice(&blob[..offset]);
        out.extend_from_slice(xml.as_bytes());
        out.extend_from_slice(&blob[offset..]);
        self.opc.set_part_blob(&self.main_partname, out)?;
        self.rescan()
    }

    /// Rewrite an empty `<w:sectPr .../>` as an open/close pair holding
    /// `head` + `tail` as content.
    fn expand_empty_sect_pr(&mut self, span: SectPrSpan, head: &str, tail: &str) -> Result<()> {
        let blob = self.opc.part(&self.main_partname)?.blob();
        // span.end points past "/>"
        let slash = span.end - 2;
        let mut out = Vec::with_capacity(blob.len() + head.len() + tail.len() + 16);
        out.extend_from_slice(&blob[..slash]);
        out.extend_from_slice(b">");
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(tail.as_bytes());
        out.extend_from_slice(b"</w:sectPr>");
        out.extend_from_slice(&blob[span.end..]);
        self.opc.set_part_blob(&self.main_partname, out)?;
        self.rescan()
    }

    /// Rebuild the section table from the current main part bytes.
    fn rescan(&mut self) -> Result<()> {
        let blob = self.opc.part(&self.main_partname)?.blob().to_vec();

        // Self-closing paragraphs (`<w:p/>`) have no closing tag and must
        // not count as opens in the balance walk.
        let para_opens: Vec<usize> = element_starts(&blob, b"<w:p")
            .into_iter()
            .filter(|&pos| !is_self_closing(&blob, pos))
            .collect();
        let para_closes: Vec<usize> = memmem::find_iter(&blob, b"</w:p>").collect();

        let mut sections = Vec::new();
        for start in element_starts(&blob, b"<w:sectPr") {
            let open_gt = find_byte(&blob, b'>', start).ok_or_else(|| {
                WatermarkError::Xml("unterminated w:sectPr open tag".to_string())
            })?;
            let empty = blob[open_gt - 1] == b'/';
            let (content, end) = if empty {
                (open_gt + 1, open_gt + 1)
            } else {
                let close = memmem::find(&blob[open_gt..], b"</w:sectPr>").ok_or_else(|| {
                    WatermarkError::Xml("w:sectPr element not closed".to_string())
                })? + open_gt;
                (open_gt + 1, close + "</w:sectPr>".len())
            };

            let body_insert =
                enclosing_paragraph_start(&para_opens, &para_closes, start).unwrap_or(start);

            let span = SectPrSpan {
                start,
                content,
                end,
                empty,
                body_insert,
            };
            sections.push(Section::from_sect_pr(&blob[start..end], span)?);
        }

        // Carry protection records across the rescan.
        for (index, record) in &self.protection {
            if let Some(section) = sections.get_mut(*index) {
                section.set_protection(*record);
            }
        }

        self.sections = sections;
        Ok(())
    }
}

/// Find the start offsets of elements with the given tag prefix, filtering
/// out longer names sharing the prefix (`<w:p` must not match `<w:pPr`).
fn element_starts(haystack: &[u8], open: &[u8]) -> Vec<usize> {
    memmem::find_iter(haystack, open)
        .filter(|&pos| {
            matches!(
                haystack.get(pos + open.len()),
                Some(b' ') | Some(b'>') | Some(b'/')
            )
        })
        .collect()
}

/// Find a byte at or after `from`.
fn find_byte(haystack: &[u8], needle: u8, from: usize) -> Option<usize> {
    memchr::memchr(needle, &haystack[from..]).map(|pos| pos + from)
}

/// Whether the element opening at `start` is self-closing (`.../>`).
fn is_self_closing(haystack: &[u8], start: usize) -> bool {
    match find_byte(haystack, b'>', start) {
        Some(gt) => haystack[gt - 1] == b'/',
        None => false,
    }
}

/// Find the end offset (exclusive) of the element opening at `start`:
/// either past the `/>` of an empty element or past the given closing tag.
fn element_end(haystack: &[u8], start: usize, close_tag: &[u8]) -> Result<usize> {
    let gt = find_byte(haystack, b'>', start)
        .ok_or_else(|| WatermarkError::Xml("unterminated element".to_string()))?;
    if haystack[gt - 1] == b'/' {
        return Ok(gt + 1);
    }
    let close = memmem::find(&haystack[gt..], close_tag)
        .ok_or_else(|| WatermarkError::Xml("element not closed".to_string()))?;
    Ok(gt + close + close_tag.len())
}

/// Walk backwards from `pos` balancing paragraph opens/closes to find the
/// start of the paragraph enclosing `pos`, if any.
///
/// Paragraphs nested in text boxes are balanced pairs and cancel out, so
/// only a genuinely enclosing `<w:p>` survives with zero depth.
fn enclosing_paragraph_start(opens: &[usize], closes: &[usize], pos: usize) -> Option<usize> {
    let mut open_iter = opens.iter().rev().filter(|&&o| o < pos).peekable();
    let mut close_iter = closes.iter().rev().filter(|&&c| c < pos).peekable();
    let mut depth = 0usize;

    loop {
        match (open_iter.peek(), close_iter.peek()) {
            (Some(&&o), Some(&&c)) if c > o => {
                close_iter.next();
                depth += 1;
            },
            (Some(&&o), _) => {
                open_iter.next();
                if depth == 0 {
                    return Some(o);
                }
                depth -= 1;
            },
            (None, Some(_)) => {
                close_iter.next();
                depth += 1;
            },
            (None, None) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::enums::HdrFtrType;

    fn doc_xml(body: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}</w:body></w:document>"#,
            body
        )
        .into_bytes()
    }

    fn build_package(document_xml: &[u8]) -> OpcPackage {
        use std::io::{Cursor, Write};
        use zip::ZipWriter;
        use zip::write::SimpleFileOptions;

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(br#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#).unwrap();

        writer.start_file("_rels/.rels", options).unwrap();
        writer.write_all(br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#).unwrap();

        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(document_xml).unwrap();

        let bytes = writer.finish().unwrap().into_inner();
        OpcPackage::from_bytes(bytes).unwrap()
    }

    fn open_doc(body: &str) -> WordDocument {
        WordDocument::from_package(build_package(&doc_xml(body))).unwrap()
    }

    #[test]
    fn test_scan_single_section() {
        let doc = open_doc(
            r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>"#,
        );
        assert_eq!(doc.section_count(), 1);
        assert_eq!(doc.sections()[0].page_width().to_twips(), 12240);
    }

    #[test]
    fn test_scan_two_sections() {
        let doc = open_doc(concat!(
            r#"<w:p><w:r><w:t>One</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:pPr></w:p>"#,
            r#"<w:p><w:r><w:t>Two</w:t></w:r></w:p>"#,
            r#"<w:sectPr><w:pgSz w:w="15840" w:h="12240" w:orient="landscape"/></w:sectPr>"#,
        ));
        assert_eq!(doc.section_count(), 2);
        assert_eq!(doc.sections()[1].page_width().to_twips(), 15840);
    }

    #[test]
    fn test_section_out_of_range() {
        let doc = open_doc(r#"<w:p/><w:sectPr/>"#);
        assert!(matches!(
            doc.section(5),
            Err(WatermarkError::SectionOutOfRange { index: 5, count: 1 })
        ));
    }

    #[test]
    fn test_body_insert_for_mid_document_section() {
        let doc = open_doc(concat!(
            r#"<w:p><w:r><w:t>One</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:sectPr/></w:pPr></w:p>"#,
            r#"<w:sectPr/>"#,
        ));
        // The first section's insertion point is the start of the paragraph
        // carrying its sectPr, so inserted content stays inside the section.
        let span = doc.sections()[0].span;
        let blob = doc.opc.part(&doc.main_partname).unwrap().blob();
        assert!(blob[span.body_insert..].starts_with(b"<w:p><w:pPr><w:sectPr/>"));

        // The last section's sectPr is a body-level child.
        let span = doc.sections()[1].span;
        assert!(blob[span.body_insert..].starts_with(b"<w:sectPr/>"));
    }

    #[test]
    fn test_ensure_section_headers_creates_part_and_reference() {
        let mut doc = open_doc(r#"<w:p/><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>"#);
        let headers = doc.ensure_section_headers(0).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].as_str(), "/word/header1.xml");

        // The reference is scanned back out of the mutated sectPr.
        let refs = doc.sections()[0].header_refs();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, HdrFtrType::Default);

        // Resolving the reference gives the created part back.
        let resolved = doc.header_partnames(0).unwrap();
        assert_eq!(resolved[0].1.as_str(), "/word/header1.xml");

        // A second call reuses the existing header.
        let again = doc.ensure_section_headers(0).unwrap();
        assert_eq!(again, headers);
    }

    #[test]
    fn test_ensure_section_headers_expands_empty_sect_pr() {
        let mut doc = open_doc(r#"<w:p/><w:sectPr/>"#);
        doc.ensure_section_headers(0).unwrap();
        let blob = doc.opc.part(&doc.main_partname).unwrap().blob().to_vec();
        let text = String::from_utf8(blob).unwrap();
        assert!(text.contains("<w:sectPr><w:headerReference"));
        assert!(text.contains("</w:sectPr>"));
    }

    #[test]
    fn test_append_to_header() {
        let mut doc = open_doc(r#"<w:p/><w:sectPr/>"#);
        let headers = doc.ensure_section_headers(0).unwrap();
        doc.append_to_header(&headers[0], "<w:p><w:r><w:t>wm</w:t></w:r></w:p>")
            .unwrap();
        let blob = doc.opc.part(&headers[0]).unwrap().blob().to_vec();
        let text = String::from_utf8(blob).unwrap();
        assert!(text.contains("<w:t>wm</w:t></w:r></w:p></w:hdr>"));
    }

    #[test]
    fn test_write_document_protection_creates_settings() {
        let mut doc = open_doc(r#"<w:p/><w:sectPr/>"#);
        doc.write_document_protection(r#"<w:documentProtection w:edit="readOnly" w:enforcement="1"/>"#)
            .unwrap();

        let partname = PackURI::new("/word/settings.xml").unwrap();
        let blob = doc.opc.part(&partname).unwrap().blob().to_vec();
        let text = String::from_utf8(blob).unwrap();
        assert!(text.contains(r#"<w:settings"#));
        assert!(text.contains(r#"w:edit="readOnly""#));

        // Replacement, not accumulation
        doc.write_document_protection(r#"<w:documentProtection w:edit="forms" w:enforcement="1"/>"#)
            .unwrap();
        let blob = doc.opc.part(&partname).unwrap().blob().to_vec();
        let text = String::from_utf8(blob).unwrap();
        assert_eq!(text.matches("<w:documentProtection").count(), 1);
        assert!(text.contains(r#"w:edit="forms""#));
    }

    #[test]
    fn test_enclosing_paragraph_skips_balanced_nesting() {
        // `pos` sits after a balanced nested paragraph pair; the enclosing
        // paragraph is the outer open at 0.
        let opens = vec![0, 10];
        let closes = vec![20];
        assert_eq!(enclosing_paragraph_start(&opens, &closes, 30), Some(0));

        // Fully balanced content before `pos` means no enclosing paragraph.
        let opens = vec![0];
        let closes = vec![5];
        assert_eq!(enclosing_paragraph_start(&opens, &closes, 30), None);
    }
}
