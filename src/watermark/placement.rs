//! The watermark placement engine.
//!
//! [`Watermarker`] is the top-level facade: open a document, add one or
//! more watermarks with placement options, optionally lock the targeted
//! sections, then save. All validation (target range, lock configuration,
//! font and image resolution) happens before any mutation, so a failed
//! `add` leaves the document exactly as it was.
//!
//! Placement is deliberately not idempotent: adding the same watermark
//! twice results in two sets of shapes. Callers track whether a document
//! was already watermarked, for example by counting shapes with a known
//! name via [`crate::docx::scan_shapes`].

use crate::common::unit::Emu;
use crate::docx::WordDocument;
use crate::docx::protection::{DocumentProtection, PasswordVerifier, ProtectionRecord};
use crate::error::{Result, WatermarkError};
use crate::license::License;
use crate::opc::{PackURI, relationship_type};
use crate::watermark::builder::{BuiltinFontMetrics, FontMetricsProvider, ShapeBuilder, media_kind};
use crate::watermark::geometry::{TileAnchors, resolve_anchor, resolve_spacing};
use crate::watermark::options::{LockKind, LockOptions, PlacementOptions, PlacementTarget};
use crate::watermark::shape::Shape;
use crate::watermark::spec::{Font, TextWatermark, Watermark};
use log::{debug, warn};
use std::io::{Read, Seek};
use std::path::Path;

/// Shape name used for the forced evaluation-mode overlay.
const EVALUATION_SHAPE_NAME: &str = "EvaluationWatermark";

/// The watermarking engine facade.
///
/// # Examples
///
/// ```rust,no_run
/// use filigree::{Font, PlacementOptions, TextWatermark, Watermark, Watermarker};
///
/// let mut marker = Watermarker::open("document.docx")?;
/// let watermark = TextWatermark::new("Confidential", Font::new("Arial", 19.0))
///     .with_rotate_angle(25.0)
///     .with_opacity(0.8);
/// marker.add(&Watermark::Text(watermark), &PlacementOptions::default())?;
/// marker.save("out/document.docx")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Watermarker {
    doc: WordDocument,
    metrics: Box<dyn FontMetricsProvider>,
    shape_seq: u32,
    added_any: bool,
    eval_injected: bool,
}

impl Watermarker {
    /// Open a document for watermarking.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_document(WordDocument::open(path)?))
    }

    /// Open a document from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Ok(Self::from_document(WordDocument::from_reader(reader)?))
    }

    /// Open a document from owned bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Ok(Self::from_document(WordDocument::from_bytes(data)?))
    }

    /// Wrap an already-open document.
    pub fn from_document(doc: WordDocument) -> Self {
        Self {
            doc,
            metrics: Box::new(BuiltinFontMetrics),
            shape_seq: 1,
            added_any: false,
            eval_injected: false,
        }
    }

    /// Substitute the font-metrics collaborator.
    pub fn with_metrics(mut self, metrics: Box<dyn FontMetricsProvider>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The wrapped document.
    #[inline]
    pub fn document(&self) -> &WordDocument {
        &self.doc
    }

    /// Add a watermark to the document.
    ///
    /// Untiled watermarks go into the headers of the targeted sections
    /// (header content repeats on every page of the section); tiled
    /// watermarks go into the section bodies, one shape copy per anchor.
    /// When `options.lock` requests it, the targeted sections are locked
    /// afterwards.
    pub fn add(&mut self, watermark: &Watermark, options: &PlacementOptions) -> Result<()> {
        // Everything that can fail is checked before the first mutation.
        if let Some(lock) = &options.lock
            && lock.is_locked
            && lock.password.is_empty()
        {
            return Err(WatermarkError::EmptyPassword);
        }

        let targets: Vec<usize> = match options.target {
            PlacementTarget::Section(index) => {
                self.doc.section(index)?;
                vec![index]
            },
            PlacementTarget::WholeDocument | PlacementTarget::AllPages => {
                (0..self.doc.section_count()).collect()
            },
        };

        let mut shape = ShapeBuilder::new(&*self.metrics).build(watermark)?;
        shape.name = options.name.clone();
        shape.alt_text = options.alternative_text.clone();

        // Image media is persisted once per add; each receiving part
        // relates to it under its own relationship ID.
        let media = match watermark {
            Watermark::Image(img) => {
                let (ext, content_type) = media_kind(img.bytes())?;
                Some(
                    self.doc
                        .add_image_part(ext, content_type, img.bytes().to_vec())?,
                )
            },
            Watermark::Text(_) => None,
        };

        if watermark.tile_options().is_some() {
            self.insert_tiled(watermark, &shape, &targets, media.as_ref())?;
        } else {
            self.insert_into_headers(watermark, &shape, &targets, media.as_ref())?;
        }

        if let Some(lock) = &options.lock
            && lock.is_locked
        {
            self.apply_lock(&targets, lock)?;
        }

        self.added_any = true;
        debug!("added watermark to {} section(s)", targets.len());
        Ok(())
    }

    /// Serialize the document to package bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.inject_evaluation_overlay()?;
        self.doc.to_bytes()
    }

    /// Save the document, atomically.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.inject_evaluation_overlay()?;
        self.doc.save(path)
    }

    /// Insert one shape copy into each targeted section's headers.
    ///
    /// A header part shared between sections (or between page-class
    /// variants) receives the shape exactly once, with the geometry of
    /// the first section that reaches it.
    fn insert_into_headers(
        &mut self,
        watermark: &Watermark,
        shape: &Shape,
        targets: &[usize],
        media: Option<&PackURI>,
    ) -> Result<()> {
        let mut visited: Vec<PackURI> = Vec::new();
        for &index in targets {
            let page = self.doc.section(index)?.page_size();
            let anchor = resolve_anchor(
                watermark.horizontal_alignment(),
                watermark.vertical_alignment(),
                page.width,
                page.height,
                shape.width,
                shape.height,
                Emu::ZERO,
            );

            for partname in self.doc.ensure_section_headers(index)? {
                if visited.contains(&partname) {
                    continue;
                }
                let image_r_id = match media {
                    Some(media) => Some(self.doc.relate_part(
                        &partname,
                        relationship_type::IMAGE,
                        media,
                    )?),
                    None => None,
                };
                let seq = self.reserve_seq(1);
                let xml = shape.to_paragraph(&[anchor], seq, image_r_id.as_deref());
                self.doc.append_to_header(&partname, &xml)?;
                visited.push(partname);
            }
        }
        Ok(())
    }

    /// Insert a tiled grid of shape copies into each targeted section's
    /// body.
    fn insert_tiled(
        &mut self,
        watermark: &Watermark,
        shape: &Shape,
        targets: &[usize],
        media: Option<&PackURI>,
    ) -> Result<()> {
        // Body pictures resolve through the main document part.
        let image_r_id = match media {
            Some(media) => {
                let main = self.doc.main_partname().clone();
                Some(
                    self.doc
                        .relate_part(&main, relationship_type::IMAGE, media)?,
                )
            },
            None => None,
        };

        let tile = watermark
            .tile_options()
            .expect("insert_tiled requires tile options");

        for &index in targets {
            let page = self.doc.section(index)?.page_size();
            let watermark_spacing = resolve_spacing(tile.watermark_spacing(), page.width);
            let line_spacing = resolve_spacing(tile.line_spacing(), page.height);

            let anchors: Vec<_> = TileAnchors::new(
                page.width,
                page.height,
                shape.width,
                shape.height,
                watermark_spacing,
                line_spacing,
                Emu::ZERO,
            )
            .collect();

            let seq = self.reserve_seq(anchors.len() as u32);
            let xml = shape.to_paragraph(&anchors, seq, image_r_id.as_deref());
            self.doc.insert_body_content(index, &xml)?;
            debug!("tiled {} copies into section {}", anchors.len(), index);
        }
        Ok(())
    }

    /// Lock the targeted sections.
    fn apply_lock(&mut self, targets: &[usize], lock: &LockOptions) -> Result<()> {
        let verifier = PasswordVerifier::derive(&lock.password)?;
        let restriction = lock.lock_type.restriction();
        let element = DocumentProtection::to_element(restriction, &verifier);
        self.doc.write_document_protection(&element)?;

        for &index in targets {
            self.doc.set_section_protection(
                index,
                ProtectionRecord {
                    enforced: true,
                    restriction,
                },
            );
            if lock.lock_type == LockKind::AllowOnlyFormFields
                && !self.doc.section(index)?.has_form_protection()
            {
                self.doc
                    .append_in_sect_pr(index, r#"<w:formProt w:val="true"/>"#)?;
            }
        }

        debug!(
            "locked {} section(s) with {:?}",
            targets.len(),
            lock.lock_type
        );
        Ok(())
    }

    /// In evaluation mode, force an overlay watermark into the first
    /// section's headers before output is produced. Degrades and reports;
    /// never fails the save for licensing reasons alone.
    fn inject_evaluation_overlay(&mut self) -> Result<()> {
        if License::is_licensed() || !self.added_any || self.eval_injected {
            return Ok(());
        }
        warn!("no license applied; output carries an evaluation watermark");

        let overlay = TextWatermark::new("Evaluation Only", Font::new("Arial", 28.0))
            .with_opacity(0.4)
            .with_rotate_angle(45.0);
        let watermark = Watermark::Text(overlay);
        let mut shape = ShapeBuilder::new(&*self.metrics).build(&watermark)?;
        shape.name = Some(EVALUATION_SHAPE_NAME.to_string());

        self.insert_into_headers(&watermark, &shape, &[0], None)?;
        self.eval_injected = true;
        Ok(())
    }

    /// Reserve a run of shape sequence numbers, returning the first.
    fn reserve_seq(&mut self, count: u32) -> u32 {
        let first = self.shape_seq;
        self.shape_seq += count.max(1);
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::scan_shapes;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn one_section_docx() -> Vec<u8> {
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
        writer.write_all(br#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body><w:p><w:r><w:t>Body</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#).unwrap();

        writer.finish().unwrap().into_inner()
    }

    fn text_watermark() -> Watermark {
        Watermark::Text(
            TextWatermark::new("Confidential", Font::new("Arial", 19.0))
                .with_rotate_angle(25.0)
                .with_opacity(0.8),
        )
    }

    fn header_shapes(marker: &Watermarker) -> Vec<crate::docx::ShapeInfo> {
        let partname = marker.doc.header_partnames(0).unwrap()[0].1.clone();
        let blob = marker.doc.package().part(&partname).unwrap().blob();
        scan_shapes(blob).unwrap()
    }

    #[test]
    fn test_add_header_watermark() {
        let mut marker = Watermarker::from_bytes(one_section_docx()).unwrap();
        marker
            .add(&text_watermark(), &PlacementOptions::default())
            .unwrap();

        let shapes = header_shapes(&marker);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].text.as_deref(), Some("Confidential"));
        assert!((shapes[0].rotation - 25.0).abs() < 1e-9);
        assert!((shapes[0].opacity - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_add_is_not_idempotent() {
        let mut marker = Watermarker::from_bytes(one_section_docx()).unwrap();
        let options = PlacementOptions::default().with_name("Stamp");
        marker.add(&text_watermark(), &options).unwrap();
        marker.add(&text_watermark(), &options).unwrap();

        let named = header_shapes(&marker)
            .iter()
            .filter(|s| s.name.as_deref() == Some("Stamp"))
            .count();
        assert_eq!(named, 2);
    }

    #[test]
    fn test_out_of_range_section_is_a_no_op() {
        let mut marker = Watermarker::from_bytes(one_section_docx()).unwrap();
        let before = marker.doc.to_bytes().unwrap();

        let options = PlacementOptions::new(PlacementTarget::Section(5));
        let err = marker.add(&text_watermark(), &options).unwrap_err();
        assert!(matches!(
            err,
            WatermarkError::SectionOutOfRange { index: 5, count: 1 }
        ));
        assert_eq!(marker.doc.to_bytes().unwrap(), before);
    }

    #[test]
    fn test_empty_password_rejected_before_mutation() {
        use crate::watermark::spec::{Measure, TileOptions};

        for lock_type in [
            LockKind::ReadOnly,
            LockKind::AllowOnlyFormFields,
            LockKind::AllowOnlyComments,
            LockKind::AllowOnlyRevisions,
        ] {
            let mut marker = Watermarker::from_bytes(one_section_docx()).unwrap();
            let before = marker.doc.to_bytes().unwrap();

            let options = PlacementOptions::default().with_lock(LockOptions::new("", lock_type));
            let err = marker.add(&text_watermark(), &options).unwrap_err();
            assert!(matches!(err, WatermarkError::EmptyPassword));
            assert_eq!(marker.doc.to_bytes().unwrap(), before);
        }

        // The check also precedes tiled placement.
        let mut marker = Watermarker::from_bytes(one_section_docx()).unwrap();
        let tiled = Watermark::Text(
            TextWatermark::new("x", Font::new("Arial", 19.0)).with_tile_options(TileOptions::new(
                Measure::Percent(10.0),
                Measure::Percent(10.0),
            )),
        );
        let options = PlacementOptions::default().with_lock(LockOptions::new("", LockKind::ReadOnly));
        assert!(matches!(
            marker.add(&tiled, &options),
            Err(WatermarkError::EmptyPassword)
        ));
    }

    #[test]
    fn test_lock_writes_protection_and_records_sections() {
        let mut marker = Watermarker::from_bytes(one_section_docx()).unwrap();
        let options = PlacementOptions::new(PlacementTarget::Section(0))
            .with_lock(LockOptions::new("012345", LockKind::ReadOnly));
        marker.add(&text_watermark(), &options).unwrap();

        let record = marker.doc.section(0).unwrap().protection().copied().unwrap();
        assert!(record.enforced);
        assert_eq!(
            record.restriction,
            crate::docx::EditRestriction::ReadOnly
        );

        let settings = crate::opc::PackURI::new("/word/settings.xml").unwrap();
        let blob = marker.doc.package().part(&settings).unwrap().blob();
        let protection = DocumentProtection::from_settings_xml(blob).unwrap();
        assert!(protection.is_enforced());
    }

    #[test]
    fn test_form_fields_lock_marks_sect_pr() {
        let mut marker = Watermarker::from_bytes(one_section_docx()).unwrap();
        let options = PlacementOptions::default()
            .with_lock(LockOptions::new("012345", LockKind::AllowOnlyFormFields));
        marker.add(&text_watermark(), &options).unwrap();
        assert!(marker.doc.section(0).unwrap().has_form_protection());

        // Locking again does not duplicate the marker element.
        marker.add(&text_watermark(), &options).unwrap();
        let blob = marker
            .doc
            .package()
            .part(marker.doc.main_partname())
            .unwrap()
            .blob();
        let text = String::from_utf8(blob.to_vec()).unwrap();
        assert_eq!(text.matches("<w:formProt").count(), 1);
    }

    #[test]
    fn test_tiled_text_goes_to_body() {
        use crate::watermark::spec::{Measure, TileOptions};

        let mut marker = Watermarker::from_bytes(one_section_docx()).unwrap();
        let tiled = Watermark::Text(
            TextWatermark::new("Protected Document", Font::new("Arial", 19.0)).with_tile_options(
                TileOptions::new(Measure::Percent(12.0), Measure::Percent(12.0)),
            ),
        );
        let options = PlacementOptions::default()
            .with_name("TiledShape")
            .with_alternative_text("Repeated watermark");
        marker.add(&tiled, &options).unwrap();

        let blob = marker
            .doc
            .package()
            .part(marker.doc.main_partname())
            .unwrap()
            .blob();
        let shapes = scan_shapes(blob).unwrap();
        assert!(shapes.len() > 1);
        assert!(shapes.iter().all(|s| s.name.as_deref() == Some("TiledShape")));
        assert!(
            shapes
                .iter()
                .all(|s| s.alt_text.as_deref() == Some("Repeated watermark"))
        );
    }

    #[test]
    fn test_unsupported_font_leaves_document_unchanged() {
        let mut marker = Watermarker::from_bytes(one_section_docx()).unwrap();
        let before = marker.doc.to_bytes().unwrap();

        let wm = Watermark::Text(TextWatermark::new("x", Font::new("NoSuchFamily", 19.0)));
        assert!(matches!(
            marker.add(&wm, &PlacementOptions::default()),
            Err(WatermarkError::UnsupportedFont(_))
        ));
        assert_eq!(marker.doc.to_bytes().unwrap(), before);
    }
}
