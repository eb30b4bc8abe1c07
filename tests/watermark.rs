//! End-to-end watermarking tests against in-memory packages.

use filigree::docx::{DocumentProtection, EditRestriction, scan_shapes};
use filigree::{
    Emu, Font, ImageWatermark, LockKind, LockOptions, Measure, PlacementOptions, PlacementTarget,
    TextWatermark, TileOptions, Watermark, Watermarker, WordDocument,
};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CONTENT_TYPES: &[u8] = br#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const PKG_RELS: &[u8] = br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

/// Build a package around the given document.xml body content.
fn build_docx(body: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(CONTENT_TYPES).unwrap();
    writer.start_file("_rels/.rels", options).unwrap();
    writer.write_all(PKG_RELS).unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer
        .write_all(
            format!(
                r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}</w:body></w:document>"#,
                body
            )
            .as_bytes(),
        )
        .unwrap();

    writer.finish().unwrap().into_inner()
}

/// A one-section Letter-sized document (12240 x 15840 twips = 612 x 792 pt).
fn letter_docx() -> Vec<u8> {
    build_docx(
        r#"<w:p><w:r><w:t>Resume</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>"#,
    )
}

/// A two-section document.
fn two_section_docx() -> Vec<u8> {
    build_docx(concat!(
        r#"<w:p><w:r><w:t>One</w:t></w:r></w:p>"#,
        r#"<w:p><w:pPr><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:pPr></w:p>"#,
        r#"<w:p><w:r><w:t>Two</w:t></w:r></w:p>"#,
        r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>"#,
    ))
}

/// A 100 x 50 pixel PNG.
fn logo_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    let img = image_fill(100, 50);
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn image_fill(w: u32, h: u32) -> image::DynamicImage {
    image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        w,
        h,
        image::Rgba([200, 30, 30, 255]),
    ))
}

/// Collect the shapes of every header part of a document.
fn all_header_shapes(doc: &WordDocument) -> Vec<filigree::docx::ShapeInfo> {
    let mut shapes = Vec::new();
    doc.for_each_header(|partname| {
        let blob = doc.package().part(partname).unwrap().blob();
        shapes.extend(scan_shapes(blob).unwrap());
    })
    .unwrap();
    shapes
}

/// Scenario A: a centered rotated text watermark lands in the header and
/// survives a save/reload round trip with its attributes intact.
#[test]
fn header_text_watermark_round_trips() {
    let mut marker = Watermarker::from_bytes(letter_docx()).unwrap();
    let watermark = TextWatermark::new("Confidential", Font::new("Arial", 19.0))
        .with_rotate_angle(25.0)
        .with_opacity(0.8);
    marker
        .add(&Watermark::Text(watermark), &PlacementOptions::default())
        .unwrap();

    let saved = marker.to_bytes().unwrap();
    let reloaded = WordDocument::from_bytes(saved).unwrap();

    let shapes: Vec<_> = all_header_shapes(&reloaded)
        .into_iter()
        .filter(|s| s.text.as_deref() == Some("Confidential"))
        .collect();
    assert_eq!(shapes.len(), 1);
    assert!((shapes[0].rotation - 25.0).abs() < 0.01);
    assert!((shapes[0].opacity - 0.8).abs() < 0.01);
}

/// Scenario B: tiling a 100x50 shape over a 612x792 page with 10% line
/// spacing and 8% watermark spacing produces floor(792/129.2) x
/// floor(612/148.96) = 6 x 4 tiles, within one tile of tolerance.
#[test]
fn tiled_image_watermark_tile_count() {
    let mut marker = Watermarker::from_bytes(letter_docx()).unwrap();
    let watermark = ImageWatermark::new(logo_png())
        .with_size(Emu::from_pt(100.0), Emu::from_pt(50.0))
        .with_opacity(0.7)
        .with_rotate_angle(-30.0)
        .with_tile_options(TileOptions::new(
            Measure::Percent(10.0),
            Measure::Percent(8.0),
        ));
    let options = PlacementOptions::default().with_name("TiledLogo");
    marker.add(&Watermark::Image(watermark), &options).unwrap();

    let doc = marker.document();
    let blob = doc.package().part(doc.main_partname()).unwrap().blob();
    let tiles = scan_shapes(blob)
        .unwrap()
        .into_iter()
        .filter(|s| s.name.as_deref() == Some("TiledLogo"))
        .count();
    assert!((23..=25).contains(&tiles), "got {} tiles", tiles);

    // The media part landed in the package exactly once.
    let media = filigree::opc::PackURI::new("/word/media/image1.png").unwrap();
    assert!(doc.package().contains_part(&media));
}

/// Scenario C: placement at an out-of-range section fails and leaves the
/// document without any shapes.
#[test]
fn out_of_range_section_leaves_document_unchanged() {
    let mut marker = Watermarker::from_bytes(two_section_docx()).unwrap();
    let watermark = TextWatermark::new("Nope", Font::new("Arial", 19.0));
    let options = PlacementOptions::new(PlacementTarget::Section(5));

    let err = marker
        .add(&Watermark::Text(watermark), &options)
        .unwrap_err();
    assert!(matches!(
        err,
        filigree::WatermarkError::SectionOutOfRange { index: 5, count: 2 }
    ));

    let doc = marker.document();
    assert!(all_header_shapes(doc).is_empty());
    let blob = doc.package().part(doc.main_partname()).unwrap().blob();
    assert_eq!(scan_shapes(blob).unwrap().len(), 0);
}

/// Scenario D: a read-only lock round-trips its enforcement flag and
/// restriction kind through save and reload.
#[test]
fn read_only_lock_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("locked.docx");

    let mut marker = Watermarker::from_bytes(letter_docx()).unwrap();
    let watermark = TextWatermark::new("Company Confidential", Font::new("Arial", 19.0))
        .with_rotate_angle(25.0)
        .with_opacity(0.8);
    let options = PlacementOptions::new(PlacementTarget::Section(0))
        .with_lock(LockOptions::new("012345", LockKind::ReadOnly));
    marker.add(&Watermark::Text(watermark), &options).unwrap();
    marker.save(&out_path).unwrap();

    let reloaded = WordDocument::open(&out_path).unwrap();
    let settings = filigree::opc::PackURI::new("/word/settings.xml").unwrap();
    let blob = reloaded.package().part(&settings).unwrap().blob();
    let protection = DocumentProtection::from_settings_xml(blob).unwrap();

    assert!(protection.is_enforced());
    assert_eq!(protection.restriction, Some(EditRestriction::ReadOnly));
    // The verifier is stored hashed, never in plaintext.
    assert!(protection.hash.is_some());
    assert_ne!(protection.hash.as_deref(), Some("012345"));

    // The reloaded model surfaces the lock on the section itself.
    let record = reloaded.section(0).unwrap().protection().copied().unwrap();
    assert!(record.enforced);
    assert_eq!(record.restriction, EditRestriction::ReadOnly);
}

/// Loading and saving without mutation reproduces every part
/// byte-for-byte.
#[test]
fn unmodified_round_trip_is_lossless() {
    let original = letter_docx();
    let doc = WordDocument::from_bytes(original.clone()).unwrap();
    let saved = doc.to_bytes().unwrap();

    let before = WordDocument::from_bytes(original).unwrap();
    let after = WordDocument::from_bytes(saved).unwrap();
    for part in before.package().iter_parts() {
        let other = after.package().part(part.partname()).unwrap();
        assert_eq!(part.blob(), other.blob(), "part {} differs", part.partname());
    }
}

/// Applying the same watermark twice doubles the shapes; the engine does
/// not deduplicate by name.
#[test]
fn repeated_placement_doubles_shapes() {
    let mut marker = Watermarker::from_bytes(letter_docx()).unwrap();
    let watermark = Watermark::Text(TextWatermark::new("Draft", Font::new("Arial", 19.0)));
    let options = PlacementOptions::default().with_name("DraftStamp");

    marker.add(&watermark, &options).unwrap();
    marker.add(&watermark, &options).unwrap();

    let saved = marker.to_bytes().unwrap();
    let reloaded = WordDocument::from_bytes(saved).unwrap();
    let stamps = all_header_shapes(&reloaded)
        .into_iter()
        .filter(|s| s.name.as_deref() == Some("DraftStamp"))
        .count();
    assert_eq!(stamps, 2);
}

/// Whole-document placement reaches every section's header exactly once.
#[test]
fn whole_document_placement_covers_all_sections() {
    let mut marker = Watermarker::from_bytes(two_section_docx()).unwrap();
    let watermark = Watermark::Text(TextWatermark::new("Internal", Font::new("Arial", 19.0)));
    let options = PlacementOptions::default().with_name("InternalStamp");
    marker.add(&watermark, &options).unwrap();

    let doc = marker.document();
    assert_eq!(doc.section_count(), 2);
    for index in 0..doc.section_count() {
        let headers = doc.header_partnames(index).unwrap();
        assert!(!headers.is_empty(), "section {} has no header", index);
        let blob = doc.package().part(&headers[0].1).unwrap().blob();
        let count = scan_shapes(blob)
            .unwrap()
            .into_iter()
            .filter(|s| s.name.as_deref() == Some("InternalStamp"))
            .count();
        assert_eq!(count, 1, "section {} header", index);
    }
}

/// Without a license, saved output carries a forced evaluation overlay;
/// the save itself still succeeds.
#[test]
fn evaluation_mode_adds_overlay_on_save() {
    let mut marker = Watermarker::from_bytes(letter_docx()).unwrap();
    let watermark = Watermark::Text(TextWatermark::new("Draft", Font::new("Arial", 19.0)));
    marker.add(&watermark, &PlacementOptions::default()).unwrap();

    let saved = marker.to_bytes().unwrap();
    let reloaded = WordDocument::from_bytes(saved).unwrap();
    let overlays = all_header_shapes(&reloaded)
        .into_iter()
        .filter(|s| s.name.as_deref() == Some("EvaluationWatermark"))
        .count();
    assert_eq!(overlays, 1);
}

/// An empty lock password is rejected for every lock kind, before any
/// mutation happens.
#[test]
fn empty_password_rejected_for_all_lock_kinds() {
    for lock_type in [
        LockKind::ReadOnly,
        LockKind::AllowOnlyFormFields,
        LockKind::AllowOnlyComments,
        LockKind::AllowOnlyRevisions,
    ] {
        let mut marker = Watermarker::from_bytes(letter_docx()).unwrap();
        let watermark = Watermark::Text(TextWatermark::new("x", Font::new("Arial", 19.0)));
        let options = PlacementOptions::default().with_lock(LockOptions::new("", lock_type));
        assert!(matches!(
            marker.add(&watermark, &options),
            Err(filigree::WatermarkError::EmptyPassword)
        ));
        assert!(all_header_shapes(marker.document()).is_empty());
    }
}

/// A failed save (destination directory missing) leaves no output behind.
#[test]
fn failed_save_produces_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-dir").join("out.docx");

    let mut marker = Watermarker::from_bytes(letter_docx()).unwrap();
    let watermark = Watermark::Text(TextWatermark::new("x", Font::new("Arial", 19.0)));
    marker.add(&watermark, &PlacementOptions::default()).unwrap();

    assert!(marker.save(&missing).is_err());
    assert!(!missing.exists());
}

/// An image watermark without a size override takes its intrinsic pixel
/// dimensions.
#[test]
fn image_watermark_uses_intrinsic_size() {
    let mut marker = Watermarker::from_bytes(letter_docx()).unwrap();
    let watermark = ImageWatermark::new(logo_png());
    let options = PlacementOptions::default().with_name("Logo");
    marker.add(&Watermark::Image(watermark), &options).unwrap();

    let shapes: Vec<_> = all_header_shapes(marker.document())
        .into_iter()
        .filter(|s| s.name.as_deref() == Some("Logo"))
        .collect();
    assert_eq!(shapes.len(), 1);
    // 100 px at 96 dpi = 75 pt, 50 px = 37.5 pt
    assert!((shapes[0].width_pt - 75.0).abs() < 0.01);
    assert!((shapes[0].height_pt - 37.5).abs() < 0.01);
}
