//! Objects that implement reading and writing OPC packages.
//!
//! `OpcPackage` holds every part of a package in memory together with its
//! relationships and content-type map. Parts keep their original raw bytes
//! until explicitly replaced, so a load-then-save cycle reproduces untouched
//! parts byte-for-byte. Saving is atomic: the package is serialized to a
//! temporary file in the destination directory and renamed into place, so a
//! failure mid-write never leaves a partial output visible.

use crate::opc::content_types::ContentTypes;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::opc::rel::Relationships;
use crate::opc::relationship_type;
use log::{debug, warn};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A single part in an OPC package.
#[derive(Debug, Clone)]
pub struct Part {
    /// The part name (e.g., "/word/document.xml")
    partname: PackURI,

    /// The part's content type
    content_type: String,

    /// The part's binary content
    blob: Vec<u8>,
}

impl Part {
    /// Get the part name.
    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    /// Get the content type.
    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Get the binary content.
    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }
}

/// A `.rels` file together with its parse state.
///
/// The raw bytes are kept so an unmodified relationships part round-trips
/// unchanged; mutation switches the entry to regenerated output.
#[derive(Debug, Clone)]
struct RelsEntry {
    raw: Option<Vec<u8>>,
    rels: Relationships,
    dirty: bool,
}

/// Main API class for working with OPC packages.
///
/// Represents an Open Packaging Convention package in memory, providing
/// access to parts, relationships, and package-level operations.
pub struct OpcPackage {
    /// All regular parts, indexed by partname
    parts: HashMap<String, Part>,

    /// Relationships keyed by source partname ("/" for the package itself)
    rels: HashMap<String, RelsEntry>,

    /// Parsed content-type map
    content_types: ContentTypes,

    /// Original [Content_Types].xml bytes, kept for round-trip fidelity
    content_types_raw: Option<Vec<u8>>,

    /// Whether the content-type map needs regeneration on save
    content_types_dirty: bool,

    /// Partnames a caller replaced, for diagnostics
    touched: Vec<String>,

    /// ZIP member order from the source archive, new members appended
    member_order: Vec<String>,
}

impl OpcPackage {
    /// Open an OPC package from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Load an OPC package from a reader.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Load an OPC package from owned bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        let mut raw_members: Vec<(String, Vec<u8>)> = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)?;
            raw_members.push((name, blob));
        }

        // The content-type map is needed first to type every other member.
        let content_types_raw = raw_members
            .iter()
            .find(|(name, _)| format!("/{}", name) == CONTENT_TYPES_URI)
            .map(|(_, blob)| blob.clone())
            .ok_or_else(|| {
                OpcError::InvalidPackage("package has no [Content_Types].xml".to_string())
            })?;
        let content_types = ContentTypes::from_xml(&content_types_raw)?;

        let mut package = Self {
            parts: HashMap::new(),
            rels: HashMap::new(),
            content_types,
            content_types_raw: Some(content_types_raw),
            content_types_dirty: false,
            touched: Vec::new(),
            member_order: Vec::new(),
        };

        for (name, blob) in raw_members {
            let partname = PackURI::new(format!("/{}", name)).map_err(OpcError::InvalidPackUri)?;
            package.member_order.push(partname.as_str().to_string());

            if partname.as_str() == CONTENT_TYPES_URI {
                continue;
            }

            if let Some(source) = rels_source(&partname) {
                let rels = Relationships::from_xml(source_base_uri(&source), &blob)?;
                package.rels.insert(
                    source,
                    RelsEntry {
                        raw: Some(blob),
                        rels,
                        dirty: false,
                    },
                );
                continue;
            }

            let content_type = match package.content_types.content_type_for(&partname) {
                Some(ct) => ct.to_string(),
                None => {
                    warn!("no content type declared for part {}", partname);
                    "application/octet-stream".to_string()
                },
            };
            package.parts.insert(
                partname.as_str().to_string(),
                Part {
                    partname,
                    content_type,
                    blob,
                },
            );
        }

        debug!(
            "loaded package with {} parts, {} relationship sources",
            package.parts.len(),
            package.rels.len()
        );
        Ok(package)
    }

    /// Get a part by its partname.
    pub fn part(&self, partname: &PackURI) -> Result<&Part> {
        self.parts
            .get(partname.as_str())
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Check if a part exists in the package.
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.parts.contains_key(partname.as_str())
    }

    /// Replace the binary content of an existing part.
    pub fn set_part_blob(&mut self, partname: &PackURI, blob: Vec<u8>) -> Result<()> {
        let part = self
            .parts
            .get_mut(partname.as_str())
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))?;
        part.blob = blob;
        self.touched.push(partname.as_str().to_string());
        Ok(())
    }

    /// Add a new part to the package, registering its content type.
    pub fn add_part(&mut self, partname: PackURI, content_type: &str, blob: Vec<u8>) {
        self.content_types.add_override(&partname, content_type);
        self.content_types_dirty = true;
        self.member_order.push(partname.as_str().to_string());
        self.parts.insert(
            partname.as_str().to_string(),
            Part {
                partname,
                content_type: content_type.to_string(),
                blob,
            },
        );
    }

    /// Find the next available partname for a part template.
    ///
    /// Useful for creating new parts with sequential numbering
    /// (e.g., header1.xml, header2.xml).
    ///
    /// # Arguments
    /// * `template` - A format string with a %d placeholder for the number
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        let mut n = 1u32;
        loop {
            let candidate = template.replace("%d", &n.to_string());
            if !self.parts.contains_key(&candidate) {
                return PackURI::new(candidate).map_err(OpcError::InvalidPackUri);
            }
            n += 1;
            if n > 10000 {
                // Safety limit to prevent infinite loops
                return Err(OpcError::InvalidPackUri(
                    "Too many parts, cannot find next partname".to_string(),
                ));
            }
        }
    }

    /// Get the package-level relationships.
    pub fn pkg_rels(&self) -> Option<&Relationships> {
        self.rels.get(PACKAGE_URI).map(|entry| &entry.rels)
    }

    /// Get the relationships owned by a part.
    pub fn rels_for(&self, partname: &PackURI) -> Option<&Relationships> {
        self.rels.get(partname.as_str()).map(|entry| &entry.rels)
    }

    /// Get mutable relationships owned by a part, creating the `.rels`
    /// entry if the part has none yet.
    ///
    /// The entry is marked dirty and will be regenerated on save.
    pub fn rels_for_mut(&mut self, partname: &PackURI) -> Result<&mut Relationships> {
        let key = partname.as_str().to_string();
        if !self.rels.contains_key(&key) {
            let rels_uri = partname.rels_uri().map_err(OpcError::InvalidPackUri)?;
            self.member_order.push(rels_uri.as_str().to_string());
            self.rels.insert(
                key.clone(),
                RelsEntry {
                    raw: None,
                    rels: Relationships::new(partname.base_uri()),
                    dirty: true,
                },
            );
        }
        let entry = self.rels.get_mut(&key).unwrap();
        entry.dirty = true;
        Ok(&mut entry.rels)
    }

    /// Get the partname of the main document part.
    pub fn main_document_partname(&self) -> Result<PackURI> {
        let rels = self.pkg_rels().ok_or_else(|| {
            OpcError::InvalidPackage("package has no package-level relationships".to_string())
        })?;
        let rel = rels.part_with_reltype(relationship_type::OFFICE_DOCUMENT)?;
        rel.target_partname()
    }

    /// Get the main document part.
    pub fn main_document_part(&self) -> Result<&Part> {
        let partname = self.main_document_partname()?;
        self.part(&partname)
    }

    /// Get an iterator over all parts in the package.
    pub fn iter_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    /// Get the number of parts in the package.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Serialize the package to ZIP bytes.
    ///
    /// Members are written in the source archive's order (new members
    /// appended), untouched members from their original bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for member in &self.member_order {
            let partname = PackURI::new(member.clone()).map_err(OpcError::InvalidPackUri)?;

            if member == CONTENT_TYPES_URI {
                writer.start_file(partname.membername(), options)?;
                match (&self.content_types_raw, self.content_types_dirty) {
                    (Some(raw), false) => writer.write_all(raw)?,
                    _ => writer.write_all(self.content_types.to_xml().as_bytes())?,
                }
                continue;
            }

            if let Some(source) = rels_source(&partname) {
                if let Some(entry) = self.rels.get(&source) {
                    writer.start_file(partname.membername(), options)?;
                    match (&entry.raw, entry.dirty) {
                        (Some(raw), false) => writer.write_all(raw)?,
                        _ => writer.write_all(entry.rels.to_xml().as_bytes())?,
                    }
                }
                continue;
            }

            if let Some(part) = self.parts.get(member) {
                writer.start_file(partname.membername(), options)?;
                writer.write_all(&part.blob)?;
            }
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    /// Write the package to a file, atomically.
    ///
    /// The package is serialized into a temporary file in the destination
    /// directory and renamed over the target path, so a crash or error
    /// mid-write leaves any existing file at `path` untouched.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(path).map_err(|e| OpcError::IoError(e.error))?;

        debug!(
            "saved package to {} ({} touched parts)",
            path.display(),
            self.touched.len()
        );
        Ok(())
    }
}

/// Map a `.rels` partname to its source partname, or None for regular parts.
///
/// "/_rels/.rels" -> "/", "/word/_rels/document.xml.rels" -> "/word/document.xml".
fn rels_source(partname: &PackURI) -> Option<String> {
    let uri = partname.as_str();
    let (dir, filename) = uri.rsplit_once('/')?;
    let source_name = filename.strip_suffix(".rels")?;
    let source_dir = dir.strip_suffix("/_rels")?;

    if source_name.is_empty() {
        Some(PACKAGE_URI.to_string())
    } else {
        Some(format!("{}/{}", source_dir, source_name))
    }
}

/// Base URI to resolve a source's relationship targets against.
fn source_base_uri(source: &str) -> String {
    if source == PACKAGE_URI {
        PACKAGE_URI.to_string()
    } else {
        match source.rfind('/') {
            Some(0) | None => PACKAGE_URI.to_string(),
            Some(pos) => source[..pos].to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::content_type as ct;

    pub(crate) fn create_minimal_docx() -> Vec<u8> {
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
        writer.write_all(br#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
    <w:body><w:p><w:r><w:t>Test</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body>
</w:document>"#).unwrap();

        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_open_package() {
        let pkg = OpcPackage::from_bytes(create_minimal_docx()).unwrap();
        assert_eq!(pkg.part_count(), 1);
    }

    #[test]
    fn test_main_document_part() {
        let pkg = OpcPackage::from_bytes(create_minimal_docx()).unwrap();
        let main_part = pkg.main_document_part().unwrap();
        assert_eq!(main_part.content_type(), ct::WML_DOCUMENT_MAIN);
    }

    #[test]
    fn test_rels_source_mapping() {
        let pkg_rels = PackURI::new("/_rels/.rels").unwrap();
        assert_eq!(rels_source(&pkg_rels).as_deref(), Some("/"));

        let doc_rels = PackURI::new("/word/_rels/document.xml.rels").unwrap();
        assert_eq!(rels_source(&doc_rels).as_deref(), Some("/word/document.xml"));

        let doc = PackURI::new("/word/document.xml").unwrap();
        assert_eq!(rels_source(&doc), None);
    }

    #[test]
    fn test_untouched_round_trip_is_byte_identical() {
        let pkg = OpcPackage::from_bytes(create_minimal_docx()).unwrap();
        let out = pkg.to_bytes().unwrap();

        let reread = OpcPackage::from_bytes(out).unwrap();
        let original = OpcPackage::from_bytes(create_minimal_docx()).unwrap();
        for part in original.iter_parts() {
            let other = reread.part(part.partname()).unwrap();
            assert_eq!(part.blob(), other.blob(), "part {} differs", part.partname());
        }
    }

    #[test]
    fn test_add_part_updates_content_types() {
        let mut pkg = OpcPackage::from_bytes(create_minimal_docx()).unwrap();
        let header = pkg.next_partname("/word/header%d.xml").unwrap();
        assert_eq!(header.as_str(), "/word/header1.xml");

        pkg.add_part(header.clone(), ct::WML_HEADER, b"<w:hdr/>".to_vec());
        let out = pkg.to_bytes().unwrap();

        let reread = OpcPackage::from_bytes(out).unwrap();
        let part = reread.part(&header).unwrap();
        assert_eq!(part.content_type(), ct::WML_HEADER);
    }
}
