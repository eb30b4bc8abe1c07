//! `[Content_Types].xml` model.
//!
//! Every OPC package carries a content-types part mapping file extensions
//! (Default elements) and individual part names (Override elements) to
//! content types.

use crate::opc::error::{OpcError, Result};
use crate::opc::namespace;
use crate::opc::packuri::PackURI;
use crate::opc::rel::escape_xml;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// Parsed content-type map for a package.
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    /// Default content types by extension (lowercased)
    defaults: HashMap<String, String>,

    /// Override content types by partname
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    /// Parse the `[Content_Types].xml` part.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut ct = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"Default" => {
                        let mut ext = None;
                        let mut content_type = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.local_name().as_ref() {
                                b"Extension" => {
                                    ext = Some(attr.unescape_value()?.to_lowercase());
                                },
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.into_owned());
                                },
                                _ => {},
                            }
                        }
                        if let (Some(ext), Some(content_type)) = (ext, content_type) {
                            ct.defaults.insert(ext, content_type);
                        }
                    },
                    b"Override" => {
                        let mut partname = None;
                        let mut content_type = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.local_name().as_ref() {
                                b"PartName" => {
                                    partname = Some(attr.unescape_value()?.into_owned());
                                },
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.into_owned());
                                },
                                _ => {},
                            }
                        }
                        if let (Some(partname), Some(content_type)) = (partname, content_type) {
                            ct.overrides.insert(partname, content_type);
                        }
                    },
                    _ => {},
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(e.to_string())),
                _ => {},
            }
        }

        Ok(ct)
    }

    /// Resolve the content type for a partname.
    ///
    /// Overrides take precedence over extension defaults.
    pub fn content_type_for(&self, partname: &PackURI) -> Option<&str> {
        if let Some(ct) = self.overrides.get(partname.as_str()) {
            return Some(ct);
        }
        self.defaults
            .get(&partname.ext().to_lowercase())
            .map(String::as_str)
    }

    /// Register an extension default if not already present.
    pub fn add_default(&mut self, ext: &str, content_type: &str) {
        self.defaults
            .entry(ext.to_lowercase())
            .or_insert_with(|| content_type.to_string());
    }

    /// Register an override for a specific partname.
    pub fn add_override(&mut self, partname: &PackURI, content_type: &str) {
        self.overrides
            .insert(partname.as_str().to_string(), content_type.to_string());
    }

    /// Generate the XML for `[Content_Types].xml`.
    ///
    /// Defaults and overrides are emitted in sorted order for deterministic
    /// output.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<Types xmlns="{}">"#,
            namespace::OPC_CONTENT_TYPES
        ));
        xml.push('\n');

        let mut exts: Vec<_> = self.defaults.keys().collect();
        exts.sort();
        for ext in exts {
            xml.push_str(&format!(
                r#"  <Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(&self.defaults[ext])
            ));
            xml.push('\n');
        }

        let mut partnames: Vec<_> = self.overrides.keys().collect();
        partnames.sort();
        for partname in partnames {
            xml.push_str(&format!(
                r#"  <Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(&self.overrides[partname])
            ));
            xml.push('\n');
        }

        xml.push_str("</Types>");
        xml
    }
}
