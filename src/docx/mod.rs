//! Word (.docx) document model.
//!
//! # Architecture
//!
//! The module is organized around these key types:
//! - `WordDocument`: the overall document, wrapping the OPC package;
//!   owns header part lookup/creation and all byte-level mutation
//! - `Section`: one `<w:sectPr>` with page geometry and header/footer
//!   references
//! - `DocumentProtection`: the `w:documentProtection` record in
//!   `word/settings.xml`
//! - `shape_scan`: read-side inventory of watermark shapes in a part
//!
//! Mutation works on raw part bytes: the scan records byte offsets of the
//! structural elements (section properties, body end, header bodies) and
//! edits splice new XML at those offsets. Everything the engine does not
//! touch keeps its original bytes.

pub mod document;
pub mod enums;
pub mod protection;
pub mod section;
pub mod shape_scan;

pub use document::WordDocument;
pub use enums::{HdrFtrType, Orientation};
pub use protection::{DocumentProtection, EditRestriction, PasswordVerifier, ProtectionRecord};
pub use section::{Margins, PageSize, Section};
pub use shape_scan::{ShapeInfo, ShapeKind, scan_shapes};
