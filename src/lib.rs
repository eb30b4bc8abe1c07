//! Filigree - a Rust library for watermarking and protecting Word documents
//!
//! This library inserts text or image watermarks into Word (.docx) documents
//! as native drawing shapes and can restrict editing of the document with a
//! password-backed protection record.
//!
//! # Features
//!
//! - **Text watermarks**: font, size, bold/italic, color, opacity, rotation
//! - **Image watermarks**: sized from intrinsic pixel dimensions or an
//!   explicit override
//! - **Placement**: a single section, the whole document, or every page;
//!   tiled across the page at configurable spacing
//! - **Protection**: read-only and restricted-editing locks with an OOXML
//!   password verifier
//! - **Lossless round trip**: parts the engine does not touch are written
//!   back byte-for-byte
//!
//! # Example - Adding a header watermark
//!
//! ```no_run
//! use filigree::{Font, PlacementOptions, TextWatermark, Watermark, Watermarker};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut marker = Watermarker::open("document.docx")?;
//!
//! let watermark = TextWatermark::new("Confidential", Font::new("Arial", 19.0))
//!     .with_rotate_angle(25.0)
//!     .with_opacity(0.8);
//!
//! marker.add(&Watermark::Text(watermark), &PlacementOptions::default())?;
//! marker.save("watermarked.docx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Locking a section behind a watermark
//!
//! ```no_run
//! use filigree::{
//!     Font, LockKind, LockOptions, PlacementOptions, PlacementTarget, TextWatermark,
//!     Watermark, Watermarker,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut marker = Watermarker::open("document.docx")?;
//!
//! let watermark = TextWatermark::new("Do Not Edit", Font::new("Arial", 36.0).bold());
//! let options = PlacementOptions::new(PlacementTarget::Section(0))
//!     .with_lock(LockOptions::new("012345", LockKind::ReadOnly));
//!
//! marker.add(&Watermark::Text(watermark), &options)?;
//! marker.save("locked.docx")?;
//! # Ok(())
//! # }
//! ```

/// Shared value types: measurement units and colors.
pub mod common;

/// Crate-level error taxonomy.
pub mod error;

/// License activation and evaluation-mode state.
pub mod license;

/// Open Packaging Convention (OPC) container support.
///
/// Low-level ZIP package handling: parts, content types, relationships,
/// and atomic serialization.
pub mod opc;

/// Word (.docx) document model.
///
/// Sections, headers/footers, protection records, and the mutation
/// primitives the watermark engine builds on.
pub mod docx;

/// Watermark specification, geometry, shape building, and placement.
pub mod watermark;

// Re-export the primary API surface.
pub use common::color::Color;
pub use common::unit::Emu;
pub use docx::WordDocument;
pub use error::{Result, WatermarkError};
pub use license::License;
pub use watermark::{
    Font, HorizontalAlignment, ImageWatermark, LockKind, LockOptions, Measure, PlacementOptions,
    PlacementTarget, TextWatermark, TileOptions, VerticalAlignment, Watermark, Watermarker,
};
