/// Error types for watermarking operations.
use thiserror::Error;

/// Result type for watermarking operations.
pub type Result<T> = std::result::Result<T, WatermarkError>;

/// Error types for watermarking operations.
///
/// Every engine operation returns a specific failure kind; no operation
/// silently swallows an error. A failed placement or protection call leaves
/// the in-memory document unchanged.
#[derive(Error, Debug)]
pub enum WatermarkError {
    /// Input package malformed or unreadable. Fatal, raised before any
    /// mutation.
    #[error("parse error: {0}")]
    Parse(String),

    /// Placement target index out of range. The document is left untouched.
    #[error("section index {index} out of range: document has {count} sections")]
    SectionOutOfRange { index: usize, count: usize },

    /// The requested font family cannot be resolved by the metrics
    /// collaborator.
    #[error("unsupported font family: {0}")]
    UnsupportedFont(String),

    /// Image bytes cannot be decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// A lock was requested with an empty password.
    #[error("protection requires a non-empty password")]
    EmptyPassword,

    /// XML content of a package part could not be parsed.
    #[error("XML error: {0}")]
    Xml(String),

    /// Container-level package error.
    #[error("package error: {0}")]
    Opc(#[from] crate::opc::error::OpcError),

    /// IO error. On save the original file is left untouched.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for WatermarkError {
    fn from(err: quick_xml::Error) -> Self {
        WatermarkError::Xml(err.to_string())
    }
}
