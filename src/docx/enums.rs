//! Closed enumerations for WordprocessingML attribute values.

/// Page orientation for a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Portrait orientation (default)
    #[default]
    Portrait,
    /// Landscape orientation
    Landscape,
}

impl Orientation {
    /// Parse from the `w:orient` attribute value.
    pub fn from_xml(s: &str) -> Option<Self> {
        match s {
            "portrait" => Some(Self::Portrait),
            "landscape" => Some(Self::Landscape),
            _ => None,
        }
    }

    /// Get the XML attribute value.
    pub const fn to_xml(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

/// Header/footer variant within a section.
///
/// A section differentiates its headers by page class: the default header
/// covers all pages unless a first-page or even-page variant is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HdrFtrType {
    /// Header/footer for odd pages, or all pages if no even variant.
    Default,
    /// Header/footer for the first page of the section.
    First,
    /// Header/footer for even pages.
    Even,
}

impl HdrFtrType {
    /// Parse from the `w:type` attribute of a header/footer reference.
    pub fn from_xml(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "first" => Some(Self::First),
            "even" => Some(Self::Even),
            _ => None,
        }
    }

    /// Get the XML attribute value.
    pub const fn to_xml(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::First => "first",
            Self::Even => "even",
        }
    }
}
