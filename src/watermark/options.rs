//! Placement targets and lock configuration.

use crate::docx::protection::EditRestriction;

/// Where in the document a watermark is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementTarget {
    /// Every section of the document.
    #[default]
    WholeDocument,
    /// A single section by index.
    Section(usize),
    /// Every physical page. Page count is a rendering-time property, so
    /// this is realized through every section's headers, whose content
    /// natively repeats on each page.
    AllPages,
}

/// The category of edits permitted on a locked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    /// Disallow all edits.
    ReadOnly,
    /// Disallow all edits except interaction with form-field controls.
    AllowOnlyFormFields,
    /// Disallow all edits except comments.
    AllowOnlyComments,
    /// Disallow all edits except tracked revisions.
    AllowOnlyRevisions,
}

impl LockKind {
    /// The document-level edit restriction this lock maps to.
    pub const fn restriction(self) -> EditRestriction {
        match self {
            LockKind::ReadOnly => EditRestriction::ReadOnly,
            LockKind::AllowOnlyFormFields => EditRestriction::Forms,
            LockKind::AllowOnlyComments => EditRestriction::Comments,
            LockKind::AllowOnlyRevisions => EditRestriction::TrackedChanges,
        }
    }
}

/// Editing-restriction configuration for a placement.
///
/// `lock_type` and `password` are only meaningful when `is_locked` is set;
/// a lock with an empty password is rejected when applied.
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// Whether the targeted sections are locked after placement
    pub is_locked: bool,
    /// Plaintext password backing the protection verifier
    pub password: String,
    /// The category of edits still permitted
    pub lock_type: LockKind,
}

impl LockOptions {
    /// Create an enforced lock.
    pub fn new(password: impl Into<String>, lock_type: LockKind) -> Self {
        Self {
            is_locked: true,
            password: password.into(),
            lock_type,
        }
    }
}

/// Options controlling where and how a watermark is inserted.
#[derive(Debug, Clone, Default)]
pub struct PlacementOptions {
    /// Placement target
    pub target: PlacementTarget,
    /// Shape name shared by every inserted copy, for later identification
    pub name: Option<String>,
    /// Alternative text attached to every inserted copy
    pub alternative_text: Option<String>,
    /// Optional editing restriction applied to the targeted sections
    pub lock: Option<LockOptions>,
}

impl PlacementOptions {
    /// Create options for a target with default metadata and no lock.
    pub fn new(target: PlacementTarget) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Tag inserted shapes with a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Tag inserted shapes with alternative text.
    pub fn with_alternative_text(mut self, alt: impl Into<String>) -> Self {
        self.alternative_text = Some(alt.into());
        self
    }

    /// Lock the targeted sections after placement.
    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = Some(lock);
        self
    }
}
