//! Document protection support for Word documents.
//!
//! Word enforces editing restrictions through a `<w:documentProtection>`
//! element in `word/settings.xml`: an edit-restriction class plus a salted,
//! spin-count-iterated SHA-512 password verifier. This module derives the
//! verifier, builds and parses the protection element, and models the
//! per-section protection record.

use crate::error::{Result, WatermarkError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use quick_xml::Reader;
use quick_xml::events::Event;
use rand::TryRng;
use rand::rngs::SysRng;
use sha2::{Digest, Sha512};

/// Spin count Word uses for its own protection verifiers.
const SPIN_COUNT: u32 = 100_000;

/// Legacy algorithm SID for SHA-512.
const SHA512_SID: u32 = 14;

/// The class of edits permitted on a protected document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditRestriction {
    /// No editing allowed
    ReadOnly,
    /// Only comments allowed
    Comments,
    /// Only tracked changes allowed
    TrackedChanges,
    /// Only form fields allowed
    Forms,
}

impl EditRestriction {
    /// Parse from the `w:edit` attribute value.
    pub fn from_xml(s: &str) -> Option<Self> {
        match s {
            "readOnly" => Some(Self::ReadOnly),
            "comments" => Some(Self::Comments),
            "trackedChanges" => Some(Self::TrackedChanges),
            "forms" => Some(Self::Forms),
            _ => None,
        }
    }

    /// Get the `w:edit` attribute value.
    pub const fn to_xml(self) -> &'static str {
        match self {
            Self::ReadOnly => "readOnly",
            Self::Comments => "comments",
            Self::TrackedChanges => "trackedChanges",
            Self::Forms => "forms",
        }
    }
}

/// A protection record attached to a section of the in-memory model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectionRecord {
    /// Whether the restriction is enforced
    pub enforced: bool,
    /// The class of edits still permitted
    pub restriction: EditRestriction,
}

/// A salted password verifier in the format Word stores.
#[derive(Debug, Clone)]
pub struct PasswordVerifier {
    /// Base64 verifier hash
    pub hash: String,
    /// Base64 salt
    pub salt: String,
    /// Hash iteration count
    pub spin_count: u32,
}

impl PasswordVerifier {
    /// Derive a verifier from a plaintext password.
    ///
    /// The password is encoded as UTF-16LE, hashed once with a random
    /// 16-byte salt, then re-hashed `spin_count` times with the iteration
    /// counter appended, matching Word's legacy SID-based scheme.
    pub fn derive(password: &str) -> Result<Self> {
        if password.is_empty() {
            return Err(WatermarkError::EmptyPassword);
        }

        // Generate random salt (16 bytes, as used by Office)
        let mut salt = [0u8; 16];
        let mut rng = SysRng;
        rng.try_fill_bytes(&mut salt).map_err(|e| {
            WatermarkError::Io(std::io::Error::other(format!(
                "failed to generate random salt for protection verifier: {e}"
            )))
        })?;

        // Encode password as UTF-16LE bytes
        let mut pw_bytes = Vec::with_capacity(password.len() * 2);
        for ch in password.encode_utf16() {
            pw_bytes.extend_from_slice(&ch.to_le_bytes());
        }

        // Initial hash: H[init] = H(salt || password)
        let mut hasher = Sha512::new();
        hasher.update(salt);
        hasher.update(&pw_bytes);
        let mut hash = hasher.finalize().to_vec();

        // Iterative hashing: H[n] = H(H[n-1] || count_le_u32), for spinCount cycles
        for i in 0..SPIN_COUNT {
            let mut hasher = Sha512::new();
            hasher.update(&hash);
            hasher.update(i.to_le_bytes());
            hash = hasher.finalize().to_vec();
        }

        Ok(Self {
            hash: BASE64_ENGINE.encode(&hash),
            salt: BASE64_ENGINE.encode(salt),
            spin_count: SPIN_COUNT,
        })
    }
}

/// The parsed `w:documentProtection` state of a settings part.
#[derive(Debug, Clone, Default)]
pub struct DocumentProtection {
    /// Whether a protection element is present and enforced
    pub enforced: bool,
    /// The restriction class, when present
    pub restriction: Option<EditRestriction>,
    /// Stored verifier hash (base64), when present
    pub hash: Option<String>,
    /// Stored salt (base64), when present
    pub salt: Option<String>,
    /// Stored spin count
    pub spin_count: Option<u32>,
}

impl DocumentProtection {
    /// Whether the document is protected.
    #[inline]
    pub fn is_enforced(&self) -> bool {
        self.enforced
    }

    /// Parse protection state from `word/settings.xml` bytes.
    pub fn from_settings_xml(xml: &[u8]) -> Result<Self> {
        let mut protection = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.local_name().as_ref() == b"documentProtection" =>
                {
                    protection.enforced = true;
                    for attr in e.attributes().flatten() {
                        let Ok(value) = attr.decode_and_unescape_value(reader.decoder()) else {
                            continue;
                        };
                        match attr.key.local_name().as_ref() {
                            b"edit" => {
                                protection.restriction = EditRestriction::from_xml(&value);
                            },
                            b"enforcement" => {
                                // If enforcement is off the document is not actually protected
                                if value.as_ref() == "false" || value.as_ref() == "0" {
                                    protection.enforced = false;
                                }
                            },
                            b"hash" | b"hashValue" => {
                                protection.hash = Some(value.into_owned());
                            },
                            b"salt" | b"saltValue" => {
                                protection.salt = Some(value.into_owned());
                            },
                            b"cryptSpinCount" | b"spinCount" => {
                                protection.spin_count = value.parse().ok();
                            },
                            _ => {},
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(WatermarkError::Xml(e.to_string())),
                _ => {},
            }
        }

        Ok(protection)
    }

    /// Generate the `w:documentProtection` element for a restriction and
    /// verifier, in the legacy SID attribute form Word emits.
    pub fn to_element(restriction: EditRestriction, verifier: &PasswordVerifier) -> String {
        format!(
            r#"<w:documentProtection w:edit="{}" w:enforcement="1" w:cryptProviderType="rsaAES" w:cryptAlgorithmClass="hash" w:cryptAlgorithmType="typeAny" w:cryptAlgorithmSid="{}" w:cryptSpinCount="{}" w:hash="{}" w:salt="{}"/>"#,
            restriction.to_xml(),
            SHA512_SID,
            verifier.spin_count,
            verifier.hash,
            verifier.salt,
        )
    }
}
