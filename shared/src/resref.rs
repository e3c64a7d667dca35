//! Resource references: short, case-insensitive resource names.

use crate::interner::InternedString;
use std::fmt;

/// Max resref length for 1.69-era containers (16-byte name fields).
pub const RESREF_MAX_LEN_V169: usize = 16;
/// Max resref length for Enhanced Edition containers.
pub const RESREF_MAX_LEN_EE: usize = 32;

/// A resource name.
///
/// Names are lowercased and interned on construction, so equality and hashing
/// are case-insensitive with respect to the input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Resref(InternedString);

impl Resref {
    /// Creates a resref allowing up to [`RESREF_MAX_LEN_EE`] bytes.
    ///
    /// Overlong names log an error and produce an empty resref.
    pub fn new(name: &str) -> Self {
        Self::with_limit(name, RESREF_MAX_LEN_EE)
    }

    /// Creates a resref with an explicit length limit.
    pub fn with_limit(name: &str, max_len: usize) -> Self {
        if name.len() > max_len {
            tracing::error!(name, max_len, "invalid resref, too long");
            return Self::default();
        }
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            Self(InternedString::new(&name.to_ascii_lowercase()))
        } else {
            Self(InternedString::new(name))
        }
    }

    /// Creates a resref from a fixed-size, NUL-padded on-disk field.
    pub fn from_padded(bytes: &[u8]) -> Self {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let name = String::from_utf8_lossy(&bytes[..end]);
        Self::with_limit(&name, bytes.len())
    }

    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for Resref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resref({:?})", self.as_str())
    }
}

impl fmt::Display for Resref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Resref {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
