//! Process-wide string interner.
//!
//! Interned strings are leaked into a global set and never freed, so an
//! [`InternedString`] is a `Copy` handle that compares by content in O(len)
//! and hashes like the underlying `str`.

use hashbrown::HashSet;
use std::fmt;
use std::sync::{Mutex, OnceLock};

fn table() -> &'static Mutex<HashSet<&'static str>> {
    static TABLE: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// A string stored once for the lifetime of the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InternedString(&'static str);

impl InternedString {
    /// Interns `s`, returning the shared handle.
    pub fn new(s: &str) -> Self {
        if s.is_empty() {
            return Self("");
        }
        // A poisoned lock only means another thread panicked mid-insert; the
        // set itself is still consistent.
        let mut guard = table().lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = guard.get(s) {
            return Self(existing);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        guard.insert(leaked);
        Self(leaked)
    }

    /// Looks up `s` without interning it.
    pub fn find(s: &str) -> Option<Self> {
        let guard = table().lock().unwrap_or_else(|e| e.into_inner());
        guard.get(s).map(|v| Self(v))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl AsRef<str> for InternedString {
    fn as_ref(&self) -> &str {
        self.0
    }
}

impl From<&str> for InternedString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_shares_storage() {
        let a = InternedString::new("nw_s0_fireball");
        let b = InternedString::new(&String::from("nw_s0_fireball"));
        assert_eq!(a, b);
        assert!(std::ptr::eq(a.as_str(), b.as_str()));
    }

    #[test]
    fn test_find_does_not_insert() {
        assert!(InternedString::find("never-interned-name-123").is_none());
        let x = InternedString::new("interned-once");
        assert_eq!(InternedString::find("interned-once"), Some(x));
    }

    #[test]
    fn test_empty() {
        let e = InternedString::new("");
        assert!(e.is_empty());
        assert_eq!(e, InternedString::default());
    }
}
