//! Localized strings: a strref plus per-language overrides.

use serde::{Deserialize, Serialize};

use super::{Language, LanguageId};

/// A string table reference with optional inline translations.
///
/// Entries are kept sorted by runtime language id so that equality does not
/// depend on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocString {
    strref: u32,
    #[serde(default)]
    strings: Vec<LocStringEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LocStringEntry {
    lang: u32,
    string: String,
}

impl Default for LocString {
    fn default() -> Self {
        Self::new(u32::MAX)
    }
}

impl LocString {
    /// No string table reference.
    pub const NO_STRREF: u32 = u32::MAX;

    pub fn new(strref: u32) -> Self {
        Self {
            strref,
            strings: Vec::new(),
        }
    }

    /// Adds or replaces the string for `(language, feminine)`.
    ///
    /// Returns false for [`LanguageId::Invalid`].
    pub fn add(&mut self, language: LanguageId, string: impl Into<String>, feminine: bool) -> bool {
        if language == LanguageId::Invalid {
            return false;
        }
        let lang = Language::to_runtime_id(language, feminine);
        let string = string.into();
        match self.strings.binary_search_by_key(&lang, |e| e.lang) {
            Ok(i) => self.strings[i].string = string,
            Err(i) => self.strings.insert(i, LocStringEntry { lang, string }),
        }
        true
    }

    pub fn contains(&self, language: LanguageId, feminine: bool) -> bool {
        self.find(language, feminine).is_some()
    }

    /// String for `(language, feminine)`, or `""` when absent.
    pub fn get(&self, language: LanguageId, feminine: bool) -> &str {
        self.find(language, feminine).unwrap_or("")
    }

    pub fn remove(&mut self, language: LanguageId, feminine: bool) {
        let lang = Language::to_runtime_id(language, feminine);
        self.strings.retain(|e| e.lang != lang);
    }

    pub fn size(&self) -> usize {
        self.strings.len()
    }

    pub fn strref(&self) -> u32 {
        self.strref
    }

    pub fn set_strref(&mut self, strref: u32) {
        self.strref = strref;
    }

    /// Iterates `(runtime id, string)` in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.strings.iter().map(|e| (e.lang, e.string.as_str()))
    }

    fn find(&self, language: LanguageId, feminine: bool) -> Option<&str> {
        if language == LanguageId::Invalid {
            return None;
        }
        let lang = Language::to_runtime_id(language, feminine);
        self.strings
            .binary_search_by_key(&lang, |e| e.lang)
            .ok()
            .map(|i| self.strings[i].string.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_and_sorts() {
        let mut a = LocString::new(42);
        a.add(LanguageId::German, "Hallo", false);
        a.add(LanguageId::English, "Hello", false);
        a.add(LanguageId::German, "Servus", false);
        assert_eq!(a.size(), 2);
        assert_eq!(a.get(LanguageId::German, false), "Servus");
        let ids: Vec<u32> = a.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 4]);

        let mut b = LocString::new(42);
        b.add(LanguageId::German, "Servus", false);
        b.add(LanguageId::English, "Hello", false);
        assert_eq!(a, b);
    }

    #[test]
    fn test_feminine_is_distinct() {
        let mut s = LocString::default();
        assert_eq!(s.strref(), LocString::NO_STRREF);
        s.add(LanguageId::French, "le", false);
        assert!(!s.contains(LanguageId::French, true));
        assert_eq!(s.get(LanguageId::French, true), "");
        assert!(!s.add(LanguageId::Invalid, "x", false));
        s.remove(LanguageId::French, false);
        assert_eq!(s.size(), 0);
    }
}
