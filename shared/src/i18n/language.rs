//! Language table.
//!
//! On disk, localized strings are tagged with a *runtime id*:
//! `language * 2 + feminine`. [`Language::to_base_id`] and
//! [`Language::to_runtime_id`] convert between the two forms.

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

/// Game language identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum LanguageId {
    English = 0,
    French = 1,
    German = 2,
    Italian = 3,
    Spanish = 4,
    Polish = 5,
    Korean = 128,
    ChineseTraditional = 129,
    ChineseSimplified = 130,
    Japanese = 131,
    Invalid = u32::MAX,
}

/// Properties of a supported language.
#[derive(Debug, Clone, Copy)]
pub struct Language {
    pub id: LanguageId,
    pub short_name: &'static str,
    pub long_name: &'static str,
    /// Code page used for on-disk text
    pub encoding: &'static Encoding,
    pub has_feminine: bool,
}

static LANGUAGES: [Language; 10] = [
    Language::entry(LanguageId::English, "en", "English", encoding_rs::WINDOWS_1252, false),
    Language::entry(LanguageId::French, "fr", "French", encoding_rs::WINDOWS_1252, true),
    Language::entry(LanguageId::German, "de", "German", encoding_rs::WINDOWS_1252, true),
    Language::entry(LanguageId::Italian, "it", "Italian", encoding_rs::WINDOWS_1252, true),
    Language::entry(LanguageId::Spanish, "es", "Spanish", encoding_rs::WINDOWS_1252, true),
    Language::entry(LanguageId::Polish, "pl", "Polish", encoding_rs::WINDOWS_1250, true),
    Language::entry(LanguageId::Korean, "ko", "Korean", encoding_rs::EUC_KR, true),
    Language::entry(
        LanguageId::ChineseSimplified,
        "zh-cn",
        "Chinese Simplified",
        encoding_rs::GBK,
        true,
    ),
    Language::entry(
        LanguageId::ChineseTraditional,
        "zh-tw",
        "Chinese Traditional",
        encoding_rs::BIG5,
        true,
    ),
    Language::entry(LanguageId::Japanese, "ja", "Japanese", encoding_rs::SHIFT_JIS, true),
];

impl Language {
    const fn entry(
        id: LanguageId,
        short_name: &'static str,
        long_name: &'static str,
        encoding: &'static Encoding,
        has_feminine: bool,
    ) -> Self {
        Self {
            id,
            short_name,
            long_name,
            encoding,
            has_feminine,
        }
    }

    /// All supported languages.
    pub fn all() -> &'static [Language] {
        &LANGUAGES
    }

    /// Looks up a language's properties.
    pub fn get(id: LanguageId) -> Option<&'static Language> {
        LANGUAGES.iter().find(|l| l.id == id)
    }

    /// Splits a runtime id into `(language, feminine)`.
    ///
    /// Unknown ids yield `(LanguageId::Invalid, false)`.
    pub fn to_base_id(runtime: u32) -> (LanguageId, bool) {
        let feminine = runtime % 2 == 1;
        let base = runtime / 2;
        match LANGUAGES.iter().find(|l| l.id as u32 == base) {
            Some(l) => (l.id, feminine),
            None => (LanguageId::Invalid, false),
        }
    }

    /// Combines a language and gender into a runtime id.
    pub fn to_runtime_id(lang: LanguageId, feminine: bool) -> u32 {
        if lang == LanguageId::Invalid {
            return u32::MAX;
        }
        lang as u32 * 2 + u32::from(feminine)
    }
}

impl LanguageId {
    /// Parses a short (`de`) or long (`German`) name, case-insensitively.
    pub fn from_short(name: &str) -> Self {
        LANGUAGES
            .iter()
            .find(|l| l.short_name.eq_ignore_ascii_case(name) || l.long_name.eq_ignore_ascii_case(name))
            .map(|l| l.id)
            .unwrap_or(LanguageId::Invalid)
    }

    /// Short code, or `""` for [`LanguageId::Invalid`].
    pub fn short_name(self) -> &'static str {
        Language::get(self).map(|l| l.short_name).unwrap_or("")
    }

    pub fn encoding(self) -> Option<&'static Encoding> {
        Language::get(self).map(|l| l.encoding)
    }

    pub fn has_feminine(self) -> bool {
        Language::get(self).is_some_and(|l| l.has_feminine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_id_roundtrip() {
        assert_eq!(Language::to_runtime_id(LanguageId::English, false), 0);
        assert_eq!(Language::to_runtime_id(LanguageId::German, true), 5);
        assert_eq!(Language::to_base_id(5), (LanguageId::German, true));
        assert_eq!(Language::to_base_id(260), (LanguageId::ChineseSimplified, false));
        assert_eq!(Language::to_base_id(263), (LanguageId::Japanese, true));
        assert_eq!(Language::to_base_id(40), (LanguageId::Invalid, false));
        assert_eq!(Language::to_runtime_id(LanguageId::Invalid, true), u32::MAX);
    }

    #[test]
    fn test_from_short() {
        assert_eq!(LanguageId::from_short("zh-TW"), LanguageId::ChineseTraditional);
        assert_eq!(LanguageId::from_short("polish"), LanguageId::Polish);
        assert_eq!(LanguageId::from_short("xx"), LanguageId::Invalid);
        assert!(!LanguageId::English.has_feminine());
        assert!(LanguageId::French.has_feminine());
    }
}
