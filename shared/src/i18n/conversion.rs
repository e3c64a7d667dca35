//! Conversion between UTF-8 and each language's legacy code page.

use super::LanguageId;

/// Decodes on-disk text in `lang`'s code page.
///
/// Unknown languages fall back to a lossy UTF-8 decode.
pub fn to_utf8_by_langid(bytes: &[u8], lang: LanguageId) -> String {
    match lang.encoding() {
        Some(encoding) => {
            let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
            if had_errors {
                tracing::debug!(language = lang.short_name(), "lossy text conversion");
            }
            text.into_owned()
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Encodes UTF-8 text into `lang`'s code page.
///
/// Unmappable characters become numeric character references. Unknown
/// languages pass the UTF-8 bytes through.
pub fn from_utf8_by_langid(text: &str, lang: LanguageId) -> Vec<u8> {
    match lang.encoding() {
        Some(encoding) => {
            let (bytes, _, _) = encoding.encode(text);
            bytes.into_owned()
        }
        None => text.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cp1252_roundtrip() {
        let raw = [b'c', b'a', b'f', 0xE9];
        let text = to_utf8_by_langid(&raw, LanguageId::French);
        assert_eq!(text, "café");
        assert_eq!(from_utf8_by_langid(&text, LanguageId::French), raw);
    }

    #[test]
    fn test_ascii_is_identity() {
        for lang in [LanguageId::English, LanguageId::Japanese, LanguageId::Korean] {
            assert_eq!(to_utf8_by_langid(b"fred", lang), "fred");
            assert_eq!(from_utf8_by_langid("fred", lang), b"fred");
        }
    }

    #[test]
    fn test_invalid_language_passes_through() {
        assert_eq!(from_utf8_by_langid("ü", LanguageId::Invalid), "ü".as_bytes());
    }
}
