//! Text helpers: color-code escaping and case-insensitive comparison.
//!
//! Game text embeds colors as `<c` + three raw bytes + `>`. The raw bytes are
//! frequently not valid in any code page, so they are rewritten as six hex
//! digits (`<cFF0000>`) on load and restored on save. Both directions work on
//! bytes.

/// Rewrites `<cRGB>` (raw bytes) as `<cRRGGBB>` (hex).
pub fn sanitize_colors(mut bytes: Vec<u8>) -> Vec<u8> {
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i - 1] == b'<' && bytes[i] == b'c' {
            if i + 4 >= bytes.len() || bytes[i + 4] != b'>' {
                tracing::error!(text = %String::from_utf8_lossy(&bytes), "invalid color code");
                i += 1;
                continue;
            }
            let hex = hex::encode_upper(&bytes[i + 1..i + 4]);
            bytes.splice(i + 1..i + 4, hex.into_bytes());
            i += 7;
        }
        i += 1;
    }
    bytes
}

/// Rewrites `<cRRGGBB>` (hex) back into `<cRGB>` (raw bytes).
pub fn desanitize_colors(mut bytes: Vec<u8>) -> Vec<u8> {
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i - 1] != b'<' || bytes[i] != b'c' {
            i += 1;
            continue;
        }
        if i + 7 >= bytes.len() || bytes[i + 7] != b'>' {
            tracing::error!(text = %String::from_utf8_lossy(&bytes), "invalid color code");
            i += 1;
            continue;
        }
        match hex::decode(&bytes[i + 1..i + 7]) {
            Ok(raw) => {
                bytes.splice(i + 1..i + 7, raw);
                i += 4;
            }
            Err(e) => {
                tracing::error!(text = %String::from_utf8_lossy(&bytes), "failed to desanitize color code: {e}");
                i += 1;
            }
        }
    }
    bytes
}

/// ASCII case-insensitive equality.
pub fn icmp(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_colors() {
        let raw = b"<c\xFF\x00\x00>Red</c>".to_vec();
        assert_eq!(sanitize_colors(raw.clone()), b"<cFF0000>Red</c>");
        assert_eq!(desanitize_colors(sanitize_colors(raw.clone())), raw);
    }

    #[test]
    fn test_invalid_codes_untouched() {
        assert_eq!(sanitize_colors(b"<cab".to_vec()), b"<cab");
        assert_eq!(desanitize_colors(b"<cZZ0000>".to_vec()), b"<cZZ0000>");
        assert_eq!(desanitize_colors(b"</c>".to_vec()), b"</c>");
    }

    #[test]
    fn test_icmp() {
        assert!(icmp("ClassList", "classlist"));
        assert!(!icmp("Class", "ClassList"));
    }
}
