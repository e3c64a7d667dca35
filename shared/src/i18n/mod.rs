//! Languages, localized strings and legacy code page conversion.

mod conversion;
mod language;
mod locstring;

pub use conversion::{from_utf8_by_langid, to_utf8_by_langid};
pub use language::{Language, LanguageId};
pub use locstring::LocString;
