//! Resource type codes and file extensions.
//!
//! Type codes are the 16-bit values stored in KEY, BIF and ERF tables. Unknown
//! codes are preserved as-is, so [`ResourceType`] is a newtype rather than a
//! closed enum.

use std::fmt;

/// A 16-bit resource type code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceType(pub u16);

impl ResourceType {
    pub const INVALID: Self = Self(0xFFFF);

    // Category pseudo-types, never stored on disk.
    pub const CONTAINER: Self = Self(0xFFFE);
    pub const GFF_ARCHIVE: Self = Self(0xFFFD);
    pub const MOVIE: Self = Self(0xFFFC);
    pub const PLAYER: Self = Self(0xFFFB);
    pub const SOUND: Self = Self(0xFFFA);
    pub const TEXTURE: Self = Self(0xFFF9);
    pub const JSON: Self = Self(0xFFF8);

    pub const BMP: Self = Self(1);
    pub const MVE: Self = Self(2);
    pub const TGA: Self = Self(3);
    pub const WAV: Self = Self(4);
    pub const PLT: Self = Self(6);
    pub const INI: Self = Self(7);
    pub const BMU: Self = Self(8);
    pub const MPG: Self = Self(9);
    pub const TXT: Self = Self(10);
    pub const PLH: Self = Self(2000);
    pub const TEX: Self = Self(2001);
    pub const MDL: Self = Self(2002);
    pub const THG: Self = Self(2003);
    pub const FNT: Self = Self(2005);
    pub const LUA: Self = Self(2007);
    pub const SLT: Self = Self(2008);
    pub const NSS: Self = Self(2009);
    pub const NCS: Self = Self(2010);
    pub const MOD: Self = Self(2011);
    pub const ARE: Self = Self(2012);
    pub const SET: Self = Self(2013);
    pub const IFO: Self = Self(2014);
    pub const BIC: Self = Self(2015);
    pub const WOK: Self = Self(2016);
    pub const TWODA: Self = Self(2017);
    pub const TLK: Self = Self(2018);
    pub const TXI: Self = Self(2022);
    pub const GIT: Self = Self(2023);
    pub const BTI: Self = Self(2024);
    pub const UTI: Self = Self(2025);
    pub const BTC: Self = Self(2026);
    pub const UTC: Self = Self(2027);
    pub const DLG: Self = Self(2029);
    pub const ITP: Self = Self(2030);
    pub const BTT: Self = Self(2031);
    pub const UTT: Self = Self(2032);
    pub const DDS: Self = Self(2033);
    pub const BTS: Self = Self(2034);
    pub const UTS: Self = Self(2035);
    pub const LTR: Self = Self(2036);
    pub const GFF: Self = Self(2037);
    pub const FAC: Self = Self(2038);
    pub const BTE: Self = Self(2039);
    pub const UTE: Self = Self(2040);
    pub const BTD: Self = Self(2041);
    pub const UTD: Self = Self(2042);
    pub const BTP: Self = Self(2043);
    pub const UTP: Self = Self(2044);
    pub const DFT: Self = Self(2045);
    pub const GIC: Self = Self(2046);
    pub const GUI: Self = Self(2047);
    pub const CSS: Self = Self(2048);
    pub const CCS: Self = Self(2049);
    pub const BTM: Self = Self(2050);
    pub const UTM: Self = Self(2051);
    pub const DWK: Self = Self(2052);
    pub const PWK: Self = Self(2053);
    pub const BTG: Self = Self(2054);
    pub const UTG: Self = Self(2055);
    pub const JRL: Self = Self(2056);
    pub const SAV: Self = Self(2057);
    pub const UTW: Self = Self(2058);
    pub const FOURPC: Self = Self(2059);
    pub const SSF: Self = Self(2060);
    pub const HAK: Self = Self(2061);
    pub const NWM: Self = Self(2062);
    pub const BIK: Self = Self(2063);
    pub const NDB: Self = Self(2064);
    pub const PTM: Self = Self(2065);
    pub const PTT: Self = Self(2066);
    pub const BAK: Self = Self(2067);
    pub const DAT: Self = Self(2068);
    pub const SHD: Self = Self(2069);
    pub const XBC: Self = Self(2070);
    pub const WBM: Self = Self(2071);
    pub const MTR: Self = Self(2072);
    pub const KTX: Self = Self(2073);
    pub const TTF: Self = Self(2074);
    pub const SQL: Self = Self(2075);
    pub const TML: Self = Self(2076);
    pub const SQ3: Self = Self(2077);
    pub const LOD: Self = Self(2078);
    pub const GIF: Self = Self(2079);
    pub const PNG: Self = Self(2080);
    pub const JPG: Self = Self(2081);
    pub const CAF: Self = Self(2082);
    pub const IDS: Self = Self(9996);
    pub const ERF: Self = Self(9997);
    pub const BIF: Self = Self(9998);
    pub const KEY: Self = Self(9999);
}

const EXTENSIONS: &[(ResourceType, &str)] = &[
    (ResourceType::BMP, "bmp"),
    (ResourceType::MVE, "mve"),
    (ResourceType::TGA, "tga"),
    (ResourceType::WAV, "wav"),
    (ResourceType::PLT, "plt"),
    (ResourceType::INI, "ini"),
    (ResourceType::BMU, "bmu"),
    (ResourceType::MPG, "mpg"),
    (ResourceType::TXT, "txt"),
    (ResourceType::PLH, "plh"),
    (ResourceType::TEX, "tex"),
    (ResourceType::MDL, "mdl"),
    (ResourceType::THG, "thg"),
    (ResourceType::FNT, "fnt"),
    (ResourceType::LUA, "lua"),
    (ResourceType::SLT, "slt"),
    (ResourceType::NSS, "nss"),
    (ResourceType::NCS, "ncs"),
    (ResourceType::MOD, "mod"),
    (ResourceType::ARE, "are"),
    (ResourceType::SET, "set"),
    (ResourceType::IFO, "ifo"),
    (ResourceType::BIC, "bic"),
    (ResourceType::WOK, "wok"),
    (ResourceType::TWODA, "2da"),
    (ResourceType::TLK, "tlk"),
    (ResourceType::TXI, "txi"),
    (ResourceType::GIT, "git"),
    (ResourceType::BTI, "bti"),
    (ResourceType::UTI, "uti"),
    (ResourceType::BTC, "btc"),
    (ResourceType::UTC, "utc"),
    (ResourceType::DLG, "dlg"),
    (ResourceType::ITP, "itp"),
    (ResourceType::BTT, "btt"),
    (ResourceType::UTT, "utt"),
    (ResourceType::DDS, "dds"),
    (ResourceType::BTS, "bts"),
    (ResourceType::UTS, "uts"),
    (ResourceType::LTR, "ltr"),
    (ResourceType::GFF, "gff"),
    (ResourceType::FAC, "fac"),
    (ResourceType::BTE, "bte"),
    (ResourceType::UTE, "ute"),
    (ResourceType::BTD, "btd"),
    (ResourceType::UTD, "utd"),
    (ResourceType::BTP, "btp"),
    (ResourceType::UTP, "utp"),
    (ResourceType::DFT, "dft"),
    (ResourceType::GIC, "gic"),
    (ResourceType::GUI, "gui"),
    (ResourceType::CSS, "css"),
    (ResourceType::CCS, "ccs"),
    (ResourceType::BTM, "btm"),
    (ResourceType::UTM, "utm"),
    (ResourceType::DWK, "dwk"),
    (ResourceType::PWK, "pwk"),
    (ResourceType::BTG, "btg"),
    (ResourceType::UTG, "utg"),
    (ResourceType::JRL, "jrl"),
    (ResourceType::SAV, "sav"),
    (ResourceType::UTW, "utw"),
    (ResourceType::FOURPC, "4pc"),
    (ResourceType::SSF, "ssf"),
    (ResourceType::HAK, "hak"),
    (ResourceType::NWM, "nwm"),
    (ResourceType::BIK, "bik"),
    (ResourceType::NDB, "ndb"),
    (ResourceType::PTM, "ptm"),
    (ResourceType::PTT, "ptt"),
    (ResourceType::BAK, "bak"),
    (ResourceType::DAT, "dat"),
    (ResourceType::SHD, "shd"),
    (ResourceType::XBC, "xbc"),
    (ResourceType::WBM, "wbm"),
    (ResourceType::MTR, "mtr"),
    (ResourceType::KTX, "ktx"),
    (ResourceType::TTF, "ttf"),
    (ResourceType::SQL, "sql"),
    (ResourceType::TML, "tml"),
    (ResourceType::SQ3, "sq3"),
    (ResourceType::LOD, "lod"),
    (ResourceType::GIF, "gif"),
    (ResourceType::PNG, "png"),
    (ResourceType::JPG, "jpg"),
    (ResourceType::CAF, "caf"),
    (ResourceType::IDS, "ids"),
    (ResourceType::ERF, "erf"),
    (ResourceType::BIF, "bif"),
    (ResourceType::KEY, "key"),
];

impl ResourceType {
    /// Maps a file extension to a type. Case-insensitive, one leading `.` is
    /// ignored. Returns [`ResourceType::INVALID`] for unknown or too-short
    /// extensions.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.len() < 3 {
            return Self::INVALID;
        }
        if ext.eq_ignore_ascii_case("sqlite3") || ext.eq_ignore_ascii_case("sqlite3nwnxee") {
            return Self::SQ3;
        }
        EXTENSIONS
            .iter()
            .find(|(_, e)| e.eq_ignore_ascii_case(ext))
            .map(|(t, _)| *t)
            .unwrap_or(Self::INVALID)
    }

    /// Extension without the leading dot, or `""` for unknown codes.
    pub fn to_extension(self) -> &'static str {
        EXTENSIONS
            .iter()
            .find(|(t, _)| *t == self)
            .map(|(_, e)| *e)
            .unwrap_or("")
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID && !self.to_extension().is_empty()
    }

    /// Checks whether `ty` belongs to the category pseudo-type `category`.
    /// A non-category `category` matches only itself.
    pub fn check_category(category: ResourceType, ty: ResourceType) -> bool {
        use ResourceType as R;
        match category {
            R::CONTAINER => matches!(ty, R::BIF | R::ERF | R::KEY | R::MOD | R::NWM | R::SAV),
            R::GFF_ARCHIVE => matches!(
                ty,
                R::ARE
                    | R::BIC
                    | R::CAF
                    | R::DLG
                    | R::FAC
                    | R::GFF
                    | R::GIC
                    | R::GIT
                    | R::IFO
                    | R::ITP
                    | R::JRL
                    | R::UTC
                    | R::UTD
                    | R::UTE
                    | R::UTI
                    | R::UTM
                    | R::UTP
                    | R::UTS
                    | R::UTT
                    | R::UTW
            ),
            R::MOVIE => ty == R::WBM,
            R::PLAYER => ty == R::BIC,
            R::SOUND => matches!(ty, R::BMU | R::WAV),
            R::TEXTURE => matches!(ty, R::DDS | R::TGA | R::PLT),
            other => other == ty,
        }
    }
}

impl Default for ResourceType {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_extension() {
            "" => write!(f, "ResourceType({})", self.0),
            ext => write!(f, "ResourceType({ext})"),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_extension() {
            "" => write!(f, "{}", self.0),
            ext => f.write_str(ext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(ResourceType::from_extension("utc"), ResourceType::UTC);
        assert_eq!(ResourceType::from_extension(".UTC"), ResourceType::UTC);
        assert_eq!(ResourceType::from_extension("2da"), ResourceType::TWODA);
        assert_eq!(ResourceType::from_extension("sqlite3"), ResourceType::SQ3);
        assert_eq!(ResourceType::from_extension("ut"), ResourceType::INVALID);
        assert_eq!(ResourceType::from_extension("zzz"), ResourceType::INVALID);
    }

    #[test]
    fn test_to_extension() {
        assert_eq!(ResourceType::FOURPC.to_extension(), "4pc");
        assert_eq!(ResourceType(1234).to_extension(), "");
        assert!(!ResourceType(1234).is_valid());
    }

    #[test]
    fn test_categories() {
        assert!(ResourceType::check_category(ResourceType::GFF_ARCHIVE, ResourceType::UTC));
        assert!(ResourceType::check_category(ResourceType::TEXTURE, ResourceType::PLT));
        assert!(!ResourceType::check_category(ResourceType::CONTAINER, ResourceType::UTC));
        assert!(ResourceType::check_category(ResourceType::NSS, ResourceType::NSS));
    }
}
