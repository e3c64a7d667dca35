//! ERF archives: `.erf`, `.mod`, `.hak` and `.sav`.
//!
//! Layout (little-endian):
//! ```text
//! header         160 B  type[4] version[4] locstring_count locstring_size entry_count
//!                       offset_locstring offset_keys offset_res year day_of_year
//!                       desc_strref reserved[116]
//! locstrings            (u32 lang, u32 size, bytes)*
//! keys                  (resref[16|32], u32 id, u16 type, u16 unused)*
//! resources             (u32 offset, u32 size)*
//! data
//! ```
//! V1.0 uses 16-byte resrefs, V1.1 uses 32-byte resrefs.

mod builder;
#[cfg(test)]
mod tests;

pub use builder::ErfBuilder;

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use rollkit_shared::i18n::to_utf8_by_langid;
use rollkit_shared::{
    ByteArray, Language, LocString, Resource, ResourceData, ResourceDescriptor, ResourceType,
    Resref,
};

use crate::container::{Container, ContainerKey, canonical_name, mtime_of};
use crate::error::ContainerError;

pub(crate) const HEADER_SIZE: usize = 160;
pub(crate) const RES_ENTRY_SIZE: usize = 8;

/// ERF flavour, from the header's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErfType {
    Erf,
    Hak,
    Mod,
    Sav,
}

impl ErfType {
    pub(crate) fn tag(self) -> &'static [u8; 4] {
        match self {
            ErfType::Erf => b"ERF ",
            ErfType::Hak => b"HAK ",
            ErfType::Mod => b"MOD ",
            ErfType::Sav => b"SAV ",
        }
    }

    fn from_tag(tag: &[u8]) -> Option<Self> {
        match &tag[..3] {
            b"ERF" => Some(ErfType::Erf),
            b"HAK" => Some(ErfType::Hak),
            b"MOD" => Some(ErfType::Mod),
            b"SAV" => Some(ErfType::Sav),
            _ => None,
        }
    }
}

/// ERF format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErfVersion {
    V1_0,
    V1_1,
}

impl ErfVersion {
    fn resref_len(self) -> usize {
        match self {
            ErfVersion::V1_0 => 16,
            ErfVersion::V1_1 => 32,
        }
    }

    fn key_size(self) -> usize {
        self.resref_len() + 8
    }
}

struct ErfEntry {
    name: Resource,
    offset: u32,
    size: u32,
}

/// A read-only ERF archive.
///
/// The header and tables are read once at open; payloads are read on demand.
pub struct Erf {
    path: PathBuf,
    name: String,
    pub erf_type: ErfType,
    pub version: ErfVersion,
    /// Localized archive description
    pub description: LocString,
    entries: Vec<ErfEntry>,
    file_size: u64,
    valid: bool,
}

impl Erf {
    /// Opens and validates an archive.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        if !path.exists() {
            return Err(ContainerError::NotFound(path.to_path_buf()));
        }
        let (canonical, name) = canonical_name(path)?;
        tracing::info!(path = %canonical.display(), "erf: loading");

        let mut file = File::open(&canonical)?;
        let file_size = file.metadata()?.len();

        let mut header = [0u8; HEADER_SIZE];
        if file_size < HEADER_SIZE as u64 {
            return Err(ContainerError::Corrupt("file smaller than header"));
        }
        file.read_exact(&mut header)?;

        let erf_type = ErfType::from_tag(&header[0..4]).ok_or_else(|| {
            ContainerError::InvalidType(String::from_utf8_lossy(&header[0..4]).into_owned())
        })?;
        let version = match &header[4..8] {
            b"V1.0" => ErfVersion::V1_0,
            b"V1.1" => ErfVersion::V1_1,
            other => {
                return Err(ContainerError::InvalidVersion(
                    String::from_utf8_lossy(other).into_owned(),
                ));
            }
        };

        let mut cursor = Cursor::new(&header[8..]);
        let locstring_count = cursor.read_u32::<LittleEndian>()?;
        let locstring_size = cursor.read_u32::<LittleEndian>()?;
        let entry_count = cursor.read_u32::<LittleEndian>()? as usize;
        let offset_locstring = cursor.read_u32::<LittleEndian>()?;
        let offset_keys = cursor.read_u32::<LittleEndian>()?;
        let offset_res = cursor.read_u32::<LittleEndian>()?;
        let _year = cursor.read_u32::<LittleEndian>()?;
        let _day_of_year = cursor.read_u32::<LittleEndian>()?;
        let desc_strref = cursor.read_u32::<LittleEndian>()?;

        let fits = |offset: u32, len: usize| -> bool {
            (offset as u64).checked_add(len as u64).is_some_and(|end| end <= file_size)
        };
        let keys_len = entry_count
            .checked_mul(version.key_size())
            .ok_or(ContainerError::Corrupt("key table overflows"))?;
        let res_len = entry_count
            .checked_mul(RES_ENTRY_SIZE)
            .ok_or(ContainerError::Corrupt("resource table overflows"))?;
        if !fits(offset_keys, keys_len) {
            return Err(ContainerError::Corrupt("key table out of bounds"));
        }
        if !fits(offset_res, res_len) {
            return Err(ContainerError::Corrupt("resource table out of bounds"));
        }
        if !fits(offset_locstring, locstring_size as usize) {
            return Err(ContainerError::Corrupt("description out of bounds"));
        }

        let mut description = LocString::new(desc_strref);
        let locstrings = read_region(&mut file, offset_locstring, locstring_size as usize)?;
        let mut cursor = Cursor::new(locstrings.as_slice());
        for _ in 0..locstring_count {
            let lang = cursor.read_u32::<LittleEndian>()?;
            let size = cursor.read_u32::<LittleEndian>()? as usize;
            let start = cursor.position() as usize;
            let raw = locstrings
                .get(start..start.saturating_add(size))
                .ok_or(ContainerError::Corrupt("description string out of bounds"))?;
            cursor.set_position((start + size) as u64);

            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            let (base, feminine) = Language::to_base_id(lang);
            description.add(base, to_utf8_by_langid(&raw[..end], base), feminine);
        }

        let keys = read_region(&mut file, offset_keys, keys_len)?;
        let res = read_region(&mut file, offset_res, res_len)?;
        let mut key_cursor = Cursor::new(keys.as_slice());
        let mut res_cursor = Cursor::new(res.as_slice());
        let mut entries = Vec::with_capacity(entry_count);
        let mut resref = vec![0u8; version.resref_len()];
        for _ in 0..entry_count {
            key_cursor.read_exact(&mut resref)?;
            let _id = key_cursor.read_u32::<LittleEndian>()?;
            let ty = ResourceType(key_cursor.read_u16::<LittleEndian>()?);
            let _unused = key_cursor.read_u16::<LittleEndian>()?;
            let offset = res_cursor.read_u32::<LittleEndian>()?;
            let size = res_cursor.read_u32::<LittleEndian>()?;
            entries.push(ErfEntry {
                name: Resource::new(Resref::from_padded(&resref), ty),
                offset,
                size,
            });
        }

        tracing::info!(path = %canonical.display(), count = entries.len(), "erf: loaded");
        Ok(Self {
            path: canonical,
            name,
            erf_type,
            version,
            description,
            entries,
            file_size,
            valid: true,
        })
    }

    /// Opens an archive, producing an invalid container on failure.
    pub fn new(path: &Path) -> Self {
        Self::open(path).unwrap_or_else(|e| {
            tracing::error!(path = %path.display(), "unable to open erf: {e}");
            Self {
                path: path.to_path_buf(),
                name: String::new(),
                erf_type: ErfType::Erf,
                version: ErfVersion::V1_0,
                description: LocString::default(),
                entries: Vec::new(),
                file_size: 0,
                valid: false,
            }
        })
    }

    fn read(&self, entry: &ErfEntry) -> ByteArray {
        if entry.offset == u32::MAX {
            return ByteArray::new();
        }
        if entry.offset as u64 + entry.size as u64 > self.file_size {
            tracing::error!(path = %self.path.display(), "erf: entry out of bounds");
            return ByteArray::new();
        }
        let result = File::open(&self.path)
            .and_then(|mut f| read_region(&mut f, entry.offset, entry.size as usize));
        match result {
            Ok(bytes) => ByteArray::from(bytes),
            Err(e) => {
                tracing::error!(path = %self.path.display(), "erf: failed reading entry: {e}");
                ByteArray::new()
            }
        }
    }
}

pub(crate) fn read_region(file: &mut File, offset: u32, len: usize) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset as u64))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

impl Container for Erf {
    fn valid(&self) -> bool {
        self.valid
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn visit(&self, visitor: &mut dyn FnMut(Resource, ContainerKey)) {
        for (i, e) in self.entries.iter().enumerate() {
            visitor(e.name, ContainerKey(i as u64));
        }
    }

    fn demand(&self, key: ContainerKey) -> ResourceData {
        match self.entries.get(key.0 as usize) {
            Some(e) => ResourceData::new(e.name, self.read(e)),
            None => ResourceData::default(),
        }
    }

    fn stat(&self, key: ContainerKey) -> Option<ResourceDescriptor> {
        let e = self.entries.get(key.0 as usize)?;
        Some(ResourceDescriptor {
            name: e.name,
            size: e.size as usize,
            mtime: mtime_of(&self.path),
            parent: self.path.clone(),
        })
    }
}
