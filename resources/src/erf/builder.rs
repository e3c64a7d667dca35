//! ERF V1.0 writer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use chrono::Datelike;
use rollkit_shared::i18n::from_utf8_by_langid;
use rollkit_shared::{Language, LocString, Resource};

use super::{ErfType, HEADER_SIZE, RES_ENTRY_SIZE};
use crate::error::ErfWriteError;

const KEY_SIZE: usize = 24;
const RESREF_LEN: usize = 16;

enum Source {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Collects resources and writes them as a V1.0 archive.
///
/// Entries are written in sorted order, so the same inputs always produce the
/// same bytes apart from the build date.
pub struct ErfBuilder {
    erf_type: ErfType,
    description: LocString,
    entries: BTreeMap<Resource, Source>,
    date: (u32, u32),
}

impl ErfBuilder {
    pub fn new(erf_type: ErfType) -> Self {
        let now = chrono::Local::now();
        Self {
            erf_type,
            description: LocString::default(),
            entries: BTreeMap::new(),
            date: ((now.year() - 1900).max(0) as u32, now.ordinal0()),
        }
    }

    pub fn set_description(&mut self, description: LocString) {
        self.description = description;
    }

    /// Overrides the build date (years since 1900, zero-based day of year).
    pub fn set_date(&mut self, year: u32, day_of_year: u32) {
        self.date = (year, day_of_year);
    }

    /// Adds or replaces a resource from memory.
    pub fn add_bytes(&mut self, res: Resource, bytes: Vec<u8>) -> Result<(), ErfWriteError> {
        check_name(&res)?;
        self.entries.insert(res, Source::Bytes(bytes));
        Ok(())
    }

    /// Adds or replaces a resource from a file, named after the file.
    ///
    /// The file is read when the archive is written.
    pub fn add_file(&mut self, path: &Path) -> Result<(), ErfWriteError> {
        let res = Resource::from_path(path);
        check_name(&res)?;
        if !path.is_file() {
            return Err(ErfWriteError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("'{}' is not a file", path.display()),
            )));
        }
        self.entries.insert(res, Source::File(path.to_path_buf()));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ErfWriteError> {
        let mut payloads = Vec::with_capacity(self.entries.len());
        for source in self.entries.values() {
            payloads.push(match source {
                Source::Bytes(b) => std::borrow::Cow::Borrowed(b.as_slice()),
                Source::File(p) => std::borrow::Cow::Owned(std::fs::read(p)?),
            });
        }

        let mut locstrings = Vec::new();
        for (lang, text) in self.description.iter() {
            let (base, _) = Language::to_base_id(lang);
            let mut encoded = from_utf8_by_langid(text, base);
            // ERF and HAK descriptions are NUL terminated.
            if matches!(self.erf_type, ErfType::Erf | ErfType::Hak) {
                encoded.push(0);
            }
            locstrings.write_u32::<LittleEndian>(lang)?;
            locstrings.write_u32::<LittleEndian>(to_u32(encoded.len())?)?;
            locstrings.extend_from_slice(&encoded);
        }

        let count = self.entries.len();
        let offset_locstring = HEADER_SIZE;
        let offset_keys = offset_locstring + locstrings.len();
        let offset_res = offset_keys + count * KEY_SIZE;
        let mut data_offset = offset_res + count * RES_ENTRY_SIZE;

        let mut out = Vec::with_capacity(data_offset + payloads.iter().map(|p| p.len()).sum::<usize>());
        out.extend_from_slice(self.erf_type.tag());
        out.extend_from_slice(b"V1.0");
        out.write_u32::<LittleEndian>(to_u32(self.description.size())?)?;
        out.write_u32::<LittleEndian>(to_u32(locstrings.len())?)?;
        out.write_u32::<LittleEndian>(to_u32(count)?)?;
        out.write_u32::<LittleEndian>(to_u32(offset_locstring)?)?;
        out.write_u32::<LittleEndian>(to_u32(offset_keys)?)?;
        out.write_u32::<LittleEndian>(to_u32(offset_res)?)?;
        out.write_u32::<LittleEndian>(self.date.0)?;
        out.write_u32::<LittleEndian>(self.date.1)?;
        out.write_u32::<LittleEndian>(self.description.strref())?;
        out.resize(HEADER_SIZE, 0);

        out.extend_from_slice(&locstrings);

        for (id, res) in self.entries.keys().enumerate() {
            let mut resref = [0u8; RESREF_LEN];
            let name = res.resref.as_str().as_bytes();
            resref[..name.len()].copy_from_slice(name);
            out.extend_from_slice(&resref);
            out.write_u32::<LittleEndian>(to_u32(id)?)?;
            out.write_u16::<LittleEndian>(res.ty.0)?;
            out.write_u16::<LittleEndian>(0)?;
        }

        for payload in &payloads {
            out.write_u32::<LittleEndian>(to_u32(data_offset)?)?;
            out.write_u32::<LittleEndian>(to_u32(payload.len())?)?;
            data_offset += payload.len();
        }

        for payload in &payloads {
            out.extend_from_slice(payload);
        }
        Ok(out)
    }

    /// Writes the archive to a temporary file beside `path`, then renames it
    /// into place.
    pub fn write_to(&self, path: &Path) -> Result<(), ErfWriteError> {
        let bytes = self.to_bytes()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        tracing::info!(path = %path.display(), count = self.entries.len(), "erf: written");
        Ok(())
    }
}

fn check_name(res: &Resource) -> Result<(), ErfWriteError> {
    if !res.valid() {
        return Err(ErfWriteError::InvalidName(res.filename()));
    }
    if res.resref.len() > RESREF_LEN {
        return Err(ErfWriteError::ResrefTooLong(res.resref.to_string()));
    }
    Ok(())
}

fn to_u32(n: usize) -> Result<u32, ErfWriteError> {
    u32::try_from(n).map_err(|_| ErfWriteError::TooLarge)
}
