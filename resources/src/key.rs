//! KEY/BIF pairs.
//!
//! A KEY file lists bif files and maps each resource to a packed id:
//! the top 12 bits select the bif, the low 20 bits the entry in that bif's
//! variable resource table. Bifs are opened on first use and kept open.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use byteorder::{LittleEndian, ReadBytesExt};
use rollkit_shared::{ByteArray, Resource, ResourceData, ResourceDescriptor, ResourceType, Resref};

use crate::container::{Container, ContainerKey, canonical_name, mtime_of};
use crate::error::ContainerError;

const KEY_HEADER_SIZE: usize = 64;
const FILE_TABLE_ENTRY_SIZE: usize = 12;
const KEY_ENTRY_SIZE: usize = 22;
const BIF_HEADER_SIZE: usize = 20;
const BIF_ENTRY_SIZE: usize = 16;

/// Packs a bif index and entry index into a resource id.
pub fn pack_id(bif: u32, index: u32) -> u32 {
    (bif << 20) | (index & 0xFFFFF)
}

/// Splits a resource id into `(bif, index)`.
pub fn unpack_id(id: u32) -> (u32, u32) {
    (id >> 20, id & 0xFFFFF)
}

struct BifElement {
    offset: u32,
    size: u32,
}

struct BifReader {
    file: Mutex<File>,
    file_size: u64,
    elements: Vec<BifElement>,
}

impl BifReader {
    fn open(path: &Path) -> Result<Self, ContainerError> {
        if !path.exists() {
            return Err(ContainerError::NotFound(path.to_path_buf()));
        }
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < BIF_HEADER_SIZE as u64 {
            return Err(ContainerError::Corrupt("bif smaller than header"));
        }

        let mut header = [0u8; BIF_HEADER_SIZE];
        file.read_exact(&mut header)?;
        let mut cursor = Cursor::new(&header[8..]);
        let var_res_count = cursor.read_u32::<LittleEndian>()? as u64;
        let _fix_res_count = cursor.read_u32::<LittleEndian>()?;
        let var_table_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let table_len = var_res_count * BIF_ENTRY_SIZE as u64;
        if var_table_offset + table_len > file_size {
            return Err(ContainerError::Corrupt("bif table out of bounds"));
        }

        file.seek(SeekFrom::Start(var_table_offset))?;
        let mut table = vec![0u8; table_len as usize];
        file.read_exact(&mut table)?;
        let mut cursor = Cursor::new(table.as_slice());
        let mut elements = Vec::with_capacity(var_res_count as usize);
        for _ in 0..var_res_count {
            let _id = cursor.read_u32::<LittleEndian>()?;
            let offset = cursor.read_u32::<LittleEndian>()?;
            let size = cursor.read_u32::<LittleEndian>()?;
            let _ty = cursor.read_u32::<LittleEndian>()?;
            elements.push(BifElement { offset, size });
        }

        Ok(Self {
            file: Mutex::new(file),
            file_size,
            elements,
        })
    }

    fn demand(&self, path: &Path, index: usize) -> ByteArray {
        let Some(element) = self.elements.get(index) else {
            tracing::error!(path = %path.display(), index, "bif: invalid index");
            return ByteArray::new();
        };
        if element.offset as u64 + element.size as u64 > self.file_size {
            tracing::error!(path = %path.display(), index, "bif: entry past end of file");
            return ByteArray::new();
        }

        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let mut bytes = vec![0u8; element.size as usize];
        let result = file
            .seek(SeekFrom::Start(element.offset as u64))
            .and_then(|_| file.read_exact(&mut bytes));
        match result {
            Ok(()) => ByteArray::from(bytes),
            Err(e) => {
                tracing::error!(path = %path.display(), index, "bif: read failed: {e}");
                ByteArray::new()
            }
        }
    }
}

struct Bif {
    path: PathBuf,
    reader: OnceLock<Option<BifReader>>,
}

impl Bif {
    fn reader(&self) -> Option<&BifReader> {
        self.reader
            .get_or_init(|| match BifReader::open(&self.path) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::error!(path = %self.path.display(), "unable to open bif: {e}");
                    None
                }
            })
            .as_ref()
    }
}

struct KeyEntry {
    name: Resource,
    bif: u32,
    index: u32,
}

/// A KEY file and the bifs it references.
pub struct Key {
    path: PathBuf,
    name: String,
    bifs: Vec<Bif>,
    entries: Vec<KeyEntry>,
    valid: bool,
}

impl Key {
    /// Reads the key file. Bifs are not opened until first demanded.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        if !path.exists() {
            return Err(ContainerError::NotFound(path.to_path_buf()));
        }
        let (canonical, name) = canonical_name(path)?;
        tracing::info!(path = %canonical.display(), "key: loading");

        let bytes = std::fs::read(&canonical)?;
        if bytes.len() < KEY_HEADER_SIZE {
            return Err(ContainerError::Corrupt("key smaller than header"));
        }
        if &bytes[0..4] != b"KEY " {
            return Err(ContainerError::InvalidType(
                String::from_utf8_lossy(&bytes[0..4]).into_owned(),
            ));
        }

        let mut cursor = Cursor::new(&bytes[8..]);
        let bif_count = cursor.read_u32::<LittleEndian>()? as usize;
        let key_count = cursor.read_u32::<LittleEndian>()? as usize;
        let offset_file_table = cursor.read_u32::<LittleEndian>()? as usize;
        let offset_key_table = cursor.read_u32::<LittleEndian>()? as usize;

        let base_dir = canonical.parent().unwrap_or(Path::new("."));
        let file_table_len = table_size(bif_count, FILE_TABLE_ENTRY_SIZE)?;
        let file_table = span(&bytes, offset_file_table, file_table_len)?;
        let mut bifs = Vec::with_capacity(bif_count);
        let mut cursor = Cursor::new(file_table);
        for _ in 0..bif_count {
            let _size = cursor.read_u32::<LittleEndian>()?;
            let name_offset = cursor.read_u32::<LittleEndian>()? as usize;
            let name_size = cursor.read_u16::<LittleEndian>()? as usize;
            let _drives = cursor.read_u16::<LittleEndian>()?;

            let raw = span(&bytes, name_offset, name_size)?;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            let bif_name = String::from_utf8_lossy(&raw[..end]).replace('\\', "/");
            tracing::debug!(bif = %bif_name, "key: added bif");
            bifs.push(Bif {
                path: resolve_bif_path(base_dir, &bif_name),
                reader: OnceLock::new(),
            });
        }

        let key_table_len = table_size(key_count, KEY_ENTRY_SIZE)?;
        let key_table = span(&bytes, offset_key_table, key_table_len)?;
        let mut cursor = Cursor::new(key_table);
        let mut entries = Vec::with_capacity(key_count);
        let mut resref = [0u8; 16];
        for _ in 0..key_count {
            cursor.read_exact(&mut resref)?;
            let ty = ResourceType(cursor.read_u16::<LittleEndian>()?);
            let (bif, index) = unpack_id(cursor.read_u32::<LittleEndian>()?);
            if bif as usize >= bifs.len() {
                tracing::warn!(path = %canonical.display(), bif, "key: entry references missing bif");
                continue;
            }
            entries.push(KeyEntry {
                name: Resource::new(Resref::from_padded(&resref), ty),
                bif,
                index,
            });
        }

        tracing::info!(path = %canonical.display(), count = entries.len(), "key: loaded");
        Ok(Self {
            path: canonical,
            name,
            bifs,
            entries,
            valid: true,
        })
    }

    /// Opens a key, producing an invalid container on failure.
    pub fn new(path: &Path) -> Self {
        Self::open(path).unwrap_or_else(|e| {
            tracing::error!(path = %path.display(), "unable to open key: {e}");
            Self {
                path: path.to_path_buf(),
                name: String::new(),
                bifs: Vec::new(),
                entries: Vec::new(),
                valid: false,
            }
        })
    }

    /// Resolved paths of every referenced bif.
    pub fn bif_paths(&self) -> Vec<&Path> {
        self.bifs.iter().map(|b| b.path.as_path()).collect()
    }
}

fn table_size(count: usize, entry_size: usize) -> Result<usize, ContainerError> {
    count
        .checked_mul(entry_size)
        .ok_or(ContainerError::Corrupt("key table out of bounds"))
}

fn span(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], ContainerError> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(ContainerError::Corrupt("key table out of bounds"))
}

/// Bif names are relative to the install root. EE keys live in `data/`, so
/// the key's grandparent is tried when the parent does not hold the bif.
fn resolve_bif_path(key_dir: &Path, bif_name: &str) -> PathBuf {
    let direct = key_dir.join(bif_name);
    if direct.exists() {
        return direct;
    }
    match key_dir.parent() {
        Some(grandparent) if grandparent.join(bif_name).exists() => grandparent.join(bif_name),
        _ => direct,
    }
}

impl Container for Key {
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
        let Some(entry) = self.entries.get(key.0 as usize) else {
            return ResourceData::default();
        };
        let bif = &self.bifs[entry.bif as usize];
        let bytes = match bif.reader() {
            Some(reader) => reader.demand(&bif.path, entry.index as usize),
            None => ByteArray::new(),
        };
        ResourceData::new(entry.name, bytes)
    }

    fn stat(&self, key: ContainerKey) -> Option<ResourceDescriptor> {
        let entry = self.entries.get(key.0 as usize)?;
        let bif = &self.bifs[entry.bif as usize];
        let size = bif
            .reader()
            .and_then(|r| r.elements.get(entry.index as usize))
            .map(|e| e.size as usize)?;
        Some(ResourceDescriptor {
            name: entry.name,
            size,
            mtime: mtime_of(&bif.path),
            parent: self.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use tempfile::TempDir;

    /// Writes a bif whose entry `i` holds `payloads[i]`.
    fn write_bif(path: &Path, payloads: &[&[u8]]) {
        let mut out = Vec::new();
        out.extend_from_slice(b"BIFFV1  ");
        out.write_u32::<LittleEndian>(payloads.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(BIF_HEADER_SIZE as u32).unwrap();
        let mut offset = BIF_HEADER_SIZE + payloads.len() * BIF_ENTRY_SIZE;
        for (i, p) in payloads.iter().enumerate() {
            out.write_u32::<LittleEndian>(i as u32).unwrap();
            out.write_u32::<LittleEndian>(offset as u32).unwrap();
            out.write_u32::<LittleEndian>(p.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(ResourceType::TXT.0 as u32).unwrap();
            offset += p.len();
        }
        for p in payloads {
            out.extend_from_slice(p);
        }
        std::fs::write(path, out).unwrap();
    }

    /// Writes a key with one bif and the given `(resref, type, id)` entries.
    fn write_key(path: &Path, bif_name: &str, entries: &[(&str, ResourceType, u32)]) {
        let name_offset = KEY_HEADER_SIZE + FILE_TABLE_ENTRY_SIZE;
        let key_offset = name_offset + bif_name.len();
        let mut out = Vec::new();
        out.extend_from_slice(b"KEY V1  ");
        out.write_u32::<LittleEndian>(1).unwrap();
        out.write_u32::<LittleEndian>(entries.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(KEY_HEADER_SIZE as u32).unwrap();
        out.write_u32::<LittleEndian>(key_offset as u32).unwrap();
        out.resize(KEY_HEADER_SIZE, 0);
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(name_offset as u32).unwrap();
        out.write_u16::<LittleEndian>(bif_name.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(1).unwrap();
        out.extend_from_slice(bif_name.as_bytes());
        for (name, ty, id) in entries {
            let mut resref = [0u8; 16];
            resref[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&resref);
            out.write_u16::<LittleEndian>(ty.0).unwrap();
            out.write_u32::<LittleEndian>(*id).unwrap();
        }
        std::fs::write(path, out).unwrap();
    }

    #[test]
    fn test_pack_id() {
        assert_eq!(pack_id(2, 7), (2 << 20) | 7);
        assert_eq!(unpack_id(pack_id(4095, 0xFFFFF)), (4095, 0xFFFFF));
    }

    #[test]
    fn test_key_bif_lookup() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        write_bif(&dir.path().join("data").join("base.bif"), &[b"zero", b"one"]);
        write_key(
            &dir.path().join("data").join("base.key"),
            "data\\base.bif",
            &[
                ("first", ResourceType::TXT, pack_id(0, 0)),
                ("second", ResourceType::TXT, pack_id(0, 1)),
            ],
        );

        let key = Key::open(&dir.path().join("data").join("base.key")).unwrap();
        assert_eq!(key.size(), 2);
        assert!(key.bif_paths()[0].ends_with("data/base.bif"));

        let k = key.find(Resource::new("second", ResourceType::TXT)).unwrap();
        assert_eq!(key.demand(k).bytes.as_slice(), b"one");
        assert_eq!(key.stat(k).unwrap().size, 3);
    }

    #[test]
    fn test_missing_bif_demands_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chitin.key");
        write_key(&path, "data\\gone.bif", &[("x", ResourceType::TXT, 0)]);
        let key = Key::open(&path).unwrap();
        let k = key.find(Resource::new("x", ResourceType::TXT)).unwrap();
        assert!(key.demand(k).is_empty());
        assert!(key.stat(k).is_none());
    }

    #[test]
    fn test_truncated_key_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.key");
        std::fs::write(&path, b"KEY V1  ").unwrap();
        assert!(!Key::new(&path).valid());
    }

    #[test]
    fn test_oversized_table_counts_are_rejected() {
        let dir = TempDir::new().unwrap();
        for (bif_count, key_count) in [(u32::MAX, 0), (0, u32::MAX)] {
            let path = dir.path().join("huge.key");
            let mut out = Vec::new();
            out.extend_from_slice(b"KEY V1  ");
            out.write_u32::<LittleEndian>(bif_count).unwrap();
            out.write_u32::<LittleEndian>(key_count).unwrap();
            out.write_u32::<LittleEndian>(KEY_HEADER_SIZE as u32).unwrap();
            out.write_u32::<LittleEndian>(KEY_HEADER_SIZE as u32).unwrap();
            out.resize(KEY_HEADER_SIZE, 0);
            std::fs::write(&path, out).unwrap();

            assert!(Key::open(&path).is_err());
            assert!(!Key::new(&path).valid());
        }
    }
}
