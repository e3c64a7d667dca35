//! Zip archives.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use rollkit_shared::resref::RESREF_MAX_LEN_EE;
use rollkit_shared::{ByteArray, Resource, ResourceData, ResourceDescriptor, ResourceType, Resref};
use zip::ZipArchive;

use crate::container::{Container, ContainerKey, canonical_name, mtime_of};
use crate::error::ContainerError;

/// Upper bound on the buffer reserved from an entry's declared size.
const PREALLOC_LIMIT: u64 = 16 * 1024 * 1024;

struct ZipEntry {
    name: Resource,
    index: usize,
    size: u64,
}

/// A zip archive. The central directory is read at open; entries are
/// decompressed on demand.
pub struct Zip {
    path: PathBuf,
    name: String,
    entries: Vec<ZipEntry>,
    valid: bool,
}

impl Zip {
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        Self::open_with_limit(path, RESREF_MAX_LEN_EE)
    }

    /// Opens an archive, skipping entries whose stem exceeds `max_resref_len`.
    pub fn open_with_limit(path: &Path, max_resref_len: usize) -> Result<Self, ContainerError> {
        if !path.exists() {
            return Err(ContainerError::NotFound(path.to_path_buf()));
        }
        let (canonical, name) = canonical_name(path)?;
        let mut archive = ZipArchive::new(File::open(&canonical)?)?;

        let mut entries = Vec::new();
        for index in 0..archive.len() {
            let file = archive.by_index_raw(index)?;
            if file.is_dir() {
                continue;
            }
            let full_name = file.name();
            let base = full_name.rsplit('/').next().unwrap_or(full_name);
            let Some((stem, ext)) = base.rsplit_once('.') else {
                continue;
            };
            if stem.len() > max_resref_len {
                tracing::info!(name = full_name, "zip: skipping, name longer than max resref");
                continue;
            }
            let res = Resource::new(Resref::with_limit(stem, max_resref_len), ResourceType::from_extension(ext));
            if res.valid() {
                entries.push(ZipEntry {
                    name: res,
                    index,
                    size: file.size(),
                });
            }
        }

        tracing::info!(path = %canonical.display(), count = entries.len(), "zip: loaded");
        Ok(Self {
            path: canonical,
            name,
            entries,
            valid: true,
        })
    }

    /// Opens an archive, producing an invalid container on failure.
    pub fn new(path: &Path) -> Self {
        Self::open(path).unwrap_or_else(|e| {
            tracing::error!(path = %path.display(), "unable to open zip: {e}");
            Self {
                path: path.to_path_buf(),
                name: String::new(),
                entries: Vec::new(),
                valid: false,
            }
        })
    }

    fn read(&self, entry: &ZipEntry) -> Result<Vec<u8>, ContainerError> {
        let mut archive = ZipArchive::new(File::open(&self.path)?)?;
        let mut file = archive.by_index(entry.index)?;
        let mut bytes = Vec::with_capacity(preallocation(entry.size));
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// The central directory size is untrusted; the buffer grows past the
/// limit as bytes actually arrive.
fn preallocation(declared: u64) -> usize {
    declared.min(PREALLOC_LIMIT) as usize
}

impl Container for Zip {
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
        match self.read(entry) {
            Ok(bytes) => ResourceData::new(entry.name, ByteArray::from(bytes)),
            Err(e) => {
                tracing::error!(path = %self.path.display(), index = entry.index, "zip: read failed: {e}");
                ResourceData::new(entry.name, ByteArray::new())
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        writer.add_directory("scripts/", options).unwrap();
        for (name, bytes) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_zip_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("module.zip");
        write_zip(
            &path,
            &[
                ("module.ifo", b"ifo"),
                ("scripts/main.nss", b"void main() {}"),
                ("README", b"no extension"),
                ("this_stem_is_far_too_long_for_any_resref_limit.nss", b"skip"),
            ],
        );

        let zip = Zip::open(&path).unwrap();
        assert_eq!(zip.size(), 2);
        let key = zip.find(Resource::new("main", ResourceType::NSS)).unwrap();
        assert_eq!(zip.demand(key).bytes.as_str(), Some("void main() {}"));
        assert_eq!(zip.stat(key).unwrap().size, 14);
    }

    #[test]
    fn test_resref_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.zip");
        write_zip(&path, &[("exactly_seventeen.txt", b"x"), ("short.txt", b"y")]);
        let zip = Zip::open_with_limit(&path, 16).unwrap();
        assert_eq!(zip.size(), 1);
    }

    #[test]
    fn test_declared_size_is_not_trusted() {
        assert_eq!(preallocation(14), 14);
        assert_eq!(preallocation(u64::MAX), PREALLOC_LIMIT as usize);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forged.zip");
        write_zip(&path, &[("main.nss", b"void main() {}")]);
        let mut bytes = std::fs::read(&path).unwrap();
        let central = bytes
            .windows(4)
            .rposition(|w| w == b"PK\x01\x02")
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let zip = Zip::open(&path).unwrap();
        let key = zip.find(Resource::new("main", ResourceType::NSS)).unwrap();
        assert_eq!(zip.stat(key).unwrap().size, 0xFFFF_FFF0);
        assert!(zip.demand(key).bytes.len() <= 14);
    }

    #[test]
    fn test_not_a_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.zip");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(!Zip::new(&path).valid());
    }
}
