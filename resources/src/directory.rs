//! Loose files in a directory tree.

use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use rollkit_shared::{Resource, ResourceData, ResourceDescriptor};
use walkdir::WalkDir;

use crate::container::{Container, ContainerKey, canonical_name, mtime_of};
use crate::error::ContainerError;

struct DirectoryEntry {
    name: Resource,
    path: PathBuf,
}

/// A directory scanned recursively at open time.
///
/// Files whose names are not a valid `name.ext` are skipped. When two files
/// share an identity the first one in path order wins.
pub struct Directory {
    path: PathBuf,
    name: String,
    entries: Vec<DirectoryEntry>,
    valid: bool,
}

impl Directory {
    /// Opens a directory, failing if it does not exist.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        if !path.exists() {
            return Err(ContainerError::NotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(ContainerError::NotADirectory(path.to_path_buf()));
        }
        let (path, name) = canonical_name(path)?;

        let mut files: Vec<PathBuf> = WalkDir::new(&path)
            .into_iter()
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    tracing::warn!(path = %path.display(), "skipping unreadable entry: {err}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let name = Resource::from_path(&file);
            if !name.valid() {
                continue;
            }
            if !seen.insert(name) {
                tracing::warn!(path = %file.display(), "duplicate resource {name}, keeping first");
                continue;
            }
            entries.push(DirectoryEntry { name, path: file });
        }

        tracing::info!(path = %path.display(), count = entries.len(), "dir: loaded");
        Ok(Self {
            path,
            name,
            entries,
            valid: true,
        })
    }

    /// Opens a directory, producing an invalid container on failure.
    pub fn new(path: &Path) -> Self {
        Self::open(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "unable to open directory: {e}");
            Self {
                path: path.to_path_buf(),
                name: String::new(),
                entries: Vec::new(),
                valid: false,
            }
        })
    }
}

impl Container for Directory {
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
            Some(e) => ResourceData::from_file(&e.path),
            None => ResourceData::default(),
        }
    }

    fn stat(&self, key: ContainerKey) -> Option<ResourceDescriptor> {
        let e = self.entries.get(key.0 as usize)?;
        let size = std::fs::metadata(&e.path).map(|m| m.len() as usize).unwrap_or(0);
        Some(ResourceDescriptor {
            name: e.name,
            size,
            mtime: mtime_of(&e.path),
            parent: self.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_shared::ResourceType;

    #[test]
    fn test_scan_skips_invalid_and_duplicates() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "top").unwrap();
        std::fs::write(dir.path().join("sub").join("A.TXT"), "nested").unwrap();
        std::fs::write(dir.path().join("readme"), "no ext").unwrap();
        std::fs::write(dir.path().join("x.unknown"), "bad type").unwrap();

        let d = Directory::open(dir.path()).unwrap();
        assert!(d.valid());
        assert_eq!(d.size(), 1);

        let key = d.find(Resource::new("a", ResourceType::TXT)).unwrap();
        assert_eq!(d.demand(key).bytes.as_str(), Some("top"));
        let stat = d.stat(key).unwrap();
        assert_eq!(stat.size, 3);
        assert!(stat.mtime > 0);
    }

    #[test]
    fn test_missing_directory_is_invalid() {
        let d = Directory::new(Path::new("/definitely/not/here"));
        assert!(!d.valid());
        assert_eq!(d.size(), 0);
        assert!(d.demand(ContainerKey(0)).is_empty());
    }

    #[test]
    fn test_extract_by_glob() {
        let src = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        std::fs::write(src.path().join("one.nss"), "a").unwrap();
        std::fs::write(src.path().join("two.nss"), "b").unwrap();
        std::fs::write(src.path().join("three.txt"), "c").unwrap();

        let d = Directory::open(src.path()).unwrap();
        assert_eq!(d.extract_by_glob("*.nss", out.path()), 2);
        assert!(out.path().join("one.nss").exists());
        assert!(!out.path().join("three.txt").exists());
    }
}
