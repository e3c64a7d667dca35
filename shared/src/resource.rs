//! Resource identity and payloads.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::bytes::ByteArray;
use crate::resource_type::ResourceType;
use crate::resref::Resref;

/// A `(name, type)` pair identifying a resource.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Resource {
    pub resref: Resref,
    pub ty: ResourceType,
}

impl Resource {
    pub fn new(resref: impl Into<Resref>, ty: ResourceType) -> Self {
        Self {
            resref: resref.into(),
            ty,
        }
    }

    /// Parses `"name.ext"`. The result may be invalid; check [`Resource::valid`].
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((stem, ext)) => Self::new(Resref::new(stem), ResourceType::from_extension(ext)),
            None => Self::default(),
        }
    }

    /// Parses the final component of `path`.
    pub fn from_path(path: &Path) -> Self {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(Self::from_filename)
            .unwrap_or_default()
    }

    /// `"name.ext"`.
    pub fn filename(&self) -> String {
        format!("{}.{}", self.resref, self.ty.to_extension())
    }

    /// True if the name is non-empty and the type is known.
    pub fn valid(&self) -> bool {
        !self.resref.is_empty() && self.ty.is_valid()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({})", self.filename())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

/// A resource identity together with its payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceData {
    pub name: Resource,
    pub bytes: ByteArray,
}

impl ResourceData {
    pub fn new(name: Resource, bytes: ByteArray) -> Self {
        Self { name, bytes }
    }

    /// Loads a loose file, naming it after its filename.
    ///
    /// Read failures are logged and produce empty bytes.
    pub fn from_file(path: &Path) -> Self {
        let name = Resource::from_path(path);
        let bytes = match ByteArray::from_file(path) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(path = %path.display(), "failed to read resource: {e}");
                ByteArray::new()
            }
        };
        Self { name, bytes }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Metadata about a resource inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub name: Resource,
    pub size: usize,
    /// Modification time, seconds since the Unix epoch (0 if unknown)
    pub mtime: i64,
    /// Path of the owning container
    pub parent: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_roundtrip() {
        let r = Resource::from_filename("Foo.UTC");
        assert_eq!(r.resref.as_str(), "foo");
        assert_eq!(r.ty, ResourceType::UTC);
        assert_eq!(r.filename(), "foo.utc");
        assert!(r.valid());
        assert_eq!(r, Resource::new("foo", ResourceType::UTC));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!Resource::from_filename("noext").valid());
        assert!(!Resource::from_filename("foo.zzz").valid());
        assert!(!Resource::from_filename(".utc").valid());
        assert!(Resource::from_path(Path::new("/a/b/x.txt")).valid());
    }

    #[test]
    fn test_from_file_missing_is_empty() {
        let data = ResourceData::from_file(Path::new("/definitely/missing/x.txt"));
        assert!(data.is_empty());
        assert_eq!(data.name, Resource::new("x", ResourceType::TXT));
    }
}
