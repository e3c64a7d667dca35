//! Container path resolution.
//!
//! Maps a filesystem path onto the provider that can read it.

use std::path::{Path, PathBuf};

use rollkit_shared::string::icmp;

use crate::container::Container;
use crate::directory::Directory;
use crate::erf::Erf;
use crate::key::Key;
use crate::zipfile::Zip;

/// Extensions tried, in order, when a container is named without one.
const CONTAINER_EXTENSIONS: [&str; 4] = ["hak", "erf", "zip", "key"];

/// Opens the provider matching `path`.
///
/// Directories become [`Directory`], `.erf`/`.mod`/`.hak`/`.sav` become
/// [`Erf`], `.key` becomes [`Key`] and `.zip` becomes [`Zip`]. Returns `None`
/// for missing paths and unknown extensions. The returned container may be
/// invalid; check [`Container::valid`].
pub fn open_container(path: &Path) -> Option<Box<dyn Container>> {
    if !path.exists() {
        tracing::error!(path = %path.display(), "path does not exist");
        return None;
    }
    if path.is_dir() {
        return Some(Box::new(Directory::new(path)));
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ["erf", "mod", "hak", "sav"].iter().any(|e| icmp(ext, e)) {
        Some(Box::new(Erf::new(path)))
    } else if icmp(ext, "key") {
        Some(Box::new(Key::new(path)))
    } else if icmp(ext, "zip") {
        Some(Box::new(Zip::new(path)))
    } else {
        tracing::debug!(path = %path.display(), "not a container");
        None
    }
}

/// Finds the path of container `name` under `dir`.
///
/// `dir/name` is used when it exists; otherwise `name` is tried with each of
/// the `hak`, `erf`, `zip` and `key` extensions.
pub fn find_container(dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = dir.join(name);
    if direct.exists() {
        return Some(direct);
    }
    CONTAINER_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|p| p.exists())
}

/// Resolves and opens container `name` under `dir`.
pub fn resolve_container(dir: &Path, name: &str) -> Option<Box<dyn Container>> {
    open_container(&find_container(dir, name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erf::{ErfBuilder, ErfType};
    use rollkit_shared::{Resource, ResourceType};
    use tempfile::TempDir;

    #[test]
    fn test_dispatch() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("override");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("a.txt"), "a").unwrap();

        let mut builder = ErfBuilder::new(ErfType::Hak);
        builder
            .add_bytes(Resource::new("b", ResourceType::TXT), b"b".to_vec())
            .unwrap();
        builder.write_to(&dir.path().join("cep.hak")).unwrap();

        let c = resolve_container(dir.path(), "override").unwrap();
        assert!(c.valid());
        assert_eq!(c.name(), "override");

        let c = resolve_container(dir.path(), "cep").unwrap();
        assert!(c.valid());
        assert_eq!(c.name(), "cep.hak");
        assert_eq!(c.size(), 1);

        assert!(resolve_container(dir.path(), "missing").is_none());
    }

    #[test]
    fn test_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "x").unwrap();
        assert!(open_container(&path).is_none());
    }
}
