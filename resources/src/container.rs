//! The container interface shared by every resource provider.

use std::path::Path;

use globset::Glob;
use rollkit_shared::{Resource, ResourceData, ResourceDescriptor};

/// Opaque per-container locator for one entry.
///
/// The meaning is provider specific: an entry index for most providers, a
/// packed `(bif, entry)` pair for KEY files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerKey(pub u64);

/// A provider of resources addressable by identity.
///
/// Providers do not cache payloads. `demand` never fails loudly: misses and I/O
/// errors are logged and produce empty bytes.
pub trait Container: Send + Sync {
    /// True if the container opened successfully.
    fn valid(&self) -> bool;

    /// Number of entries.
    fn size(&self) -> usize;

    /// Canonical path of the container.
    fn path(&self) -> &Path;

    /// Basename of [`Container::path`].
    fn name(&self) -> &str;

    /// Enumerates every entry. A provider may yield the same identity twice.
    fn visit(&self, visitor: &mut dyn FnMut(Resource, ContainerKey));

    /// Reads an entry's payload.
    fn demand(&self, key: ContainerKey) -> ResourceData;

    /// Entry metadata without reading the payload.
    fn stat(&self, key: ContainerKey) -> Option<ResourceDescriptor>;

    /// Finds the first entry with identity `res`.
    fn find(&self, res: Resource) -> Option<ContainerKey> {
        let mut found = None;
        self.visit(&mut |r, k| {
            if found.is_none() && r == res {
                found = Some(k);
            }
        });
        found
    }

    /// Writes every entry accepted by `filter` to `output` as `name.ext`.
    ///
    /// Returns the number of files written.
    fn extract(&self, filter: &dyn Fn(&Resource) -> bool, output: &Path) -> usize {
        if let Err(e) = std::fs::create_dir_all(output) {
            tracing::error!(path = %output.display(), "unable to create output directory: {e}");
            return 0;
        }

        let mut keys = Vec::new();
        self.visit(&mut |r, k| {
            if filter(&r) {
                keys.push(k);
            }
        });

        let mut count = 0;
        for key in keys {
            let data = self.demand(key);
            if data.is_empty() {
                continue;
            }
            let out = output.join(data.name.filename());
            match std::fs::write(&out, data.bytes.as_slice()) {
                Ok(()) => count += 1,
                Err(e) => tracing::error!(path = %out.display(), "failed to write resource: {e}"),
            }
        }
        count
    }

    /// Extracts entries whose `name.ext` matches a glob pattern.
    fn extract_by_glob(&self, pattern: &str, output: &Path) -> usize {
        let matcher = match Glob::new(pattern) {
            Ok(g) => g.compile_matcher(),
            Err(e) => {
                tracing::error!(pattern, "invalid glob: {e}");
                return 0;
            }
        };
        self.extract(&|r| matcher.is_match(r.filename()), output)
    }
}

/// Splits a path into its canonical form and basename.
pub(crate) fn canonical_name(path: &Path) -> std::io::Result<(std::path::PathBuf, String)> {
    let canonical = std::fs::canonicalize(path)?;
    let name = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((canonical, name))
}

/// Modification time of a file, in seconds since the Unix epoch.
pub(crate) fn mtime_of(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
