//! NWSync content-addressed store.
//!
//! A store directory holds a meta database and numbered shard databases:
//!
//! - meta: `manifest.sqlite3` or `nwsyncmeta.sqlite3` with tables
//!   `manifests(sha1)` (or `manifest`) and
//!   `manifest_resrefs(manifest_sha1, resref, restype, resref_sha1, created_at)`
//! - shards: `data_<i>.sqlite3` or `nwsyncdata_<i>.sqlite3` with
//!   `resrefs(sha1, data)`, where `data` is wrapped by [`crate::compression`]
//!
//! Each manifest is exposed as its own [`Container`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rollkit_shared::{ByteArray, Resource, ResourceData, ResourceDescriptor, ResourceType, Resref};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::compression::{NWSYNC_MAGIC, decompress};
use crate::container::{Container, ContainerKey, canonical_name};
use crate::error::ContainerError;

/// Database naming schemes: (meta file, shard file prefix).
const LAYOUTS: [(&str, &str); 2] = [
    ("manifest.sqlite3", "data_"),
    ("nwsyncmeta.sqlite3", "nwsyncdata_"),
];

struct Store {
    path: PathBuf,
    meta: Mutex<Connection>,
    shards: Vec<(PathBuf, Mutex<Connection>)>,
}

impl Store {
    /// Looks up a payload by content hash, scanning shards in order.
    fn fetch(&self, sha1: &str) -> ByteArray {
        for (path, shard) in &self.shards {
            let conn = shard.lock().unwrap_or_else(|e| e.into_inner());
            let row: Result<Option<Vec<u8>>, _> = conn
                .query_row("SELECT data FROM resrefs WHERE sha1 = ?1", params![sha1], |r| r.get(0))
                .optional();
            match row {
                Ok(Some(data)) => return decompress(&data, NWSYNC_MAGIC),
                Ok(None) => {}
                Err(e) => tracing::warn!(shard = %path.display(), "nwsync: shard query failed: {e}"),
            }
        }
        tracing::error!(sha1, "nwsync: content hash not found in any shard");
        ByteArray::new()
    }
}

fn open_read_only(path: &Path) -> Result<Connection, rusqlite::Error> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
}

/// An NWSync store directory.
pub struct NWSync {
    store: Option<Arc<Store>>,
    manifests: Vec<String>,
}

impl NWSync {
    /// Opens the meta database and every shard present.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        if !path.is_dir() {
            return Err(ContainerError::NotFound(path.to_path_buf()));
        }
        let path = std::fs::canonicalize(path)?;
        let Some((meta_name, shard_prefix)) = LAYOUTS
            .iter()
            .find(|(meta, _)| path.join(meta).exists())
            .copied()
        else {
            return Err(ContainerError::NotFound(path.join(LAYOUTS[0].0)));
        };

        let meta = open_read_only(&path.join(meta_name))?;
        let mut shards = Vec::new();
        for i in 0.. {
            let shard_path = path.join(format!("{shard_prefix}{i}.sqlite3"));
            if !shard_path.exists() {
                break;
            }
            match open_read_only(&shard_path) {
                Ok(conn) => shards.push((shard_path, Mutex::new(conn))),
                Err(e) => tracing::warn!(shard = %shard_path.display(), "nwsync: unable to open shard: {e}"),
            }
        }

        let table = manifest_table(&meta)?;
        let manifests = {
            let mut stmt = meta.prepare(&format!("SELECT sha1 FROM {table}"))?;
            let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        tracing::info!(
            path = %path.display(),
            manifests = manifests.len(),
            shards = shards.len(),
            "nwsync: loaded"
        );
        Ok(Self {
            store: Some(Arc::new(Store {
                path,
                meta: Mutex::new(meta),
                shards,
            })),
            manifests,
        })
    }

    /// Opens a store, producing an empty one on failure.
    pub fn new(path: &Path) -> Self {
        Self::open(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "unable to open nwsync store: {e}");
            Self {
                store: None,
                manifests: Vec::new(),
            }
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_some()
    }

    /// Content hashes of every manifest in the store.
    pub fn manifests(&self) -> &[String] {
        &self.manifests
    }

    pub fn shard_count(&self) -> usize {
        self.store.as_ref().map(|s| s.shards.len()).unwrap_or(0)
    }

    /// Opens one manifest as a container.
    pub fn manifest(&self, sha1: &str) -> Option<NWSyncManifest> {
        let store = self.store.as_ref()?;
        if !self.manifests.iter().any(|m| m == sha1) {
            return None;
        }
        match NWSyncManifest::load(Arc::clone(store), sha1) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::error!(manifest = sha1, "nwsync: unable to load manifest: {e}");
                None
            }
        }
    }
}

fn manifest_table(meta: &Connection) -> Result<&'static str, rusqlite::Error> {
    for table in ["manifests", "manifest"] {
        let exists: Option<String> = meta
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Ok(table);
        }
    }
    Err(rusqlite::Error::QueryReturnedNoRows)
}

struct ManifestEntry {
    name: Resource,
    sha1: String,
    created_at: i64,
}

/// One manifest of an NWSync store.
pub struct NWSyncManifest {
    store: Arc<Store>,
    path: PathBuf,
    name: String,
    entries: Vec<ManifestEntry>,
}

impl NWSyncManifest {
    fn load(store: Arc<Store>, sha1: &str) -> Result<Self, ContainerError> {
        let entries = {
            let meta = store.meta.lock().unwrap_or_else(|e| e.into_inner());
            let mut stmt = meta.prepare(
                "SELECT resref, restype, resref_sha1, created_at FROM manifest_resrefs WHERE manifest_sha1 = ?1",
            )?;
            let rows = stmt.query_map(params![sha1], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, u16>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<i64>>(3)?,
                ))
            })?;
            let mut entries = Vec::new();
            for row in rows {
                let (resref, restype, resref_sha1, created_at) = row?;
                let name = Resource::new(Resref::new(&resref), ResourceType(restype));
                if !name.valid() {
                    continue;
                }
                entries.push(ManifestEntry {
                    name,
                    sha1: resref_sha1,
                    created_at: created_at.unwrap_or(0),
                });
            }
            entries
        };

        let (path, _) = canonical_name(&store.path)?;
        Ok(Self {
            path: path.join(sha1),
            name: sha1.to_string(),
            store,
            entries,
        })
    }

    /// Content hash of this manifest.
    pub fn sha1(&self) -> &str {
        &self.name
    }
}

impl Container for NWSyncManifest {
    fn valid(&self) -> bool {
        true
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
            Some(e) => ResourceData::new(e.name, self.store.fetch(&e.sha1)),
            None => ResourceData::default(),
        }
    }

    fn stat(&self, key: ContainerKey) -> Option<ResourceDescriptor> {
        let e = self.entries.get(key.0 as usize)?;
        Some(ResourceDescriptor {
            name: e.name,
            // Only known after decompression.
            size: 0,
            mtime: e.created_at,
            parent: self.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{Algorithm, compress};
    use tempfile::TempDir;

    /// Builds a store with one manifest. `files` are (resref, type, payload);
    /// payloads alternate between shard 0 and shard 1.
    fn build_store(
        dir: &Path,
        meta_name: &str,
        shard_prefix: &str,
        table: &str,
        files: &[(&str, ResourceType, &[u8])],
    ) {
        let meta = Connection::open(dir.join(meta_name)).unwrap();
        meta.execute_batch(&format!(
            "CREATE TABLE {table} (sha1 TEXT PRIMARY KEY);
             CREATE TABLE manifest_resrefs (manifest_sha1 TEXT, resref TEXT, restype INTEGER,
                                            resref_sha1 TEXT, created_at INTEGER);"
        ))
        .unwrap();
        meta.execute(&format!("INSERT INTO {table} (sha1) VALUES ('abc123')"), [])
            .unwrap();

        let shards: Vec<Connection> = (0..2)
            .map(|i| {
                let c = Connection::open(dir.join(format!("{shard_prefix}{i}.sqlite3"))).unwrap();
                c.execute_batch("CREATE TABLE resrefs (sha1 TEXT PRIMARY KEY, data BLOB);")
                    .unwrap();
                c
            })
            .collect();

        for (i, (resref, ty, payload)) in files.iter().enumerate() {
            let hash = format!("hash{i}");
            meta.execute(
                "INSERT INTO manifest_resrefs VALUES ('abc123', ?1, ?2, ?3, 1700000000)",
                params![resref, ty.0, hash],
            )
            .unwrap();
            let wrapped = compress(payload, NWSYNC_MAGIC, Algorithm::Zstd).unwrap();
            shards[i % 2]
                .execute("INSERT INTO resrefs VALUES (?1, ?2)", params![hash, wrapped])
                .unwrap();
        }
    }

    #[test]
    fn test_manifest_demand() {
        let dir = TempDir::new().unwrap();
        build_store(
            dir.path(),
            "nwsyncmeta.sqlite3",
            "nwsyncdata_",
            "manifests",
            &[
                ("area01", ResourceType::ARE, b"area bytes"),
                ("tex01", ResourceType::DDS, b"texture bytes"),
            ],
        );

        let store = NWSync::open(dir.path()).unwrap();
        assert_eq!(store.manifests(), ["abc123".to_string()]);
        assert_eq!(store.shard_count(), 2);
        assert!(store.manifest("missing").is_none());

        let manifest = store.manifest("abc123").unwrap();
        assert_eq!(manifest.size(), 2);
        let key = manifest.find(Resource::new("tex01", ResourceType::DDS)).unwrap();
        assert_eq!(manifest.demand(key).bytes.as_slice(), b"texture bytes");
        assert_eq!(manifest.stat(key).unwrap().mtime, 1700000000);
    }

    #[test]
    fn test_alternate_layout_and_missing_shard_data() {
        let dir = TempDir::new().unwrap();
        build_store(
            dir.path(),
            "manifest.sqlite3",
            "data_",
            "manifest",
            &[("only", ResourceType::TXT, b"x")],
        );
        // Drop the payload table from the shard that held it.
        let shard = Connection::open(dir.path().join("data_0.sqlite3")).unwrap();
        shard.execute_batch("DROP TABLE resrefs;").unwrap();
        drop(shard);

        let store = NWSync::open(dir.path()).unwrap();
        let manifest = store.manifest("abc123").unwrap();
        let key = manifest.find(Resource::new("only", ResourceType::TXT)).unwrap();
        assert!(manifest.demand(key).is_empty());
    }

    #[test]
    fn test_missing_store() {
        let dir = TempDir::new().unwrap();
        assert!(NWSync::open(dir.path()).is_err());
        let store = NWSync::new(dir.path());
        assert!(!store.is_loaded());
        assert!(store.manifests().is_empty());
    }
}
