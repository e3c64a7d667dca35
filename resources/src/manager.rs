//! Layered resource manager.
//!
//! Containers are mounted into fixed layers. Search order, highest priority
//! first: custom > override > module haks > module > base. Within a layer,
//! containers keep insertion order and earlier ones win.
//!
//! [`ResourceManager::build_registry`] flattens every layer into one
//! identity map and freezes it. Lookups after the build are plain map reads.
//! Mounting base, override or custom containers requires an unfrozen
//! registry; module loads unfreeze and rebuild on their own.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use rollkit_shared::string::icmp;
use rollkit_shared::{Config, GameVersion, LanguageId, Resource, ResourceData, ResourceType, Resref};

use crate::container::{Container, ContainerKey};
use crate::directory::Directory;
use crate::erf::Erf;
use crate::locator::resolve_container;
use crate::nwsync::NWSync;
use crate::zipfile::Zip;

/// Source layer of a mounted container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Custom,
    Override,
    ModuleHak,
    Module,
    Base,
}

impl Layer {
    /// Every layer, highest priority first.
    pub const SEARCH_ORDER: [Layer; 5] = [
        Layer::Custom,
        Layer::Override,
        Layer::ModuleHak,
        Layer::Module,
        Layer::Base,
    ];
}

/// Palette texture layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteLayer {
    Skin,
    Hair,
    Metal1,
    Metal2,
    Cloth1,
    Cloth2,
    Leather1,
    Leather2,
    Tattoo1,
    Tattoo2,
}

impl PaletteLayer {
    pub const COUNT: usize = 10;

    /// Name of the palette image backing this layer.
    pub fn texture_name(self) -> &'static str {
        match self {
            Self::Skin => "pal_skin01",
            Self::Hair => "pal_hair01",
            Self::Metal1 => "pal_armor01",
            Self::Metal2 => "pal_armor02",
            Self::Cloth1 | Self::Cloth2 => "pal_cloth01",
            Self::Leather1 | Self::Leather2 => "pal_leath01",
            Self::Tattoo1 | Self::Tattoo2 => "pal_tattoo01",
        }
    }
}

struct Mounted {
    container: Box<dyn Container>,
    /// Only entries of this category are registered. `INVALID` accepts all.
    category: ResourceType,
}

impl Mounted {
    fn accepts(&self, ty: ResourceType) -> bool {
        self.category == ResourceType::INVALID || ResourceType::check_category(self.category, ty)
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    layer: Layer,
    index: usize,
    key: ContainerKey,
}

/// Aggregates containers and answers demand queries.
pub struct ResourceManager {
    install: Option<PathBuf>,
    user: Option<PathBuf>,
    version: GameVersion,

    custom: Vec<Mounted>,
    overrides: Vec<Mounted>,
    module_haks: Vec<Mounted>,
    module: Option<Mounted>,
    base: Vec<Mounted>,

    module_path: Option<PathBuf>,
    nwsync: Option<NWSync>,
    /// An NWSync manifest sits at the front of `module_haks`.
    manifest_mounted: bool,

    registry: HashMap<Resource, Slot>,
    frozen: bool,
    palette: [Option<ResourceData>; PaletteLayer::COUNT],
}

impl ResourceManager {
    /// Creates an empty manager. Nothing is mounted.
    pub fn new(config: &Config) -> Self {
        Self {
            install: config.paths.install.clone(),
            user: config.paths.user.clone(),
            version: config.game.version,
            custom: Vec::new(),
            overrides: Vec::new(),
            module_haks: Vec::new(),
            module: None,
            base: Vec::new(),
            module_path: None,
            nwsync: None,
            manifest_mounted: false,
            registry: HashMap::new(),
            frozen: false,
            palette: Default::default(),
        }
    }

    /// Creates a manager, mounts the install and user layout, and builds the
    /// registry.
    ///
    /// Missing directories and archives are skipped.
    pub fn initialize(config: &Config) -> Self {
        let mut rm = Self::new(config);
        tracing::info!(
            install = ?rm.install,
            user = ?rm.user,
            "resman: initializing"
        );

        if let Some(user) = rm.user.clone() {
            if rm.version == GameVersion::Ee {
                rm.try_add_override(&user, "development", ResourceType::INVALID);
            }
            rm.try_add_override(&user, "override", ResourceType::INVALID);
            rm.try_add_override(&user, "portraits", ResourceType::TEXTURE);
            if rm.version == GameVersion::Ee && config.resources.nwsync {
                let store = NWSync::new(&user.join("nwsync"));
                if store.is_loaded() {
                    rm.nwsync = Some(store);
                }
            }
        }

        if let Some(install) = rm.install.clone().filter(|_| config.resources.include_install) {
            match rm.version {
                GameVersion::Ee => {
                    let data = install.join("data");
                    rm.try_add_override(&data, "ovr", ResourceType::INVALID);
                    rm.try_add_override(&data, "prt", ResourceType::TEXTURE);
                    rm.try_add_base(&data, "amb", ResourceType::SOUND);
                    rm.try_add_base(&data, "mus", ResourceType::SOUND);
                    for pack in ["xp2_tex_tpa", "xp1_tex_tpa", "textures_tpa", "tiles_tpa"] {
                        rm.try_add_base(&data.join("txpk"), &format!("{pack}.erf"), ResourceType::INVALID);
                    }
                    let lang = config.language();
                    if lang != LanguageId::English {
                        let loc = install.join("lang").join(lang.short_name()).join("data");
                        rm.try_add_base(&loc, "nwn_base_loc.key", ResourceType::INVALID);
                    }
                    rm.try_add_base(&data, "nwn_base.key", ResourceType::INVALID);
                }
                GameVersion::V169 => {
                    let packs = install.join("texturepacks");
                    for pack in ["xp2_tex_tpa", "xp1_tex_tpa", "textures_tpa", "tiles_tpa"] {
                        rm.try_add_base(&packs, &format!("{pack}.erf"), ResourceType::INVALID);
                    }
                    for key in ["xp3patch", "xp3", "xp2patch", "xp2", "xp1patch", "xp1", "patch", "chitin"] {
                        rm.try_add_base(&install, &format!("{key}.key"), ResourceType::INVALID);
                    }
                }
            }
        }

        rm.build_registry();
        rm
    }

    fn try_add_override(&mut self, dir: &Path, name: &str, category: ResourceType) {
        if dir.join(name).exists() {
            self.add_override_container(dir, name, category);
        }
    }

    fn try_add_base(&mut self, dir: &Path, name: &str, category: ResourceType) {
        if dir.join(name).exists() {
            self.add_base_container(dir, name, category);
        }
    }

    fn layer(&self, layer: Layer) -> &[Mounted] {
        match layer {
            Layer::Custom => &self.custom,
            Layer::Override => &self.overrides,
            Layer::ModuleHak => &self.module_haks,
            Layer::Module => self.module.as_slice(),
            Layer::Base => &self.base,
        }
    }

    fn search(&self) -> impl Iterator<Item = (Layer, usize, &Mounted)> {
        Layer::SEARCH_ORDER
            .into_iter()
            .flat_map(move |layer| self.layer(layer).iter().enumerate().map(move |(i, m)| (layer, i, m)))
    }

    /// Every mounted container in search order.
    pub fn containers(&self) -> Vec<(Layer, &dyn Container)> {
        self.search().map(|(layer, _, m)| (layer, m.container.as_ref())).collect()
    }

    fn add_container(&mut self, layer: Layer, container: Box<dyn Container>, category: ResourceType) -> bool {
        if self.frozen {
            tracing::error!(
                path = %container.path().display(),
                "resman: registry is already frozen, unable to add container"
            );
            return false;
        }
        if !container.valid() {
            tracing::error!(path = %container.path().display(), "resman: attempting to add invalid container");
            return false;
        }
        if container.size() == 0 {
            tracing::error!(path = %container.path().display(), "resman: attempting to add empty container");
            return false;
        }
        if self.search().any(|(_, _, m)| m.container.path() == container.path()) {
            tracing::warn!(path = %container.path().display(), "resman: container already mounted");
            return false;
        }

        tracing::info!(path = %container.path().display(), ?layer, "resman: mounted");
        let mounted = Mounted { container, category };
        match layer {
            Layer::Custom => self.custom.push(mounted),
            Layer::Override => self.overrides.push(mounted),
            Layer::Base => self.base.push(mounted),
            Layer::ModuleHak | Layer::Module => unreachable!("module layers are mounted by load_module"),
        }
        true
    }

    /// Mounts container `name` under `dir` into the base layer.
    pub fn add_base_container(&mut self, dir: &Path, name: &str, category: ResourceType) -> bool {
        match resolve_container(dir, name) {
            Some(c) => self.add_container(Layer::Base, c, category),
            None => {
                tracing::error!(dir = %dir.display(), name, "resman: unable to resolve base container");
                false
            }
        }
    }

    /// Mounts container `name` under `dir` into the override layer.
    pub fn add_override_container(&mut self, dir: &Path, name: &str, category: ResourceType) -> bool {
        match resolve_container(dir, name) {
            Some(c) => self.add_container(Layer::Override, c, category),
            None => {
                tracing::error!(dir = %dir.display(), name, "resman: unable to resolve override container");
                false
            }
        }
    }

    /// Mounts an already opened container into the custom layer.
    pub fn add_custom_container(&mut self, container: Box<dyn Container>, category: ResourceType) -> bool {
        self.add_container(Layer::Custom, container, category)
    }

    /// Builds and freezes the registry.
    ///
    /// # Panics
    ///
    /// Panics if the registry is already frozen.
    pub fn build_registry(&mut self) {
        assert!(!self.frozen, "resource registry is already frozen");

        let mut registry = HashMap::with_capacity(self.search().map(|(_, _, m)| m.container.size()).sum());
        for (layer, index, mounted) in self.search() {
            mounted.container.visit(&mut |res, key| {
                if mounted.accepts(res.ty) {
                    registry.entry(res).or_insert(Slot { layer, index, key });
                }
            });
        }
        tracing::info!(count = registry.len(), "resman: registry built");
        self.registry = registry;
        self.frozen = true;
    }

    fn rebuild(&mut self) {
        self.frozen = false;
        self.registry.clear();
        self.palette = Default::default();
        self.build_registry();
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn contains(&self, res: Resource) -> bool {
        self.registry.contains_key(&res)
    }

    /// Payload of the highest-priority container holding `res`.
    ///
    /// A miss returns empty bytes.
    pub fn demand(&self, res: Resource) -> ResourceData {
        let Some(slot) = self.registry.get(&res) else {
            return ResourceData::default();
        };
        match self.layer(slot.layer).get(slot.index) {
            Some(m) => m.container.demand(slot.key),
            None => ResourceData::default(),
        }
    }

    /// Tries each type in order and returns the first non-empty payload.
    pub fn demand_in_order(&self, resref: Resref, types: &[ResourceType]) -> ResourceData {
        types
            .iter()
            .map(|&ty| self.demand(Resource::new(resref, ty)))
            .find(|data| !data.is_empty())
            .unwrap_or_default()
    }

    /// Payload of any registered resource named `resref`.
    ///
    /// When several types exist the lowest type code wins.
    pub fn demand_any(&self, resref: Resref) -> ResourceData {
        let found = self
            .registry
            .keys()
            .filter(|r| r.resref == resref)
            .min_by_key(|r| r.ty);
        match found {
            Some(&res) => self.demand(res),
            None => ResourceData::default(),
        }
    }

    /// Reads a character file from `<user>/servervault/<cdkey>/<resref>.bic`.
    pub fn demand_server_vault(&self, cdkey: &str, resref: &str) -> ResourceData {
        let Some(user) = &self.user else {
            return ResourceData::default();
        };
        let path = user
            .join("servervault")
            .join(cdkey)
            .join(Resource::new(Resref::new(resref), ResourceType::BIC).filename());
        if !path.exists() {
            return ResourceData::default();
        }
        ResourceData::from_file(&path)
    }

    /// Texture payload, preferring `dds` over `tga`.
    pub fn texture(&self, resref: Resref) -> ResourceData {
        self.demand_in_order(resref, &[ResourceType::DDS, ResourceType::TGA])
    }

    /// Palette image for `layer`, loaded on first use.
    ///
    /// Returns `None` when no container provides the image.
    pub fn palette_texture(&mut self, layer: PaletteLayer) -> Option<&ResourceData> {
        let slot = layer as usize;
        if self.palette[slot].is_none() {
            let data = self.demand(Resource::new(layer.texture_name(), ResourceType::TGA));
            if data.is_empty() {
                return None;
            }
            self.palette[slot] = Some(data);
        }
        self.palette[slot].as_ref()
    }

    /// Loads a module from a directory holding `module.ifo`, a `.mod`
    /// archive or a `.zip`, then rebuilds the registry.
    ///
    /// On failure the current state is left untouched.
    pub fn load_module(&mut self, path: &Path) -> bool {
        tracing::info!(path = %path.display(), "resman: loading module container");

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let container: Option<Box<dyn Container>> = if path.is_dir() && path.join("module.ifo").exists() {
            Some(Box::new(Directory::new(path)))
        } else if path.is_file() && icmp(ext, "mod") {
            Some(Box::new(Erf::new(path)))
        } else if path.is_file() && icmp(ext, "zip") {
            Some(Box::new(Zip::new(path)))
        } else {
            None
        };

        let container = match container {
            Some(c) if c.valid() => c,
            _ => {
                tracing::error!(path = %path.display(), "resman: failed to load module");
                return false;
            }
        };

        self.module = Some(Mounted {
            container,
            category: ResourceType::INVALID,
        });
        self.module_path = Some(path.to_path_buf());
        self.rebuild();
        true
    }

    /// Mounts the module's haks, replacing any previously loaded.
    ///
    /// Each name is looked up in `<user>/hak`, then `<install>/data/hak`,
    /// then `<install>/hak`. A hak that cannot be found or opened fails the
    /// whole load and leaves the current haks mounted.
    pub fn load_module_haks<S: AsRef<str>>(&mut self, names: &[S]) -> bool {
        let dirs: Vec<PathBuf> = [
            self.user.as_ref().map(|u| u.join("hak")),
            self.install.as_ref().map(|i| i.join("data").join("hak")),
            self.install.as_ref().map(|i| i.join("hak")),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut haks = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let found = dirs
                .iter()
                .filter(|d| d.join(format!("{name}.hak")).exists())
                .find_map(|d| resolve_container(d, &format!("{name}.hak")));
            match found {
                Some(c) if c.valid() => haks.push(Mounted {
                    container: c,
                    category: ResourceType::INVALID,
                }),
                _ => {
                    tracing::error!(hak = name, "resman: unable to load module hak");
                    return false;
                }
            }
        }

        let keep = usize::from(self.manifest_mounted);
        self.module_haks.truncate(keep);
        self.module_haks.extend(haks);
        tracing::info!(count = names.len(), "resman: loaded module haks");
        self.rebuild();
        true
    }

    /// Mounts one NWSync manifest above the module haks.
    pub fn load_nwsync_manifest(&mut self, sha1: &str) -> bool {
        let Some(manifest) = self.nwsync.as_ref().and_then(|s| s.manifest(sha1)) else {
            tracing::error!(manifest = sha1, "resman: nwsync manifest not available");
            return false;
        };
        let mounted = Mounted {
            container: Box::new(manifest),
            category: ResourceType::INVALID,
        };
        if self.manifest_mounted {
            self.module_haks[0] = mounted;
        } else {
            self.module_haks.insert(0, mounted);
            self.manifest_mounted = true;
        }
        self.rebuild();
        true
    }

    /// Unmounts the module, its haks and any NWSync manifest, then rebuilds.
    pub fn unload_module(&mut self) {
        tracing::info!(path = ?self.module_path, "resman: unloading module container");
        self.module_path = None;
        self.module = None;
        self.module_haks.clear();
        self.manifest_mounted = false;
        self.rebuild();
    }

    pub fn module_path(&self) -> Option<&Path> {
        self.module_path.as_deref()
    }

    pub fn nwsync(&self) -> Option<&NWSync> {
        self.nwsync.as_ref()
    }

    /// Calls `visitor` for every registered identity.
    pub fn visit(&self, mut visitor: impl FnMut(Resource)) {
        for &res in self.registry.keys() {
            visitor(res);
        }
    }

    /// Number of registered identities.
    pub fn size(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "name": "resource manager",
            "total_static_assets": self.registry.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erf::{ErfBuilder, ErfType};
    use tempfile::TempDir;

    fn write(dir: &Path, file: &str, bytes: &[u8]) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(file), bytes).unwrap();
    }

    fn manager(dir: &TempDir) -> ResourceManager {
        let mut config = Config::default();
        config.paths.user = Some(dir.path().join("user"));
        config.paths.install = Some(dir.path().join("install"));
        ResourceManager::new(&config)
    }

    #[test]
    fn test_layer_priority() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("base"), "x.txt", b"base");
        write(&dir.path().join("base"), "only_base.txt", b"b");
        write(&dir.path().join("ovr"), "x.txt", b"ovr");
        write(&dir.path().join("custom"), "x.txt", b"custom");

        let mut rm = manager(&dir);
        assert!(rm.add_base_container(dir.path(), "base", ResourceType::INVALID));
        assert!(rm.add_override_container(dir.path(), "ovr", ResourceType::INVALID));
        rm.build_registry();

        let x = Resource::new("x", ResourceType::TXT);
        assert_eq!(rm.demand(x).bytes.as_slice(), b"ovr");
        assert_eq!(rm.size(), 2);
        assert!(rm.contains(Resource::new("only_base", ResourceType::TXT)));
        assert!(rm.demand(Resource::new("missing", ResourceType::TXT)).is_empty());

        // Frozen: mounting fails.
        let custom = Box::new(Directory::new(&dir.path().join("custom")));
        assert!(!rm.add_custom_container(custom, ResourceType::INVALID));
    }

    #[test]
    fn test_rejects_duplicate_and_empty() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("base"), "x.txt", b"base");
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();

        let mut rm = manager(&dir);
        assert!(rm.add_base_container(dir.path(), "base", ResourceType::INVALID));
        assert!(!rm.add_override_container(dir.path(), "base", ResourceType::INVALID));
        assert!(!rm.add_base_container(dir.path(), "empty", ResourceType::INVALID));
        assert!(!rm.add_base_container(dir.path(), "missing", ResourceType::INVALID));
        assert_eq!(rm.containers().len(), 1);
    }

    #[test]
    fn test_category_filter() {
        let dir = TempDir::new().unwrap();
        let portraits = dir.path().join("portraits");
        write(&portraits, "po_elf.tga", b"tga");
        write(&portraits, "notes.txt", b"txt");

        let mut rm = manager(&dir);
        assert!(rm.add_override_container(dir.path(), "portraits", ResourceType::TEXTURE));
        rm.build_registry();
        assert!(rm.contains(Resource::new("po_elf", ResourceType::TGA)));
        assert!(!rm.contains(Resource::new("notes", ResourceType::TXT)));
    }

    #[test]
    #[should_panic(expected = "already frozen")]
    fn test_build_twice_panics() {
        let dir = TempDir::new().unwrap();
        let mut rm = manager(&dir);
        rm.build_registry();
        rm.build_registry();
    }

    #[test]
    fn test_demand_in_order_and_texture() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base");
        write(&base, "stone.tga", b"tga");
        write(&base, "grass.dds", b"dds");
        write(&base, "grass.tga", b"tga");

        let mut rm = manager(&dir);
        rm.add_base_container(dir.path(), "base", ResourceType::INVALID);
        rm.build_registry();

        assert_eq!(rm.texture(Resref::new("grass")).bytes.as_slice(), b"dds");
        assert_eq!(rm.texture(Resref::new("stone")).bytes.as_slice(), b"tga");
        assert!(rm.texture(Resref::new("water")).is_empty());
        // TGA (3) has a lower type code than DDS.
        assert_eq!(rm.demand_any(Resref::new("grass")).bytes.as_slice(), b"tga");
    }

    #[test]
    fn test_module_and_haks() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("base"), "door.utd", b"base door");
        write(&dir.path().join("base"), "wall.utp", b"base wall");

        let module_dir = dir.path().join("modules").join("test");
        write(&module_dir, "module.ifo", b"ifo");
        write(&module_dir, "door.utd", b"module door");

        let mut hak = ErfBuilder::new(ErfType::Hak);
        hak.add_bytes(Resource::new("door", ResourceType::UTD), b"hak door".to_vec())
            .unwrap();
        std::fs::create_dir_all(dir.path().join("user").join("hak")).unwrap();
        hak.write_to(&dir.path().join("user").join("hak").join("cep.hak"))
            .unwrap();

        let mut rm = manager(&dir);
        rm.add_base_container(dir.path(), "base", ResourceType::INVALID);
        rm.build_registry();
        let door = Resource::new("door", ResourceType::UTD);
        assert_eq!(rm.demand(door).bytes.as_slice(), b"base door");

        assert!(rm.load_module(&module_dir));
        assert_eq!(rm.module_path(), Some(module_dir.as_path()));
        assert_eq!(rm.demand(door).bytes.as_slice(), b"module door");

        assert!(!rm.load_module_haks(&["cep", "missing"]));
        assert_eq!(rm.demand(door).bytes.as_slice(), b"module door");

        assert!(rm.load_module_haks(&["cep"]));
        assert_eq!(rm.demand(door).bytes.as_slice(), b"hak door");
        assert_eq!(rm.demand(Resource::new("wall", ResourceType::UTP)).bytes.as_slice(), b"base wall");

        rm.unload_module();
        assert!(rm.module_path().is_none());
        assert_eq!(rm.demand(door).bytes.as_slice(), b"base door");
    }

    #[test]
    fn test_load_module_failure_keeps_state() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("base"), "door.utd", b"base door");
        let not_a_module = dir.path().join("plain");
        write(&not_a_module, "x.txt", b"x");

        let mut rm = manager(&dir);
        rm.add_base_container(dir.path(), "base", ResourceType::INVALID);
        rm.build_registry();
        assert!(!rm.load_module(&not_a_module));
        assert!(!rm.load_module(&dir.path().join("missing.mod")));
        assert!(rm.module_path().is_none());
        assert!(rm.is_frozen());
        assert_eq!(rm.size(), 1);
    }

    #[test]
    fn test_server_vault_and_stats() {
        let dir = TempDir::new().unwrap();
        let vault = dir.path().join("user").join("servervault").join("ABCD1234");
        write(&vault, "hero.bic", b"bic");

        let rm = manager(&dir);
        assert_eq!(rm.demand_server_vault("ABCD1234", "hero").bytes.as_slice(), b"bic");
        assert!(rm.demand_server_vault("ABCD1234", "nobody").is_empty());
        assert_eq!(rm.stats()["name"], "resource manager");
        assert_eq!(rm.stats()["total_static_assets"], 0);
    }

    #[test]
    fn test_palette_texture_cache() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("base"), "pal_cloth01.tga", b"cloth");

        let mut rm = manager(&dir);
        rm.add_base_container(dir.path(), "base", ResourceType::INVALID);
        rm.build_registry();
        assert_eq!(
            rm.palette_texture(PaletteLayer::Cloth2).map(|d| d.bytes.as_slice()),
            Some(&b"cloth"[..])
        );
        assert!(rm.palette_texture(PaletteLayer::Skin).is_none());
    }

    #[test]
    fn test_initialize_layout() {
        let dir = TempDir::new().unwrap();
        let install = dir.path().join("install");
        let user = dir.path().join("user");
        write(&install.join("data").join("ovr"), "x.txt", b"install ovr");
        write(&user.join("override"), "x.txt", b"user override");
        write(&user.join("development"), "y.txt", b"dev");

        let mut config = Config::default();
        config.paths.install = Some(install);
        config.paths.user = Some(user);
        let rm = ResourceManager::initialize(&config);

        assert!(rm.is_frozen());
        assert_eq!(rm.containers().len(), 3);
        assert_eq!(rm.demand(Resource::new("x", ResourceType::TXT)).bytes.as_slice(), b"user override");
        assert_eq!(rm.demand(Resource::new("y", ResourceType::TXT)).bytes.as_slice(), b"dev");
        assert!(rm.nwsync().is_none());
    }
}
