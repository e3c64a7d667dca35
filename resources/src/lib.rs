//! Resource containers and the layered resource manager.
//!
//! A [`Container`] maps resource identities to payloads. Providers exist for
//! plain directories, ERF archives (`.erf`, `.mod`, `.hak`, `.sav`), KEY/BIF
//! pairs, zip files and the NWSync content-addressed store.
//!
//! [`ResourceManager`] stacks containers into layers and builds a frozen
//! registry so that lookups after a build never touch more than one provider.

pub mod compression;
pub mod container;
pub mod directory;
pub mod erf;
pub mod error;
pub mod key;
pub mod locator;
pub mod manager;
pub mod nwsync;
pub mod zipfile;

pub use container::{Container, ContainerKey};
pub use directory::Directory;
pub use erf::{Erf, ErfBuilder, ErfType};
pub use error::{ContainerError, ErfWriteError};
pub use key::Key;
pub use locator::{open_container, resolve_container};
pub use manager::{Layer, PaletteLayer, ResourceManager};
pub use nwsync::{NWSync, NWSyncManifest};
pub use zipfile::Zip;
