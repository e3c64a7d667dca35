//! Shared types for rollkit.
//!
//! Everything here is a leaf: the resource-locator pipeline, the record-tree
//! codec and the script toolchain all build on these types.
//!
//! - [`interner`]: process-wide interned names
//! - [`resref`] / [`resource_type`] / [`resource`]: resource identities
//! - [`bytes`]: owned byte buffer with bounded reads
//! - [`i18n`]: languages, localized strings and legacy code pages
//! - [`string`]: small text helpers (color codes, case-insensitive compare)
//! - [`config`]: read-only process configuration

pub mod bytes;
pub mod config;
pub mod i18n;
pub mod interner;
pub mod resource;
pub mod resource_type;
pub mod resref;
pub mod string;

pub use bytes::ByteArray;
pub use config::{Config, ConfigError, GameVersion};
pub use i18n::{Language, LanguageId, LocString};
pub use interner::InternedString;
pub use resource::{Resource, ResourceData, ResourceDescriptor};
pub use resource_type::ResourceType;
pub use resref::Resref;
