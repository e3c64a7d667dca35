//! GFF record trees.
//!
//! A GFF file is a header followed by six flat arrays: structs, fields,
//! 16-byte labels, packed field data, field indices and list indices.
//! [`Gff`] reads a buffer in place; [`GffBuilder`] linearizes a tree built
//! top-down into the same layout. [`json`] converts between the two and
//! `serde_json` values.

pub mod builder;
pub mod error;
pub mod json;
pub mod reader;
pub mod types;

pub use builder::{GffBuilder, GffBuilderList, GffBuilderStruct, GffValue};
pub use error::{GffError, JsonBridgeError};
pub use json::{gff_to_json, json_to_gff};
pub use reader::{FromGff, Gff, GffField, GffStruct};
pub use types::GffType;
