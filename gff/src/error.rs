//! Error types for record-tree reading, building and JSON conversion

use std::io;
use thiserror::Error;

/// Errors from reading or writing a GFF buffer
#[derive(Debug, Error)]
pub enum GffError {
    /// Buffer smaller than the fixed header
    #[error("buffer too small for gff header")]
    TooSmall,
    /// An array or index falls outside the buffer
    #[error("corrupt gff: {0}")]
    Corrupt(&'static str),
    /// Label longer than 16 bytes
    #[error("label '{0}' longer than 16 bytes")]
    LabelTooLong(String),
    /// Resref longer than the configured maximum
    #[error("invalid resref '{0}', too long")]
    ResrefTooLong(String),
    /// A count or offset does not fit in 32 bits
    #[error("gff too large for 32-bit offsets")]
    TooLarge,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from converting JSON into a record tree
#[derive(Debug, Error)]
pub enum JsonBridgeError {
    /// A node had the wrong JSON shape
    #[error("expected {expected} at '{at}'")]
    Expected { expected: &'static str, at: String },
    /// A field named a type outside the 16 GFF types
    #[error("unknown field type '{ty}' at '{at}'")]
    UnknownType { ty: String, at: String },
    /// A value does not fit its declared type
    #[error("value out of range for '{ty}' at '{at}'")]
    OutOfRange { ty: &'static str, at: String },
    #[error("invalid base64 at '{at}': {source}")]
    Base64 {
        at: String,
        source: base64::DecodeError,
    },
}
