//! Error types for container loading and archive writing

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when opening a container
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("'{}' does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("invalid header type '{0}'")]
    InvalidType(String),
    #[error("invalid version '{0}'")]
    InvalidVersion(String),
    /// A table or payload extends past the end of the file
    #[error("corrupt container: {0}")]
    Corrupt(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors that can occur when writing an ERF archive
#[derive(Debug, Error)]
pub enum ErfWriteError {
    #[error("invalid resource name '{0}'")]
    InvalidName(String),
    #[error("resref '{0}' does not fit in a 16 byte key")]
    ResrefTooLong(String),
    #[error("archive too large for 32-bit offsets")]
    TooLarge,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
