//! Owned byte buffer with bounded reads.

use std::io;
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// An owned, growable byte buffer.
///
/// All reads are bounds-checked and return `None`/`false` instead of
/// panicking on short buffers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ByteArray(Vec<u8>);

impl ByteArray {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Reads an entire file.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        std::fs::read(path).map(Self)
    }

    /// Copies `buf.len()` bytes starting at `offset`. Returns false if the
    /// range is out of bounds.
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> bool {
        match self.span(offset, buf.len()) {
            Some(src) => {
                buf.copy_from_slice(src);
                true
            }
            None => false,
        }
    }

    /// Reads a plain-old-data value at `offset`, in host byte order.
    pub fn read_pod<T: bytemuck::Pod>(&self, offset: usize) -> Option<T> {
        self.span(offset, std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
    }

    /// Borrows `len` bytes at `offset`.
    pub fn span(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.0.get(offset..end)
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    /// Views the buffer as UTF-8, if it is.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for ByteArray {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for ByteArray {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<&[u8]> for ByteArray {
    fn from(v: &[u8]) -> Self {
        Self(v.to_vec())
    }
}

impl From<&str> for ByteArray {
    fn from(v: &str) -> Self {
        Self(v.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for ByteArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ByteArray({} bytes)", self.0.len())
    }
}
