//! GFF builder
//!
//! Trees are assembled top-down with [`GffBuilderStruct::add_field`],
//! [`GffBuilderStruct::add_struct`] and [`GffBuilderStruct::add_list`], then
//! linearized once by [`GffBuilder::build`]. Labels, field data and indices
//! are assigned during the build in depth-first preorder, so building the
//! same tree twice yields identical bytes.

mod serializer;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use rollkit_shared::resref::RESREF_MAX_LEN_EE;
use rollkit_shared::{ByteArray, LanguageId, LocString, Resref};

use crate::error::GffError;
use crate::types::{GffType, TOPLEVEL_STRUCT_ID};

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum GffValue {
    Byte(u8),
    Char(i8),
    Word(u16),
    Short(i16),
    Dword(u32),
    Int(i32),
    Dword64(u64),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Stored as written; length is checked at build time.
    Resref(String),
    LocString(LocString),
    Void(Vec<u8>),
}

impl GffValue {
    pub fn ty(&self) -> GffType {
        match self {
            Self::Byte(_) => GffType::Byte,
            Self::Char(_) => GffType::Char,
            Self::Word(_) => GffType::Word,
            Self::Short(_) => GffType::Short,
            Self::Dword(_) => GffType::Dword,
            Self::Int(_) => GffType::Int,
            Self::Dword64(_) => GffType::Dword64,
            Self::Int64(_) => GffType::Int64,
            Self::Float(_) => GffType::Float,
            Self::Double(_) => GffType::Double,
            Self::String(_) => GffType::String,
            Self::Resref(_) => GffType::Resref,
            Self::LocString(_) => GffType::LocString,
            Self::Void(_) => GffType::Void,
        }
    }
}

impl From<u8> for GffValue {
    fn from(v: u8) -> Self {
        Self::Byte(v)
    }
}

impl From<bool> for GffValue {
    fn from(v: bool) -> Self {
        Self::Byte(v as u8)
    }
}

impl From<i8> for GffValue {
    fn from(v: i8) -> Self {
        Self::Char(v)
    }
}

impl From<u16> for GffValue {
    fn from(v: u16) -> Self {
        Self::Word(v)
    }
}

impl From<i16> for GffValue {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<u32> for GffValue {
    fn from(v: u32) -> Self {
        Self::Dword(v)
    }
}

impl From<i32> for GffValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for GffValue {
    fn from(v: u64) -> Self {
        Self::Dword64(v)
    }
}

impl From<i64> for GffValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for GffValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for GffValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for GffValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for GffValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Resref> for GffValue {
    fn from(v: Resref) -> Self {
        Self::Resref(v.as_str().to_string())
    }
}

impl From<LocString> for GffValue {
    fn from(v: LocString) -> Self {
        Self::LocString(v)
    }
}

impl From<Vec<u8>> for GffValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Void(v)
    }
}

impl From<ByteArray> for GffValue {
    fn from(v: ByteArray) -> Self {
        Self::Void(v.into_vec())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Value(GffValue),
    Struct(GffBuilderStruct),
    List(GffBuilderList),
}

impl Node {
    fn ty(&self) -> GffType {
        match self {
            Node::Value(v) => v.ty(),
            Node::Struct(_) => GffType::Struct,
            Node::List(_) => GffType::List,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GffBuilderField {
    pub(crate) label: String,
    pub(crate) node: Node,
}

/// A struct under construction.
#[derive(Debug, Clone, Default)]
pub struct GffBuilderStruct {
    pub id: u32,
    pub(crate) fields: Vec<GffBuilderField>,
}

impl GffBuilderStruct {
    pub fn new(id: u32) -> Self {
        Self { id, fields: Vec::new() }
    }

    /// Appends a leaf field. Labels are not checked until build.
    pub fn add_field(&mut self, label: impl Into<String>, value: impl Into<GffValue>) -> &mut Self {
        self.push(label.into(), Node::Value(value.into()));
        self
    }

    /// Appends an empty list field and returns it.
    pub fn add_list(&mut self, label: impl Into<String>) -> &mut GffBuilderList {
        match &mut self.push(label.into(), Node::List(GffBuilderList::default())).node {
            Node::List(list) => list,
            _ => unreachable!(),
        }
    }

    /// Appends a nested struct field and returns it.
    pub fn add_struct(&mut self, label: impl Into<String>, id: u32) -> &mut GffBuilderStruct {
        match &mut self.push(label.into(), Node::Struct(GffBuilderStruct::new(id))).node {
            Node::Struct(s) => s,
            _ => unreachable!(),
        }
    }

    pub fn size(&self) -> usize {
        self.fields.len()
    }

    fn push(&mut self, label: String, node: Node) -> &mut GffBuilderField {
        self.fields.push(GffBuilderField { label, node });
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }
}

/// A list under construction.
#[derive(Debug, Clone, Default)]
pub struct GffBuilderList {
    pub(crate) structs: Vec<GffBuilderStruct>,
}

impl GffBuilderList {
    /// Appends an element struct and returns it.
    pub fn push_back(&mut self, id: u32) -> &mut GffBuilderStruct {
        self.structs.push(GffBuilderStruct::new(id));
        let last = self.structs.len() - 1;
        &mut self.structs[last]
    }

    pub fn size(&self) -> usize {
        self.structs.len()
    }
}

/// Builds a GFF buffer.
pub struct GffBuilder {
    pub top: GffBuilderStruct,
    type_tag: [u8; 4],
    version: [u8; 4],
    language: LanguageId,
    max_resref_len: usize,
    output: Option<ByteArray>,
}

impl GffBuilder {
    /// Creates a builder for file type `ty` (e.g. `"UTC"`).
    ///
    /// The tag is padded with spaces or truncated to four bytes.
    pub fn new(ty: &str) -> Self {
        Self {
            top: GffBuilderStruct::new(TOPLEVEL_STRUCT_ID),
            type_tag: pad4(ty),
            version: *b"V3.2",
            language: LanguageId::English,
            max_resref_len: RESREF_MAX_LEN_EE,
            output: None,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = pad4(version);
        self
    }

    /// Sets the code page used to encode `cexostring` fields.
    pub fn with_language(mut self, language: LanguageId) -> Self {
        self.language = language;
        self
    }

    pub fn with_max_resref_len(mut self, len: usize) -> Self {
        self.max_resref_len = len;
        self
    }

    /// Linearizes the tree.
    ///
    /// # Panics
    ///
    /// If the builder has already been built.
    pub fn build(&mut self) -> Result<(), GffError> {
        assert!(self.output.is_none(), "gff builder already built");
        let bytes = serializer::serialize(self)?;
        self.output = Some(ByteArray::from(bytes));
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.output.is_some()
    }

    /// The built buffer.
    ///
    /// # Panics
    ///
    /// If [`GffBuilder::build`] has not succeeded.
    pub fn to_bytes(&self) -> &ByteArray {
        match &self.output {
            Some(bytes) => bytes,
            None => panic!("gff builder not built"),
        }
    }

    /// Writes the built buffer to `path` via a temporary file in the same
    /// directory.
    pub fn write_to(&self, path: &Path) -> Result<(), GffError> {
        let bytes = self.to_bytes();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, bytes.as_slice())?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote gff");
        Ok(())
    }
}

fn pad4(s: &str) -> [u8; 4] {
    let mut out = *b"    ";
    for (dst, src) in out.iter_mut().zip(s.bytes()) {
        *dst = src;
    }
    out
}
