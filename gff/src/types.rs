//! On-disk layout: header, entries and the field type enum.
//!
//! Entries are plain `#[repr(C)]` records of little-endian `u32`s. Reads go
//! through [`ByteArray::read_pod`] followed by `from_le` on each word.

use bytemuck::{Pod, Zeroable};
use rollkit_shared::ByteArray;

pub const HEADER_SIZE: usize = 56;
pub const STRUCT_ENTRY_SIZE: usize = 12;
pub const FIELD_ENTRY_SIZE: usize = 12;
pub const LABEL_SIZE: usize = 16;

/// Struct id of the top-level struct.
pub const TOPLEVEL_STRUCT_ID: u32 = 0xFFFF_FFFF;

/// The closed set of field types, in on-disk code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum GffType {
    Byte = 0,
    Char = 1,
    Word = 2,
    Short = 3,
    Dword = 4,
    Int = 5,
    Dword64 = 6,
    Int64 = 7,
    Float = 8,
    Double = 9,
    String = 10,
    Resref = 11,
    LocString = 12,
    Void = 13,
    Struct = 14,
    List = 15,
}

const TYPES: [(GffType, &str); 16] = [
    (GffType::Byte, "byte"),
    (GffType::Char, "char"),
    (GffType::Word, "word"),
    (GffType::Short, "short"),
    (GffType::Dword, "dword"),
    (GffType::Int, "int"),
    (GffType::Dword64, "dword64"),
    (GffType::Int64, "int64"),
    (GffType::Float, "float"),
    (GffType::Double, "double"),
    (GffType::String, "cexostring"),
    (GffType::Resref, "resref"),
    (GffType::LocString, "cexolocstring"),
    (GffType::Void, "void"),
    (GffType::Struct, "struct"),
    (GffType::List, "list"),
];

impl GffType {
    pub fn from_code(code: u32) -> Option<Self> {
        TYPES.get(code as usize).map(|(ty, _)| *ty)
    }

    /// Type name used by the JSON bridge.
    pub fn name(self) -> &'static str {
        TYPES[self as usize].1
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TYPES.iter().find(|(_, n)| *n == name).map(|(ty, _)| *ty)
    }

    /// Size of a value stored directly in `data_or_offset`, if it is.
    pub fn inline_size(self) -> Option<usize> {
        match self {
            Self::Byte | Self::Char => Some(1),
            Self::Word | Self::Short => Some(2),
            Self::Dword | Self::Int | Self::Float => Some(4),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GffHeader {
    pub type_tag: [u8; 4],
    pub version: [u8; 4],
    pub struct_offset: u32,
    pub struct_count: u32,
    pub field_offset: u32,
    pub field_count: u32,
    pub label_offset: u32,
    pub label_count: u32,
    pub field_data_offset: u32,
    pub field_data_count: u32,
    pub field_idx_offset: u32,
    pub field_idx_count: u32,
    pub list_idx_offset: u32,
    pub list_idx_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct StructEntry {
    pub id: u32,
    /// Field index for single-field structs, otherwise a byte offset into
    /// the field-index array
    pub field_index: u32,
    pub field_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FieldEntry {
    pub ty: u32,
    pub label_index: u32,
    pub data_or_offset: u32,
}

/// A NUL-padded 16-byte label.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Label(pub [u8; LABEL_SIZE]);

impl Label {
    /// Returns `None` if `name` does not fit.
    pub fn new(name: &str) -> Option<Self> {
        if name.len() > LABEL_SIZE {
            return None;
        }
        let mut raw = [0u8; LABEL_SIZE];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        Some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(LABEL_SIZE);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }
}

/// Byte-order conversion for the `u32` words of an on-disk record.
pub trait LittleEndianWords: Pod {
    /// Converts every word between little-endian and host order.
    fn swap_words(self) -> Self;

    fn read(bytes: &ByteArray, offset: usize) -> Option<Self> {
        bytes.read_pod::<Self>(offset).map(Self::swap_words)
    }

    fn write(self, out: &mut Vec<u8>) {
        out.extend_from_slice(bytemuck::bytes_of(&self.swap_words()));
    }
}

impl LittleEndianWords for GffHeader {
    fn swap_words(self) -> Self {
        Self {
            type_tag: self.type_tag,
            version: self.version,
            struct_offset: u32::from_le(self.struct_offset),
            struct_count: u32::from_le(self.struct_count),
            field_offset: u32::from_le(self.field_offset),
            field_count: u32::from_le(self.field_count),
            label_offset: u32::from_le(self.label_offset),
            label_count: u32::from_le(self.label_count),
            field_data_offset: u32::from_le(self.field_data_offset),
            field_data_count: u32::from_le(self.field_data_count),
            field_idx_offset: u32::from_le(self.field_idx_offset),
            field_idx_count: u32::from_le(self.field_idx_count),
            list_idx_offset: u32::from_le(self.list_idx_offset),
            list_idx_count: u32::from_le(self.list_idx_count),
        }
    }
}

impl LittleEndianWords for StructEntry {
    fn swap_words(self) -> Self {
        Self {
            id: u32::from_le(self.id),
            field_index: u32::from_le(self.field_index),
            field_count: u32::from_le(self.field_count),
        }
    }
}

impl LittleEndianWords for FieldEntry {
    fn swap_words(self) -> Self {
        Self {
            ty: u32::from_le(self.ty),
            label_index: u32::from_le(self.label_index),
            data_or_offset: u32::from_le(self.data_or_offset),
        }
    }
}

impl LittleEndianWords for Label {
    fn swap_words(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(GffType::from_code(12), Some(GffType::LocString));
        assert_eq!(GffType::from_code(16), None);
        assert_eq!(GffType::LocString.name(), "cexolocstring");
        assert_eq!(GffType::from_name("dword64"), Some(GffType::Dword64));
        assert_eq!(GffType::from_name("qword"), None);
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<GffHeader>(), HEADER_SIZE);
        assert_eq!(std::mem::size_of::<StructEntry>(), STRUCT_ENTRY_SIZE);
        assert_eq!(std::mem::size_of::<FieldEntry>(), FIELD_ENTRY_SIZE);
        assert_eq!(std::mem::size_of::<Label>(), LABEL_SIZE);
    }

    #[test]
    fn test_label() {
        let label = Label::new("ClassList").unwrap();
        assert_eq!(label.as_str(), "ClassList");
        assert!(Label::new("SeventeenCharsXYZ").is_none());
        assert_eq!(Label::new("ExactlySixteen16").unwrap().as_str(), "ExactlySixteen16");
    }
}
