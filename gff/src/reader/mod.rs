//! GFF reader
//!
//! [`Gff`] validates the header and array bounds once, then reads entries in
//! place on access. Structs and fields are small `Copy` views borrowing the
//! reader.

use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use rollkit_shared::i18n::to_utf8_by_langid;
use rollkit_shared::string::{icmp, sanitize_colors};
use rollkit_shared::{ByteArray, Language, LanguageId, LocString, Resref};

use crate::error::GffError;
use crate::types::{
    FIELD_ENTRY_SIZE, FieldEntry, GffHeader, GffType, HEADER_SIZE, LABEL_SIZE, LittleEndianWords,
    STRUCT_ENTRY_SIZE, StructEntry,
};

#[cfg(test)]
mod tests;

/// A parsed GFF buffer.
pub struct Gff {
    bytes: ByteArray,
    head: GffHeader,
    language: LanguageId,
    valid: bool,
}

impl Gff {
    /// Parses a buffer, checking every array against its length.
    pub fn from_bytes(bytes: ByteArray) -> Result<Self, GffError> {
        let head = parse_header(&bytes)?;
        Ok(Self {
            bytes,
            head,
            language: LanguageId::English,
            valid: true,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, GffError> {
        Self::from_bytes(ByteArray::from_file(path)?)
    }

    /// Parses a buffer, producing an invalid reader on failure.
    pub fn new(bytes: ByteArray) -> Self {
        Self::from_bytes(bytes).unwrap_or_else(|e| {
            tracing::error!("corrupt gff: {e}");
            Self {
                bytes: ByteArray::new(),
                head: GffHeader::default(),
                language: LanguageId::English,
                valid: false,
            }
        })
    }

    /// Sets the code page used to decode `cexostring` fields.
    pub fn with_language(mut self, language: LanguageId) -> Self {
        self.language = language;
        self
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Four-character file type, e.g. `"UTC "`.
    pub fn type_tag(&self) -> &str {
        std::str::from_utf8(&self.head.type_tag).unwrap_or("")
    }

    pub fn version(&self) -> &str {
        std::str::from_utf8(&self.head.version).unwrap_or("")
    }

    pub fn header(&self) -> &GffHeader {
        &self.head
    }

    /// The top-level struct. `None` for an invalid reader.
    pub fn toplevel(&self) -> Option<GffStruct<'_>> {
        if !self.valid {
            return None;
        }
        self.struct_at(0)
    }

    fn struct_at(&self, index: u32) -> Option<GffStruct<'_>> {
        if index >= self.head.struct_count {
            tracing::error!(index, "gff: invalid struct index");
            return None;
        }
        let offset = self.head.struct_offset as usize + index as usize * STRUCT_ENTRY_SIZE;
        StructEntry::read(&self.bytes, offset).map(|entry| GffStruct { gff: self, entry })
    }

    fn field_at(&self, index: u32) -> Option<GffField<'_>> {
        if index >= self.head.field_count {
            tracing::error!(index, "gff: invalid field index");
            return None;
        }
        let offset = self.head.field_offset as usize + index as usize * FIELD_ENTRY_SIZE;
        FieldEntry::read(&self.bytes, offset).map(|entry| GffField { gff: self, entry })
    }

    fn label(&self, index: u32) -> Option<&str> {
        if index >= self.head.label_count {
            tracing::error!(index, "gff: invalid label index");
            return None;
        }
        let offset = self.head.label_offset as usize + index as usize * LABEL_SIZE;
        let raw = self.bytes.span(offset, LABEL_SIZE)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(LABEL_SIZE);
        std::str::from_utf8(&raw[..end]).ok()
    }

    fn field_index(&self, byte_offset: u32, i: u32) -> Option<u32> {
        self.index_word(self.head.field_idx_offset, byte_offset, i)
    }

    fn list_index(&self, byte_offset: u32, i: u32) -> Option<u32> {
        self.index_word(self.head.list_idx_offset, byte_offset, i)
    }

    fn index_word(&self, array_offset: u32, byte_offset: u32, i: u32) -> Option<u32> {
        let offset = array_offset as usize + byte_offset as usize + i as usize * 4;
        self.bytes.read_pod::<u32>(offset).map(u32::from_le)
    }

    /// Absolute position of a field-data offset.
    fn data_pos(&self, offset: u32) -> usize {
        self.head.field_data_offset as usize + offset as usize
    }

    fn read_u32(&self, pos: usize) -> Option<u32> {
        let mut word = self.bytes.get(pos..)?;
        word.read_u32::<LittleEndian>().ok()
    }
}

fn parse_header(bytes: &ByteArray) -> Result<GffHeader, GffError> {
    if bytes.len() < HEADER_SIZE {
        return Err(GffError::TooSmall);
    }
    let head = GffHeader::read(bytes, 0).ok_or(GffError::TooSmall)?;
    let len = bytes.len() as u64;
    let fits = |offset: u32, size: u64| (offset as u64).checked_add(size).is_some_and(|end| end <= len);

    if !fits(head.struct_offset, head.struct_count as u64 * STRUCT_ENTRY_SIZE as u64) {
        return Err(GffError::Corrupt("struct array out of bounds"));
    }
    if !fits(head.field_offset, head.field_count as u64 * FIELD_ENTRY_SIZE as u64) {
        return Err(GffError::Corrupt("field array out of bounds"));
    }
    if !fits(head.label_offset, head.label_count as u64 * LABEL_SIZE as u64) {
        return Err(GffError::Corrupt("label array out of bounds"));
    }
    if !fits(head.field_data_offset, head.field_data_count as u64) {
        return Err(GffError::Corrupt("field data out of bounds"));
    }
    if head.field_idx_count % 4 != 0 || !fits(head.field_idx_offset, head.field_idx_count as u64) {
        return Err(GffError::Corrupt("field indices out of bounds"));
    }
    // Files without lists place the list array at end of file.
    if head.list_idx_count % 4 != 0 || !fits(head.list_idx_offset, head.list_idx_count as u64) {
        return Err(GffError::Corrupt("list indices out of bounds"));
    }
    if head.struct_count == 0 {
        return Err(GffError::Corrupt("no top-level struct"));
    }
    Ok(head)
}

/// A struct view.
#[derive(Clone, Copy)]
pub struct GffStruct<'a> {
    gff: &'a Gff,
    entry: StructEntry,
}

impl<'a> GffStruct<'a> {
    /// Struct id (`0xFFFFFFFF` for the top level).
    pub fn id(&self) -> u32 {
        self.entry.id
    }

    /// Number of fields.
    pub fn size(&self) -> usize {
        self.entry.field_count as usize
    }

    pub fn field_by_index(&self, index: usize) -> Option<GffField<'a>> {
        let count = self.entry.field_count;
        if index >= count as usize {
            tracing::error!(index, count, "gff: struct field index out of range");
            return None;
        }
        if !self.fields_in_bounds() {
            let offset = self.entry.field_index;
            tracing::error!(offset, count, "gff: struct field indices out of range");
            return None;
        }
        if count == 1 {
            return self.gff.field_at(self.entry.field_index);
        }
        let field = self.gff.field_index(self.entry.field_index, index as u32)?;
        self.gff.field_at(field)
    }

    /// Whether every field this struct claims lies inside the field or
    /// field-index array.
    fn fields_in_bounds(&self) -> bool {
        let head = &self.gff.head;
        let StructEntry { field_index, field_count, .. } = self.entry;
        match field_count {
            0 => true,
            1 => field_index < head.field_count,
            _ => {
                field_index % 4 == 0
                    && field_index as u64 / 4 + field_count as u64 <= head.field_idx_count as u64 / 4
            }
        }
    }

    /// Looks up a field by label, ignoring case.
    pub fn field(&self, label: &str) -> Option<GffField<'a>> {
        self.fields().find(|f| f.name().is_some_and(|n| icmp(n, label)))
    }

    pub fn has_field(&self, label: &str) -> bool {
        self.field(label).is_some()
    }

    /// Every readable field in order.
    pub fn fields(&self) -> impl Iterator<Item = GffField<'a>> + 'a {
        let this = *self;
        let count = if self.fields_in_bounds() {
            self.size()
        } else {
            tracing::error!(
                offset = self.entry.field_index,
                count = self.entry.field_count,
                "gff: struct field indices out of range"
            );
            0
        };
        (0..count).filter_map(move |i| this.field_by_index(i))
    }

    /// Reads field `label` as `T`.
    pub fn get<T: FromGff>(&self, label: &str) -> Option<T> {
        self.field(label)?.get()
    }

    /// Reads field `label` into `out`. Returns false, leaving `out` untouched,
    /// if the field is missing or of another type.
    pub fn get_to<T: FromGff>(&self, label: &str, out: &mut T) -> bool {
        match self.get(label) {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }
}

/// A field view.
#[derive(Clone, Copy)]
pub struct GffField<'a> {
    gff: &'a Gff,
    entry: FieldEntry,
}

impl<'a> GffField<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.gff.label(self.entry.label_index)
    }

    pub fn ty(&self) -> Option<GffType> {
        GffType::from_code(self.entry.ty)
    }

    /// Element count for lists, zero for everything else.
    pub fn size(&self) -> usize {
        if self.ty() != Some(GffType::List) {
            return 0;
        }
        self.list_header().map(|(_, size)| size as usize).unwrap_or(0)
    }

    /// Returns `(byte offset, element count)` after validating the slice.
    fn list_header(&self) -> Option<(u32, u32)> {
        let head = &self.gff.head;
        let offset = self.entry.data_or_offset;
        if offset % 4 != 0 || offset as u64 + 4 > head.list_idx_count as u64 {
            tracing::error!(offset, "gff: invalid list offset");
            return None;
        }
        let size = self.gff.list_index(offset, 0)?;
        if (offset / 4) as u64 + size as u64 >= head.list_idx_count as u64 / 4 {
            tracing::error!(offset, size, "gff: list runs past list indices");
            return None;
        }
        Some((offset, size))
    }

    /// List element `index`.
    pub fn struct_at(&self, index: usize) -> Option<GffStruct<'a>> {
        if self.ty() != Some(GffType::List) {
            return None;
        }
        let (offset, size) = self.list_header()?;
        if index >= size as usize {
            return None;
        }
        let element = self.gff.list_index(offset, index as u32 + 1)?;
        self.gff.struct_at(element)
    }

    /// Iterates list elements.
    pub fn structs(&self) -> impl Iterator<Item = GffStruct<'a>> + 'a {
        let this = *self;
        (0..self.size()).filter_map(move |i| this.struct_at(i))
    }

    /// Reads the value as `T`.
    pub fn get<T: FromGff>(&self) -> Option<T> {
        let value = T::from_field(self);
        if value.is_none() {
            tracing::debug!(
                field = self.name().unwrap_or(""),
                ty = ?self.ty(),
                "gff: field does not convert to requested type"
            );
        }
        value
    }

    fn inline_bytes(&self) -> [u8; 4] {
        self.entry.data_or_offset.to_le_bytes()
    }

    fn data_u64(&self) -> Option<u64> {
        let pos = self.gff.data_pos(self.entry.data_or_offset);
        let mut word = self.gff.bytes.get(pos..)?;
        word.read_u64::<LittleEndian>().ok()
    }

    /// Length-prefixed bytes in the data region.
    fn data_blob(&self, pos: usize) -> Option<&'a [u8]> {
        let len = self.gff.read_u32(pos)? as usize;
        self.blob_at(pos + 4, len)
    }

    fn blob_at(&self, pos: usize, len: usize) -> Option<&'a [u8]> {
        let head = &self.gff.head;
        let data_end = head.field_data_offset as usize + head.field_data_count as usize;
        match pos.checked_add(len) {
            Some(end) if end <= data_end => self.gff.bytes.span(pos, len),
            _ => {
                tracing::error!(pos, len, "gff: field data out of bounds");
                None
            }
        }
    }

    /// Raw bytes of a `resref` field, case preserved.
    pub(crate) fn resref_bytes(&self) -> Option<&'a [u8]> {
        let pos = self.gff.data_pos(self.entry.data_or_offset);
        let len = *self.gff.bytes.get(pos)? as usize;
        self.blob_at(pos + 1, len)
    }

    fn unsigned(&self, max_width: usize) -> Option<u64> {
        let raw = self.inline_bytes();
        match self.ty()? {
            GffType::Byte => Some(raw[0] as u64),
            GffType::Word if max_width >= 2 => Some(u16::from_le_bytes([raw[0], raw[1]]) as u64),
            GffType::Dword if max_width >= 4 => Some(self.entry.data_or_offset as u64),
            GffType::Dword64 if max_width >= 8 => self.data_u64(),
            _ => None,
        }
    }

    fn signed(&self, max_width: usize) -> Option<i64> {
        let raw = self.inline_bytes();
        match self.ty()? {
            GffType::Char => Some(raw[0] as i8 as i64),
            GffType::Short if max_width >= 2 => Some(i16::from_le_bytes([raw[0], raw[1]]) as i64),
            GffType::Int if max_width >= 4 => Some(self.entry.data_or_offset as i32 as i64),
            GffType::Int64 if max_width >= 8 => self.data_u64().map(|v| v as i64),
            _ => None,
        }
    }
}

/// Types readable from a field.
///
/// Integers accept any stored width up to their own with the same
/// signedness. Everything else requires an exact type match.
pub trait FromGff: Sized {
    fn from_field(field: &GffField<'_>) -> Option<Self>;
}

impl FromGff for u8 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        field.unsigned(1).map(|v| v as u8)
    }
}

impl FromGff for u16 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        field.unsigned(2).map(|v| v as u16)
    }
}

impl FromGff for u32 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        field.unsigned(4).map(|v| v as u32)
    }
}

impl FromGff for u64 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        field.unsigned(8)
    }
}

impl FromGff for i8 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        field.signed(1).map(|v| v as i8)
    }
}

impl FromGff for i16 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        field.signed(2).map(|v| v as i16)
    }
}

impl FromGff for i32 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        field.signed(4).map(|v| v as i32)
    }
}

impl FromGff for i64 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        field.signed(8)
    }
}

impl FromGff for bool {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        match field.ty()? {
            GffType::Byte => Some(field.inline_bytes()[0] != 0),
            _ => None,
        }
    }
}

impl FromGff for f32 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        match field.ty()? {
            GffType::Float => Some(f32::from_bits(field.entry.data_or_offset)),
            _ => None,
        }
    }
}

impl FromGff for f64 {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        match field.ty()? {
            GffType::Double => field.data_u64().map(f64::from_bits),
            _ => None,
        }
    }
}

impl FromGff for String {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        if field.ty()? != GffType::String {
            return None;
        }
        let raw = field.data_blob(field.gff.data_pos(field.entry.data_or_offset))?;
        let text = sanitize_colors(raw.to_vec());
        Some(to_utf8_by_langid(&text, field.gff.language))
    }
}

impl FromGff for Resref {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        if field.ty()? != GffType::Resref {
            return None;
        }
        let raw = field.resref_bytes()?;
        Some(Resref::new(&String::from_utf8_lossy(raw)))
    }
}

impl FromGff for LocString {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        if field.ty()? != GffType::LocString {
            return None;
        }
        let gff = field.gff;
        let mut pos = gff.data_pos(field.entry.data_or_offset);
        let mut header = gff.bytes.get(pos..)?;
        let _total = header.read_u32::<LittleEndian>().ok()?;
        let strref = header.read_u32::<LittleEndian>().ok()?;
        let count = header.read_u32::<LittleEndian>().ok()?;
        pos += 12;

        let mut result = LocString::new(strref);
        for _ in 0..count {
            let lang = gff.read_u32(pos)?;
            let raw = field.data_blob(pos + 4)?;
            pos += 8 + raw.len();
            let (base, feminine) = Language::to_base_id(lang);
            let text = to_utf8_by_langid(&sanitize_colors(raw.to_vec()), base);
            if !result.add(base, text, feminine) {
                tracing::warn!(lang, "gff: skipping locstring entry with unknown language");
            }
        }
        Some(result)
    }
}

impl FromGff for ByteArray {
    fn from_field(field: &GffField<'_>) -> Option<Self> {
        if field.ty()? != GffType::Void {
            return None;
        }
        field
            .data_blob(field.gff.data_pos(field.entry.data_or_offset))
            .map(ByteArray::from)
    }
}

impl<'a> GffField<'a> {
    /// The nested struct of a `struct` field.
    pub fn as_struct(&self) -> Option<GffStruct<'a>> {
        match self.ty()? {
            GffType::Struct => self.gff.struct_at(self.entry.data_or_offset),
            _ => None,
        }
    }
}
