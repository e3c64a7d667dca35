//! Tree linearization

use byteorder::{LittleEndian, WriteBytesExt};
use hashbrown::HashMap;
use rollkit_shared::i18n::from_utf8_by_langid;
use rollkit_shared::string::desanitize_colors;
use rollkit_shared::{Language, LanguageId, LocString};

use super::{GffBuilder, GffBuilderList, GffBuilderStruct, GffValue, Node};
use crate::error::GffError;
use crate::types::{
    FIELD_ENTRY_SIZE, FieldEntry, GffHeader, HEADER_SIZE, LABEL_SIZE, Label, LittleEndianWords,
    STRUCT_ENTRY_SIZE, StructEntry,
};

/// Flat arrays accumulated during the walk.
struct Arrays {
    structs: Vec<StructEntry>,
    fields: Vec<FieldEntry>,
    labels: Vec<Label>,
    label_map: HashMap<String, u32>,
    data: Vec<u8>,
    field_indices: Vec<u32>,
    list_indices: Vec<u32>,
    language: LanguageId,
    max_resref_len: usize,
}

pub(super) fn serialize(builder: &GffBuilder) -> Result<Vec<u8>, GffError> {
    let mut arrays = Arrays {
        structs: Vec::new(),
        fields: Vec::new(),
        labels: Vec::new(),
        label_map: HashMap::new(),
        data: Vec::new(),
        field_indices: Vec::new(),
        list_indices: Vec::new(),
        language: builder.language,
        max_resref_len: builder.max_resref_len,
    };
    arrays.add_struct(&builder.top)?;
    arrays.finish(builder.type_tag, builder.version)
}

fn to_u32(n: usize) -> Result<u32, GffError> {
    u32::try_from(n).map_err(|_| GffError::TooLarge)
}

impl Arrays {
    /// Appends `s` and everything under it. Returns its struct index.
    fn add_struct(&mut self, s: &GffBuilderStruct) -> Result<u32, GffError> {
        let index = to_u32(self.structs.len())?;
        let count = to_u32(s.fields.len())?;
        self.structs.push(StructEntry {
            id: s.id,
            field_index: 0,
            field_count: count,
        });

        // Field entries of one struct are contiguous.
        let first = self.fields.len();
        for field in &s.fields {
            let label_index = self.label(&field.label)?;
            self.fields.push(FieldEntry {
                ty: field.node.ty() as u32,
                label_index,
                data_or_offset: 0,
            });
        }

        for (i, field) in s.fields.iter().enumerate() {
            let data = match &field.node {
                Node::Value(value) => self.add_value(value)?,
                Node::Struct(child) => self.add_struct(child)?,
                Node::List(list) => self.add_list(list)?,
            };
            self.fields[first + i].data_or_offset = data;
        }

        let field_index = if count == 1 {
            to_u32(first)?
        } else {
            let offset = to_u32(self.field_indices.len() * 4)?;
            for i in first..first + s.fields.len() {
                self.field_indices.push(to_u32(i)?);
            }
            offset
        };
        self.structs[index as usize].field_index = field_index;
        Ok(index)
    }

    /// Reserves the list's slots, then fills them as elements are added.
    fn add_list(&mut self, list: &GffBuilderList) -> Result<u32, GffError> {
        let offset = to_u32(self.list_indices.len() * 4)?;
        let start = self.list_indices.len() + 1;
        self.list_indices.push(to_u32(list.structs.len())?);
        self.list_indices.resize(start + list.structs.len(), 0);
        for (i, element) in list.structs.iter().enumerate() {
            self.list_indices[start + i] = self.add_struct(element)?;
        }
        Ok(offset)
    }

    fn label(&mut self, name: &str) -> Result<u32, GffError> {
        if let Some(&index) = self.label_map.get(name) {
            return Ok(index);
        }
        let label = Label::new(name).ok_or_else(|| GffError::LabelTooLong(name.to_string()))?;
        let index = to_u32(self.labels.len())?;
        self.labels.push(label);
        self.label_map.insert(name.to_string(), index);
        Ok(index)
    }

    /// Returns the inline value or the data offset of `value`.
    fn add_value(&mut self, value: &GffValue) -> Result<u32, GffError> {
        let inline = match *value {
            GffValue::Byte(v) => Some(v as u32),
            GffValue::Char(v) => Some(v as u8 as u32),
            GffValue::Word(v) => Some(v as u32),
            GffValue::Short(v) => Some(v as u16 as u32),
            GffValue::Dword(v) => Some(v),
            GffValue::Int(v) => Some(v as u32),
            GffValue::Float(v) => Some(v.to_bits()),
            _ => None,
        };
        if let Some(inline) = inline {
            return Ok(inline);
        }

        let offset = to_u32(self.data.len())?;
        match value {
            GffValue::Dword64(v) => self.data.write_u64::<LittleEndian>(*v)?,
            GffValue::Int64(v) => self.data.write_i64::<LittleEndian>(*v)?,
            GffValue::Double(v) => self.data.write_f64::<LittleEndian>(*v)?,
            GffValue::String(s) => {
                let bytes = desanitize_colors(from_utf8_by_langid(s, self.language));
                self.push_blob(&bytes)?;
            }
            GffValue::Resref(r) => {
                if r.len() > self.max_resref_len || r.len() > u8::MAX as usize {
                    return Err(GffError::ResrefTooLong(r.clone()));
                }
                self.data.push(r.len() as u8);
                self.data.extend_from_slice(r.as_bytes());
            }
            GffValue::LocString(loc) => self.push_locstring(loc)?,
            GffValue::Void(bytes) => self.push_blob(bytes)?,
            _ => unreachable!("inline values handled above"),
        }
        Ok(offset)
    }

    fn push_blob(&mut self, bytes: &[u8]) -> Result<(), GffError> {
        self.data.write_u32::<LittleEndian>(to_u32(bytes.len())?)?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    fn push_locstring(&mut self, loc: &LocString) -> Result<(), GffError> {
        let entries: Vec<(u32, Vec<u8>)> = loc
            .iter()
            .map(|(lang, text)| {
                let (base, _) = Language::to_base_id(lang);
                (lang, desanitize_colors(from_utf8_by_langid(text, base)))
            })
            .collect();
        let total = 8 + entries.iter().map(|(_, s)| 8 + s.len()).sum::<usize>();
        self.data.write_u32::<LittleEndian>(to_u32(total)?)?;
        self.data.write_u32::<LittleEndian>(loc.strref())?;
        self.data.write_u32::<LittleEndian>(to_u32(entries.len())?)?;
        for (lang, bytes) in &entries {
            self.data.write_u32::<LittleEndian>(*lang)?;
            self.push_blob(bytes)?;
        }
        Ok(())
    }

    fn finish(self, type_tag: [u8; 4], version: [u8; 4]) -> Result<Vec<u8>, GffError> {
        let struct_offset = HEADER_SIZE;
        let field_offset = struct_offset + self.structs.len() * STRUCT_ENTRY_SIZE;
        let label_offset = field_offset + self.fields.len() * FIELD_ENTRY_SIZE;
        let data_offset = label_offset + self.labels.len() * LABEL_SIZE;
        let field_idx_offset = data_offset + self.data.len();
        let list_idx_offset = field_idx_offset + self.field_indices.len() * 4;
        let total = list_idx_offset + self.list_indices.len() * 4;

        let head = GffHeader {
            type_tag,
            version,
            struct_offset: to_u32(struct_offset)?,
            struct_count: to_u32(self.structs.len())?,
            field_offset: to_u32(field_offset)?,
            field_count: to_u32(self.fields.len())?,
            label_offset: to_u32(label_offset)?,
            label_count: to_u32(self.labels.len())?,
            field_data_offset: to_u32(data_offset)?,
            field_data_count: to_u32(self.data.len())?,
            field_idx_offset: to_u32(field_idx_offset)?,
            field_idx_count: to_u32(self.field_indices.len() * 4)?,
            list_idx_offset: to_u32(list_idx_offset)?,
            list_idx_count: to_u32(self.list_indices.len() * 4)?,
        };
        to_u32(total)?;

        let mut out = Vec::with_capacity(total);
        head.write(&mut out);
        for entry in self.structs {
            entry.write(&mut out);
        }
        for entry in self.fields {
            entry.write(&mut out);
        }
        for label in self.labels {
            label.write(&mut out);
        }
        out.extend_from_slice(&self.data);
        for &index in self.field_indices.iter().chain(&self.list_indices) {
            out.write_u32::<LittleEndian>(index)?;
        }
        debug_assert_eq!(out.len(), total);
        Ok(out)
    }
}
