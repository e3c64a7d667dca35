use super::*;
use crate::builder::GffBuilder;

fn sample() -> ByteArray {
    let mut builder = GffBuilder::new("UTC");
    builder
        .top
        .add_field("Tag", "fred")
        .add_field("Gender", 1u8)
        .add_field("Age", 30i32);
    builder.top.add_list("ClassList").push_back(3).add_field("Class", 11i32);
    builder.build().unwrap();
    builder.to_bytes().clone()
}

fn patch_u32(bytes: &mut ByteArray, offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[test]
fn test_too_small() {
    let result = Gff::from_bytes(ByteArray::from(vec![0u8; 20]));
    assert!(matches!(result, Err(GffError::TooSmall)));
}

#[test]
fn test_truncated_buffer() {
    let mut bytes = sample().into_vec();
    bytes.pop();
    let result = Gff::from_bytes(ByteArray::from(bytes));
    assert!(matches!(result, Err(GffError::Corrupt(_))));
}

#[test]
fn test_no_structs() {
    let mut bytes = sample();
    // struct_count
    patch_u32(&mut bytes, 12, 0);
    assert!(matches!(Gff::from_bytes(bytes), Err(GffError::Corrupt(_))));
}

#[test]
fn test_unaligned_field_indices() {
    let mut bytes = sample();
    // field_idx_count
    patch_u32(&mut bytes, 44, 3);
    assert!(matches!(Gff::from_bytes(bytes), Err(GffError::Corrupt(_))));
}

#[test]
fn test_lenient_new() {
    let gff = Gff::new(ByteArray::from(vec![1u8, 2, 3]));
    assert!(!gff.valid());
    assert!(gff.toplevel().is_none());

    let gff = Gff::new(sample());
    assert!(gff.valid());
    assert_eq!(gff.type_tag(), "UTC ");
}

#[test]
fn test_case_insensitive_lookup() {
    let gff = Gff::from_bytes(sample()).unwrap();
    let top = gff.toplevel().unwrap();
    assert_eq!(top.size(), 4);
    assert!(top.has_field("TAG"));
    assert_eq!(top.get::<String>("tag").as_deref(), Some("fred"));
    assert!(!top.has_field("Missing"));

    let names: Vec<_> = top.fields().filter_map(|f| f.name()).collect();
    assert_eq!(names, ["Tag", "Gender", "Age", "ClassList"]);
}

#[test]
fn test_integer_promotion() {
    let gff = Gff::from_bytes(sample()).unwrap();
    let top = gff.toplevel().unwrap();

    // byte widens to any unsigned type
    assert_eq!(top.get::<u16>("Gender"), Some(1));
    assert_eq!(top.get::<u64>("Gender"), Some(1));
    assert_eq!(top.get::<i32>("Gender"), None);

    // int does not narrow or change sign
    assert_eq!(top.get::<i64>("Age"), Some(30));
    assert_eq!(top.get::<i16>("Age"), None);
    assert_eq!(top.get::<u32>("Age"), None);

    assert_eq!(top.get::<String>("Age"), None);
    assert_eq!(top.get::<i32>("Tag"), None);
}

#[test]
fn test_get_to_keeps_value_on_miss() {
    let gff = Gff::from_bytes(sample()).unwrap();
    let top = gff.toplevel().unwrap();

    let mut age = 0i32;
    assert!(top.get_to("Age", &mut age));
    assert_eq!(age, 30);

    let mut tag = String::from("unchanged");
    assert!(!top.get_to("Age", &mut tag));
    assert!(!top.get_to("Nope", &mut tag));
    assert_eq!(tag, "unchanged");
}

#[test]
fn test_list_access() {
    let gff = Gff::from_bytes(sample()).unwrap();
    let top = gff.toplevel().unwrap();
    let list = top.field("ClassList").unwrap();
    assert_eq!(list.ty(), Some(GffType::List));
    assert_eq!(list.size(), 1);

    let class = list.struct_at(0).unwrap();
    assert_eq!(class.id(), 3);
    assert_eq!(class.get::<i32>("Class"), Some(11));
    assert_eq!(list.structs().count(), 1);

    // non-list fields have no elements
    let tag = top.field("Tag").unwrap();
    assert_eq!(tag.size(), 0);
    assert!(tag.struct_at(0).is_none());
    assert!(tag.as_struct().is_none());
}

#[test]
fn test_bad_list_offset() {
    let mut bytes = sample();
    let head = GffHeader::read(&bytes, 0).unwrap();
    // ClassList is the fourth field of the top-level struct
    let entry = head.field_offset as usize + 3 * FIELD_ENTRY_SIZE;
    patch_u32(&mut bytes, entry + 8, 0x1000);

    let gff = Gff::from_bytes(bytes).unwrap();
    let list = gff.toplevel().unwrap().field("ClassList").unwrap();
    assert_eq!(list.size(), 0);
    assert!(list.struct_at(0).is_none());
}

#[test]
fn test_oversized_field_count() {
    let mut bytes = sample();
    let head = GffHeader::read(&bytes, 0).unwrap();
    // top-level field_count
    patch_u32(&mut bytes, head.struct_offset as usize + 8, 20_000_000);

    let gff = Gff::from_bytes(bytes).unwrap();
    let top = gff.toplevel().unwrap();
    assert_eq!(top.size(), 20_000_000);
    assert_eq!(top.fields().count(), 0);
    assert!(top.field("Tag").is_none());
    assert!(!top.has_field("Missing"));
    assert!(top.field_by_index(0).is_none());
}

#[test]
fn test_bad_string_length() {
    let mut bytes = sample();
    let head = GffHeader::read(&bytes, 0).unwrap();
    // Tag is the first value in field data
    patch_u32(&mut bytes, head.field_data_offset as usize, 0xFFFF);

    let gff = Gff::from_bytes(bytes).unwrap();
    assert_eq!(gff.toplevel().unwrap().get::<String>("Tag"), None);
}

#[test]
fn test_color_codes_sanitized() {
    let mut builder = GffBuilder::new("UTC");
    builder.top.add_field("FirstName", "<cFF0000>Red</c>");
    builder.build().unwrap();

    let bytes = builder.to_bytes();
    let raw = b"<c\xFF\x00\x00>Red</c>";
    assert!(bytes.windows(raw.len()).any(|w| w == raw));

    let gff = Gff::from_bytes(bytes.clone()).unwrap();
    let name: String = gff.toplevel().unwrap().get("FirstName").unwrap();
    assert_eq!(name, "<cFF0000>Red</c>");
}
