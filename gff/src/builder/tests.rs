use super::*;
use crate::reader::Gff;
use crate::types::{GffHeader, LittleEndianWords};

fn built(builder: &mut GffBuilder) -> Gff {
    builder.build().unwrap();
    Gff::from_bytes(builder.to_bytes().clone()).unwrap()
}

#[test]
fn test_empty_toplevel() {
    let mut builder = GffBuilder::new("IFO");
    let gff = built(&mut builder);
    assert_eq!(gff.type_tag(), "IFO ");
    assert_eq!(gff.version(), "V3.2");
    let top = gff.toplevel().unwrap();
    assert_eq!(top.id(), TOPLEVEL_STRUCT_ID);
    assert_eq!(top.size(), 0);
    assert_eq!(builder.to_bytes().len(), crate::types::HEADER_SIZE + 12);
}

#[test]
fn test_scalar_fields() {
    let mut builder = GffBuilder::new("UTI");
    builder
        .top
        .add_field("Byte", 200u8)
        .add_field("Char", -5i8)
        .add_field("Word", 60000u16)
        .add_field("Short", -1234i16)
        .add_field("Dword", 4_000_000_000u32)
        .add_field("Int", -42i32)
        .add_field("Dword64", u64::MAX - 1)
        .add_field("Int64", i64::MIN + 7)
        .add_field("Float", 1.5f32)
        .add_field("Double", -2.25f64)
        .add_field("Plot", true);
    let gff = built(&mut builder);
    let top = gff.toplevel().unwrap();

    assert_eq!(top.get::<u8>("Byte"), Some(200));
    assert_eq!(top.get::<i8>("Char"), Some(-5));
    assert_eq!(top.get::<u16>("Word"), Some(60000));
    assert_eq!(top.get::<i16>("Short"), Some(-1234));
    assert_eq!(top.get::<u32>("Dword"), Some(4_000_000_000));
    assert_eq!(top.get::<i32>("Int"), Some(-42));
    assert_eq!(top.get::<u64>("Dword64"), Some(u64::MAX - 1));
    assert_eq!(top.get::<i64>("Int64"), Some(i64::MIN + 7));
    assert_eq!(top.get::<f32>("Float"), Some(1.5));
    assert_eq!(top.get::<f64>("Double"), Some(-2.25));
    assert_eq!(top.get::<bool>("Plot"), Some(true));
}

#[test]
fn test_text_fields() {
    let mut loc = LocString::new(1234);
    loc.add(LanguageId::English, "Sword", false);
    loc.add(LanguageId::French, "Épée", true);

    let mut builder = GffBuilder::new("UTI");
    builder
        .top
        .add_field("Tag", "sword_01")
        .add_field("TemplateResRef", Resref::new("nw_wswls001"))
        .add_field("LocalizedName", loc.clone())
        .add_field("Blob", vec![1u8, 2, 3]);
    let gff = built(&mut builder);
    let top = gff.toplevel().unwrap();

    assert_eq!(top.get::<String>("Tag").as_deref(), Some("sword_01"));
    assert_eq!(top.get::<Resref>("TemplateResRef"), Some(Resref::new("nw_wswls001")));
    assert_eq!(top.get::<LocString>("LocalizedName"), Some(loc));
    assert_eq!(top.get::<ByteArray>("Blob").unwrap().as_slice(), &[1, 2, 3]);
}

#[test]
fn test_nested_structs_and_lists() {
    let mut builder = GffBuilder::new("UTC");
    builder.top.add_field("Tag", "fred");
    {
        let classes = builder.top.add_list("ClassList");
        classes.push_back(3).add_field("Class", 11i32).add_field("ClassLevel", 2i16);
        classes.push_back(3).add_field("Class", 4i32);
    }
    builder.top.add_struct("Inner", 7).add_field("Depth", 1u8);
    builder.top.add_list("Empty");
    let gff = built(&mut builder);
    let top = gff.toplevel().unwrap();

    let classes = top.field("ClassList").unwrap();
    assert_eq!(classes.size(), 2);
    let first = classes.struct_at(0).unwrap();
    assert_eq!(first.id(), 3);
    assert_eq!(first.get::<i32>("Class"), Some(11));
    assert_eq!(first.get::<i16>("ClassLevel"), Some(2));
    assert_eq!(classes.struct_at(1).unwrap().get::<i32>("Class"), Some(4));
    assert!(classes.struct_at(2).is_none());

    let inner = top.field("Inner").unwrap().as_struct().unwrap();
    assert_eq!(inner.id(), 7);
    assert_eq!(inner.get::<u8>("Depth"), Some(1));

    assert_eq!(top.field("Empty").unwrap().size(), 0);
}

#[test]
fn test_labels_deduplicated() {
    let mut builder = GffBuilder::new("GIT");
    {
        let list = builder.top.add_list("List");
        for i in 0..10 {
            list.push_back(0).add_field("Tag", format!("t{i}"));
        }
    }
    builder.build().unwrap();
    let head = GffHeader::read(builder.to_bytes(), 0).unwrap();
    assert_eq!(head.label_count, 2);
    assert_eq!(head.struct_count, 11);
}

#[test]
fn test_label_too_long() {
    let mut builder = GffBuilder::new("UTC");
    builder.top.add_field("ThisLabelIsTooLong", 1u8);
    assert!(matches!(builder.build(), Err(GffError::LabelTooLong(_))));
}

#[test]
fn test_resref_limit() {
    let mut builder = GffBuilder::new("UTC").with_max_resref_len(16);
    builder
        .top
        .add_field("Conversation", GffValue::Resref("a_resref_longer_than_16".into()));
    assert!(matches!(builder.build(), Err(GffError::ResrefTooLong(_))));

    let mut builder = GffBuilder::new("UTC");
    builder
        .top
        .add_field("Conversation", GffValue::Resref("a_resref_longer_than_16".into()));
    assert!(builder.build().is_ok());
}

#[test]
fn test_build_is_deterministic() {
    let make = || {
        let mut builder = GffBuilder::new("DLG");
        let list = builder.top.add_list("EntryList");
        for i in 0..3u32 {
            let entry = list.push_back(i);
            entry.add_field("Text", format!("line {i}"));
            entry.add_list("RepliesList").push_back(0).add_field("Index", i);
        }
        builder.build().unwrap();
        builder.to_bytes().clone()
    };
    assert_eq!(make(), make());
}

#[test]
#[should_panic(expected = "already built")]
fn test_build_twice_panics() {
    let mut builder = GffBuilder::new("UTC");
    builder.build().unwrap();
    let _ = builder.build();
}

#[test]
fn test_write_to() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("fred.utc");
    let mut builder = GffBuilder::new("UTC");
    builder.top.add_field("Tag", "fred");
    builder.build().unwrap();
    builder.write_to(&path).unwrap();

    let gff = Gff::from_file(&path).unwrap();
    assert_eq!(gff.toplevel().unwrap().get::<String>("Tag").as_deref(), Some("fred"));
}
