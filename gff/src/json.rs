//! JSON bridge
//!
//! Every field becomes `{"type": <name>, "value": <payload>}`. Structs carry
//! their id under `__struct_id`, lists are arrays of struct objects and the
//! top-level object records the file type under `__data_type`. Object key
//! order follows field order, so a tree survives the round trip byte for
//! byte. JSON has no NaN or infinity, so non-finite floats are written as
//! their bit pattern in a hex string such as `"0x7fc00000"`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rollkit_shared::{Language, LocString};
use serde_json::{Map, Value, json};

use crate::builder::{GffBuilder, GffBuilderStruct, GffValue};
use crate::error::JsonBridgeError;
use crate::reader::{Gff, GffField, GffStruct};
use crate::types::{GffType, TOPLEVEL_STRUCT_ID};

const STRUCT_ID_KEY: &str = "__struct_id";
const DATA_TYPE_KEY: &str = "__data_type";

/// Converts a parsed buffer to JSON. Invalid readers produce `null`.
pub fn gff_to_json(gff: &Gff) -> Value {
    let Some(top) = gff.toplevel() else {
        tracing::error!("gff_to_json: invalid gff");
        return Value::Null;
    };
    let mut root = Map::new();
    root.insert(DATA_TYPE_KEY.into(), Value::String(gff.type_tag().to_string()));
    root.extend(struct_to_json(&top));
    Value::Object(root)
}

fn struct_to_json(s: &GffStruct<'_>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(STRUCT_ID_KEY.into(), json!(s.id()));
    for field in s.fields() {
        let Some(name) = field.name() else {
            continue;
        };
        match field_to_json(&field) {
            Some(value) => {
                map.insert(name.to_string(), value);
            }
            None => tracing::warn!(field = name, "gff_to_json: skipping unreadable field"),
        }
    }
    map
}

fn field_to_json(field: &GffField<'_>) -> Option<Value> {
    let ty = field.ty()?;
    let value = match ty {
        GffType::Byte => json!(field.get::<u8>()?),
        GffType::Char => json!(field.get::<i8>()?),
        GffType::Word => json!(field.get::<u16>()?),
        GffType::Short => json!(field.get::<i16>()?),
        GffType::Dword => json!(field.get::<u32>()?),
        GffType::Int => json!(field.get::<i32>()?),
        GffType::Dword64 => json!(field.get::<u64>()?),
        GffType::Int64 => json!(field.get::<i64>()?),
        GffType::Float => float_to_json(field.get::<f32>()?),
        GffType::Double => double_to_json(field.get::<f64>()?),
        GffType::String => json!(field.get::<String>()?),
        GffType::Resref => json!(String::from_utf8_lossy(field.resref_bytes()?)),
        GffType::LocString => return Some(locstring_to_json(&field.get::<LocString>()?)),
        GffType::Void => json!(STANDARD.encode(field.get::<rollkit_shared::ByteArray>()?.as_slice())),
        GffType::Struct => Value::Object(struct_to_json(&field.as_struct()?)),
        GffType::List => {
            let elements = field.structs().map(|s| Value::Object(struct_to_json(&s)));
            return Some(Value::Array(elements.collect()));
        }
    };
    Some(json!({ "type": ty.name(), "value": value }))
}

fn float_to_json(v: f32) -> Value {
    if v.is_finite() {
        json!(v)
    } else {
        json!(format!("{:#010x}", v.to_bits()))
    }
}

fn double_to_json(v: f64) -> Value {
    if v.is_finite() {
        json!(v)
    } else {
        json!(format!("{:#018x}", v.to_bits()))
    }
}

fn locstring_to_json(loc: &LocString) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), json!(GffType::LocString.name()));
    if loc.strref() != LocString::NO_STRREF {
        out.insert("strref".into(), json!(loc.strref()));
    }
    let strings: Map<String, Value> = loc
        .iter()
        .map(|(lang, text)| (lang.to_string(), json!(text)))
        .collect();
    out.insert("value".into(), Value::Object(strings));
    Value::Object(out)
}

/// Rebuilds a builder tree from [`gff_to_json`] output. The result is not yet
/// built.
pub fn json_to_gff(value: &Value) -> Result<GffBuilder, JsonBridgeError> {
    let root = value.as_object().ok_or_else(|| expected("object", ""))?;
    let tag = root
        .get(DATA_TYPE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| expected("string __data_type", ""))?;

    let mut builder = GffBuilder::new(tag);
    builder.top.id = struct_id(root, "")?.unwrap_or(TOPLEVEL_STRUCT_ID);
    fill_struct(&mut builder.top, root, "")?;
    Ok(builder)
}

fn expected(what: &'static str, at: &str) -> JsonBridgeError {
    JsonBridgeError::Expected {
        expected: what,
        at: at.to_string(),
    }
}

fn out_of_range(ty: GffType, at: &str) -> JsonBridgeError {
    JsonBridgeError::OutOfRange {
        ty: ty.name(),
        at: at.to_string(),
    }
}

fn struct_id(map: &Map<String, Value>, at: &str) -> Result<Option<u32>, JsonBridgeError> {
    match map.get(STRUCT_ID_KEY) {
        None => Ok(None),
        Some(id) => {
            let id = id.as_u64().ok_or_else(|| expected("unsigned __struct_id", at))?;
            u32::try_from(id)
                .map(Some)
                .map_err(|_| out_of_range(GffType::Struct, at))
        }
    }
}

fn fill_struct(
    out: &mut GffBuilderStruct,
    map: &Map<String, Value>,
    path: &str,
) -> Result<(), JsonBridgeError> {
    for (label, value) in map {
        if label == STRUCT_ID_KEY || label == DATA_TYPE_KEY {
            continue;
        }
        let at = format!("{path}/{label}");

        if let Value::Array(elements) = value {
            fill_list(out, label, elements, &at)?;
            continue;
        }

        let field = value.as_object().ok_or_else(|| expected("field object", &at))?;
        let name = field
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| expected("string type", &at))?;
        let ty = GffType::from_name(name).ok_or_else(|| JsonBridgeError::UnknownType {
            ty: name.to_string(),
            at: at.clone(),
        })?;

        match ty {
            GffType::Struct => {
                let inner = field
                    .get("value")
                    .and_then(Value::as_object)
                    .ok_or_else(|| expected("struct object", &at))?;
                let id = struct_id(inner, &at)?.unwrap_or(0);
                fill_struct(out.add_struct(label.as_str(), id), inner, &at)?;
            }
            GffType::List => {
                let elements = field
                    .get("value")
                    .and_then(Value::as_array)
                    .ok_or_else(|| expected("array", &at))?;
                fill_list(out, label, elements, &at)?;
            }
            GffType::LocString => {
                out.add_field(label.as_str(), json_to_locstring(field, &at)?);
            }
            _ => {
                let payload = field.get("value").ok_or_else(|| expected("value", &at))?;
                out.add_field(label.as_str(), json_to_value(ty, payload, &at)?);
            }
        }
    }
    Ok(())
}

fn fill_list(
    out: &mut GffBuilderStruct,
    label: &str,
    elements: &[Value],
    at: &str,
) -> Result<(), JsonBridgeError> {
    let list = out.add_list(label);
    for (i, element) in elements.iter().enumerate() {
        let at = format!("{at}/{i}");
        let map = element.as_object().ok_or_else(|| expected("struct object", &at))?;
        let id = struct_id(map, &at)?.unwrap_or(0);
        fill_struct(list.push_back(id), map, &at)?;
    }
    Ok(())
}

fn unsigned<T: TryFrom<u64>>(value: &Value, ty: GffType, at: &str) -> Result<T, JsonBridgeError> {
    let n = value.as_u64().ok_or_else(|| expected("unsigned integer", at))?;
    T::try_from(n).map_err(|_| out_of_range(ty, at))
}

fn signed<T: TryFrom<i64>>(value: &Value, ty: GffType, at: &str) -> Result<T, JsonBridgeError> {
    let n = value.as_i64().ok_or_else(|| expected("integer", at))?;
    T::try_from(n).map_err(|_| out_of_range(ty, at))
}

fn json_to_value(ty: GffType, value: &Value, at: &str) -> Result<GffValue, JsonBridgeError> {
    let string = || value.as_str().ok_or_else(|| expected("string", at));
    let double = || match value {
        Value::String(s) => parse_f64(s).ok_or_else(|| expected("number", at)),
        _ => value.as_f64().ok_or_else(|| expected("number", at)),
    };
    let single = || match value {
        Value::String(s) => parse_f32(s).ok_or_else(|| expected("number", at)),
        _ => value.as_f64().map(|n| n as f32).ok_or_else(|| expected("number", at)),
    };

    Ok(match ty {
        GffType::Byte => GffValue::Byte(unsigned(value, ty, at)?),
        GffType::Char => GffValue::Char(signed(value, ty, at)?),
        GffType::Word => GffValue::Word(unsigned(value, ty, at)?),
        GffType::Short => GffValue::Short(signed(value, ty, at)?),
        GffType::Dword => GffValue::Dword(unsigned(value, ty, at)?),
        GffType::Int => GffValue::Int(signed(value, ty, at)?),
        GffType::Dword64 => GffValue::Dword64(unsigned(value, ty, at)?),
        GffType::Int64 => GffValue::Int64(signed(value, ty, at)?),
        GffType::Float => GffValue::Float(single()?),
        GffType::Double => GffValue::Double(double()?),
        GffType::String => GffValue::String(string()?.to_string()),
        GffType::Resref => GffValue::Resref(string()?.to_string()),
        GffType::Void => GffValue::Void(STANDARD.decode(string()?).map_err(|source| {
            JsonBridgeError::Base64 {
                at: at.to_string(),
                source,
            }
        })?),
        GffType::LocString | GffType::Struct | GffType::List => {
            unreachable!("compound types handled by fill_struct")
        }
    })
}

/// A hex bit pattern, or a name such as `NaN` or `-inf`.
fn parse_f32(s: &str) -> Option<f32> {
    match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok().map(f32::from_bits),
        None => s.parse().ok(),
    }
}

fn parse_f64(s: &str) -> Option<f64> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok().map(f64::from_bits),
        None => s.parse().ok(),
    }
}

fn json_to_locstring(field: &Map<String, Value>, at: &str) -> Result<LocString, JsonBridgeError> {
    let strref = match field.get("strref") {
        Some(strref) => unsigned(strref, GffType::LocString, at)?,
        None => LocString::NO_STRREF,
    };
    let mut loc = LocString::new(strref);
    let strings = field
        .get("value")
        .and_then(Value::as_object)
        .ok_or_else(|| expected("localized string object", at))?;
    for (lang, text) in strings {
        let id: u32 = lang.parse().map_err(|_| expected("numeric language id", at))?;
        let text = text.as_str().ok_or_else(|| expected("string", at))?;
        let (base, feminine) = Language::to_base_id(id);
        if !loc.add(base, text, feminine) {
            tracing::warn!(lang = id, at, "json_to_gff: unknown language id");
        }
    }
    Ok(loc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_shared::{ByteArray, LanguageId, Resref};

    fn round_trip(builder: &mut GffBuilder) -> (ByteArray, Value, ByteArray) {
        builder.build().unwrap();
        let original = builder.to_bytes().clone();
        let json = gff_to_json(&Gff::from_bytes(original.clone()).unwrap());
        let mut rebuilt = json_to_gff(&json).unwrap();
        rebuilt.build().unwrap();
        (original, json, rebuilt.to_bytes().clone())
    }

    #[test]
    fn test_field_shapes() {
        let mut loc = LocString::new(42);
        loc.add(LanguageId::German, "Hallo", true);

        let mut builder = GffBuilder::new("UTI");
        builder
            .top
            .add_field("Cost", 150u32)
            .add_field("Big", -9_000_000_000i64)
            .add_field("Name", loc)
            .add_field("Data", vec![0u8, 255, 16])
            .add_field("Ref", Resref::new("it_sword"));
        builder.top.add_struct("Inner", 9).add_field("X", 1.25f32);
        builder.top.add_list("Props").push_back(1).add_field("Kind", 3u16);
        builder.build().unwrap();

        let json = gff_to_json(&Gff::from_bytes(builder.to_bytes().clone()).unwrap());
        assert_eq!(json["__data_type"], "UTI ");
        assert_eq!(json["__struct_id"], TOPLEVEL_STRUCT_ID);
        assert_eq!(json["Cost"], json!({"type": "dword", "value": 150}));
        assert_eq!(json["Big"], json!({"type": "int64", "value": -9_000_000_000i64}));
        assert_eq!(
            json["Name"],
            json!({"type": "cexolocstring", "strref": 42, "value": {"5": "Hallo"}})
        );
        assert_eq!(json["Data"], json!({"type": "void", "value": "AP8Q"}));
        assert_eq!(json["Ref"], json!({"type": "resref", "value": "it_sword"}));
        assert_eq!(
            json["Inner"],
            json!({"type": "struct", "value": {"__struct_id": 9, "X": {"type": "float", "value": 1.25}}})
        );
        assert_eq!(
            json["Props"],
            json!([{"__struct_id": 1, "Kind": {"type": "word", "value": 3}}])
        );
    }

    #[test]
    fn test_locstring_without_strref() {
        let mut loc = LocString::default();
        loc.add(LanguageId::English, "Hi", false);
        let value = locstring_to_json(&loc);
        assert!(value.get("strref").is_none());
        assert_eq!(value["value"]["0"], "Hi");
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let mut builder = GffBuilder::new("DLG");
        builder
            .top
            .add_field("DelayEntry", 0u32)
            .add_field("EndConversation", "nw_walk_wp")
            .add_field("Float", 0.1f32)
            .add_field("Double", 0.1f64)
            .add_field("Huge", u64::MAX);
        {
            let entries = builder.top.add_list("EntryList");
            for i in 0..3u32 {
                let entry = entries.push_back(i);
                let mut text = LocString::new(LocString::NO_STRREF);
                text.add(LanguageId::English, format!("Entry {i}"), false);
                entry.add_field("Text", text).add_field("Speaker", "");
                entry.add_list("RepliesList").push_back(0).add_field("Index", i);
            }
        }
        builder.top.add_list("StartingList");

        let (original, _, rebuilt) = round_trip(&mut builder);
        assert_eq!(original, rebuilt);
    }

    #[test]
    fn test_non_finite_floats() {
        let mut builder = GffBuilder::new("UTC");
        builder
            .top
            .add_field("Nan", f32::from_bits(0x7fc0_1234))
            .add_field("Inf", f32::INFINITY)
            .add_field("NegInf", f64::NEG_INFINITY)
            .add_field("DoubleNan", f64::NAN);
        let (original, json, rebuilt) = round_trip(&mut builder);
        assert_eq!(json["Nan"]["value"], "0x7fc01234");
        assert_eq!(json["Inf"]["value"], "0x7f800000");
        assert_eq!(json["NegInf"]["value"], "0xfff0000000000000");
        assert_eq!(original, rebuilt);

        let value = json!({"__data_type": "UTC ", "Speed": {"type": "float", "value": "-inf"}});
        let mut builder = json_to_gff(&value).unwrap();
        builder.build().unwrap();
        let gff = Gff::from_bytes(builder.to_bytes().clone()).unwrap();
        assert_eq!(gff.toplevel().unwrap().get::<f32>("Speed"), Some(f32::NEG_INFINITY));

        let value = json!({"__data_type": "UTC ", "Speed": {"type": "float", "value": "fast"}});
        assert!(json_to_gff(&value).is_err());
    }

    #[test]
    fn test_unknown_type() {
        let value = json!({"__data_type": "UTC ", "Tag": {"type": "qword", "value": 1}});
        assert!(matches!(
            json_to_gff(&value),
            Err(JsonBridgeError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let value = json!({"__data_type": "UTC ", "Gender": {"type": "byte", "value": 300}});
        match json_to_gff(&value) {
            Err(JsonBridgeError::OutOfRange { ty, at }) => {
                assert_eq!(ty, "byte");
                assert_eq!(at, "/Gender");
            }
            _ => panic!("expected out of range"),
        }
    }

    #[test]
    fn test_bad_base64() {
        let value = json!({"__data_type": "UTC ", "Blob": {"type": "void", "value": "!!"}});
        assert!(matches!(json_to_gff(&value), Err(JsonBridgeError::Base64 { .. })));
    }

    #[test]
    fn test_missing_data_type() {
        assert!(json_to_gff(&json!({"Tag": {"type": "cexostring", "value": "x"}})).is_err());
        assert!(json_to_gff(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_resref_case_preserved() {
        let mut builder = GffBuilder::new("UTC");
        builder.top.add_field("Conversation", GffValue::Resref("NW_Chat".into()));
        let (original, json, rebuilt) = round_trip(&mut builder);
        assert_eq!(json["Conversation"]["value"], "NW_Chat");
        assert_eq!(original, rebuilt);
    }
}
