//! Build, parse and JSON round trips through the public API.

use anyhow::{Context, Result};
use rollkit_gff::{Gff, GffBuilder, GffType, gff_to_json, json_to_gff};
use rollkit_shared::{LanguageId, LocString};
use tempfile::TempDir;

fn creature() -> GffBuilder {
    let mut builder = GffBuilder::new("UTC");
    builder.top.add_field("Tag", "fred");
    builder.top.add_list("ClassList").push_back(3).add_field("Class", 11i32);
    builder
}

#[test]
fn test_creature_round_trip() -> Result<()> {
    let mut builder = creature();
    builder.build()?;

    let gff = Gff::from_bytes(builder.to_bytes().clone())?;
    assert_eq!(gff.type_tag(), "UTC ");
    let top = gff.toplevel().context("toplevel")?;
    assert_eq!(top.id(), 0xFFFF_FFFF);
    assert_eq!(top.get::<String>("Tag").as_deref(), Some("fred"));

    let classes = top.field("ClassList").context("ClassList")?;
    assert_eq!(classes.ty(), Some(GffType::List));
    let class = classes.struct_at(0).context("ClassList[0]")?;
    assert_eq!(class.id(), 3);
    assert_eq!(class.get::<i32>("Class"), Some(11));
    Ok(())
}

#[test]
fn test_json_round_trip_through_files() -> Result<()> {
    let dir = TempDir::new()?;
    let mut builder = creature();
    let mut name = LocString::new(LocString::NO_STRREF);
    name.add(LanguageId::English, "Fred", false);
    name.add(LanguageId::French, "Frédéric", false);
    builder.top.add_field("FirstName", name);
    builder.build()?;
    let gff_path = dir.path().join("fred.utc");
    builder.write_to(&gff_path)?;

    let json = gff_to_json(&Gff::from_file(&gff_path)?);
    let json_path = dir.path().join("fred.utc.json");
    std::fs::write(&json_path, serde_json::to_string_pretty(&json)?)?;

    let text = std::fs::read_to_string(&json_path)?;
    let mut rebuilt = json_to_gff(&serde_json::from_str(&text)?)?;
    rebuilt.build()?;
    assert_eq!(rebuilt.to_bytes().as_slice(), std::fs::read(&gff_path)?.as_slice());
    Ok(())
}

#[test]
fn test_parse_matches_built_tree() -> Result<()> {
    let mut builder = GffBuilder::new("ARE");
    {
        let list = builder.top.add_list("Tile_List");
        for i in 0..20i32 {
            list.push_back(1)
                .add_field("Tile_ID", i)
                .add_field("Tile_Orientation", (i % 4) as u8);
        }
    }
    builder.build()?;

    let gff = Gff::from_bytes(builder.to_bytes().clone())?;
    let tiles = gff.toplevel().context("toplevel")?.field("Tile_List").context("Tile_List")?;
    assert_eq!(tiles.size(), 20);
    for (i, tile) in tiles.structs().enumerate() {
        assert_eq!(tile.get::<i32>("Tile_ID"), Some(i as i32));
        assert_eq!(tile.get::<u8>("Tile_Orientation"), Some((i % 4) as u8));
    }
    Ok(())
}
