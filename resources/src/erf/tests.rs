use super::*;
use crate::error::ErfWriteError;
use rollkit_shared::LanguageId;
use tempfile::TempDir;

fn sample(dir: &TempDir, erf_type: ErfType) -> PathBuf {
    let mut builder = ErfBuilder::new(erf_type);
    let mut desc = LocString::new(1234);
    desc.add(LanguageId::English, "Test module", false);
    desc.add(LanguageId::French, "Module d'essai", true);
    builder.set_description(desc);
    builder
        .add_bytes(Resource::new("module", ResourceType::IFO), b"ifo bytes".to_vec())
        .unwrap();
    builder
        .add_bytes(Resource::new("area001", ResourceType::ARE), vec![1, 2, 3, 4])
        .unwrap();
    let path = dir.path().join("test.mod");
    builder.write_to(&path).unwrap();
    path
}

#[test]
fn test_write_then_open() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir, ErfType::Mod);

    let erf = Erf::open(&path).unwrap();
    assert!(erf.valid());
    assert_eq!(erf.erf_type, ErfType::Mod);
    assert_eq!(erf.version, ErfVersion::V1_0);
    assert_eq!(erf.size(), 2);
    assert_eq!(erf.name(), "test.mod");
    assert_eq!(erf.description.strref(), 1234);
    assert_eq!(erf.description.get(LanguageId::English, false), "Test module");
    assert_eq!(erf.description.get(LanguageId::French, true), "Module d'essai");

    let key = erf.find(Resource::new("module", ResourceType::IFO)).unwrap();
    let data = erf.demand(key);
    assert_eq!(data.bytes.as_slice(), b"ifo bytes");
    assert_eq!(erf.stat(key).unwrap().size, 9);
}

#[test]
fn test_nul_terminated_descriptions() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir, ErfType::Hak);
    let erf = Erf::open(&path).unwrap();
    assert_eq!(erf.erf_type, ErfType::Hak);
    assert_eq!(erf.description.get(LanguageId::English, false), "Test module");
    assert_eq!(erf.description.size(), 2);
}

#[test]
fn test_output_is_sorted_and_stable() {
    let mut a = ErfBuilder::new(ErfType::Erf);
    let mut b = ErfBuilder::new(ErfType::Erf);
    a.set_date(124, 10);
    b.set_date(124, 10);
    a.add_bytes(Resource::new("zzz", ResourceType::TXT), b"z".to_vec()).unwrap();
    a.add_bytes(Resource::new("aaa", ResourceType::TXT), b"a".to_vec()).unwrap();
    b.add_bytes(Resource::new("aaa", ResourceType::TXT), b"a".to_vec()).unwrap();
    b.add_bytes(Resource::new("zzz", ResourceType::TXT), b"z".to_vec()).unwrap();
    assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
}

#[test]
fn test_rejects_bad_names() {
    let mut builder = ErfBuilder::new(ErfType::Erf);
    let long = Resource::new("name_longer_than_sixteen", ResourceType::TXT);
    assert!(matches!(
        builder.add_bytes(long, vec![]),
        Err(ErfWriteError::ResrefTooLong(_))
    ));
    assert!(matches!(
        builder.add_bytes(Resource::default(), vec![]),
        Err(ErfWriteError::InvalidName(_))
    ));
}

#[test]
fn test_truncated_archive_is_invalid() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir, ErfType::Erf);
    let bytes = std::fs::read(&path).unwrap();
    let short = dir.path().join("short.erf");
    std::fs::write(&short, &bytes[..HEADER_SIZE + 4]).unwrap();

    assert!(Erf::open(&short).is_err());
    let erf = Erf::new(&short);
    assert!(!erf.valid());
    assert_eq!(erf.size(), 0);
}

#[test]
fn test_bad_type_tag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.erf");
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[..8].copy_from_slice(b"XYZ V1.0");
    std::fs::write(&path, bytes).unwrap();
    assert!(matches!(Erf::open(&path), Err(ContainerError::InvalidType(_))));
}

#[test]
fn test_add_file() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("script.nss");
    std::fs::write(&src, "void main() {}").unwrap();
    let mut builder = ErfBuilder::new(ErfType::Erf);
    builder.add_file(&src).unwrap();
    assert!(builder.add_file(&dir.path().join("missing.nss")).is_err());

    let out = dir.path().join("scripts.erf");
    builder.write_to(&out).unwrap();
    let erf = Erf::open(&out).unwrap();
    let key = erf.find(Resource::new("script", ResourceType::NSS)).unwrap();
    assert_eq!(erf.demand(key).bytes.as_str(), Some("void main() {}"));
}
