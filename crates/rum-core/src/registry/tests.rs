//! Tests for the registry codec and whole-blob updates.

use std::sync::Arc;

use super::*;
use crate::store::MemoryRecordStore;

const KEY: &str = "test/registry";

fn record(session_id: &str, file_name: Option<&str>) -> UploadRecord {
    UploadRecord {
        session_id: session_id.to_string(),
        bucket: "b".to_string(),
        key: "k".to_string(),
        access_level: AccessLevel::Private,
        file_name: file_name.map(str::to_string),
        session_start: 1_000,
        last_touched: 2_000,
    }
}

fn registry() -> (Arc<MemoryRecordStore>, UploadRegistry) {
    let store = Arc::new(MemoryRecordStore::new());
    let registry = UploadRegistry::new(store.clone(), KEY);
    (store, registry)
}

#[tokio::test]
async fn missing_value_loads_as_empty() {
    let (_store, registry) = registry();
    assert!(registry.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_value_loads_as_empty() {
    let (store, registry) = registry();
    store.set_now(KEY, "  ");
    assert!(registry.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_value_is_a_codec_error_and_empty_when_lenient() {
    let (store, registry) = registry();
    store.set_now(KEY, "{not json");
    assert!(matches!(
        registry.load().await,
        Err(RegistryError::Codec(_))
    ));
    assert!(registry.load_or_empty().await.is_empty());
}

#[tokio::test]
async fn wire_format_uses_camel_case_and_omits_missing_file_name() {
    let (store, registry) = registry();
    let mut map = RegistryMap::new();
    map.insert(FileFingerprint::from("blob".to_string()), record("S1", None));
    registry.save(&map).await.unwrap();

    let raw = store.get_now(KEY).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let rec = &value["blob"];
    assert_eq!(rec["sessionId"], "S1");
    assert_eq!(rec["accessLevel"], "private");
    assert_eq!(rec["sessionStart"], 1_000);
    assert_eq!(rec["lastTouched"], 2_000);
    assert!(rec.get("fileName").is_none());
}

#[tokio::test]
async fn decodes_externally_written_registry() {
    let (store, registry) = registry();
    store.set_now(
        KEY,
        r#"{"a.png_100_10_image/png_b_k":{"sessionId":"S9","bucket":"b","key":"k",
            "accessLevel":"protected","fileName":"a.png","sessionStart":5,"lastTouched":6}}"#,
    );
    let map = registry.load().await.unwrap();
    let rec = map
        .get(&FileFingerprint::from("a.png_100_10_image/png_b_k".to_string()))
        .expect("record present");
    assert_eq!(rec.session_id, "S9");
    assert_eq!(rec.access_level, AccessLevel::Protected);
    assert_eq!(rec.file_name.as_deref(), Some("a.png"));
}

#[tokio::test]
async fn insert_and_remove_are_whole_blob_updates() {
    let (_store, registry) = registry();
    let fp_a = FileFingerprint::from("a".to_string());
    let fp_b = FileFingerprint::from("b".to_string());

    registry.insert(fp_a.clone(), record("S1", Some("a"))).await.unwrap();
    registry.insert(fp_b.clone(), record("S2", None)).await.unwrap();
    assert_eq!(registry.load().await.unwrap().len(), 2);

    assert!(registry.remove(&fp_a).await.unwrap());
    let map = registry.load().await.unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains_key(&fp_b));

    // Absent key: no-op.
    assert!(!registry.remove(&fp_a).await.unwrap());
    assert_eq!(registry.load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn insert_over_corrupt_registry_replaces_it() {
    let (store, registry) = registry();
    store.set_now(KEY, "[1,2,3");
    let fp = FileFingerprint::from("a".to_string());
    registry.insert(fp.clone(), record("S1", None)).await.unwrap();
    let map = registry.load().await.unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map[&fp].session_id, "S1");
}

#[test]
fn access_level_parses_and_displays() {
    assert_eq!("public".parse::<AccessLevel>().unwrap(), AccessLevel::Public);
    assert_eq!("protected".parse::<AccessLevel>().unwrap(), AccessLevel::Protected);
    assert_eq!(AccessLevel::default(), AccessLevel::Private);
    assert_eq!(AccessLevel::Private.to_string(), "private");
    assert!("guest".parse::<AccessLevel>().is_err());
}
