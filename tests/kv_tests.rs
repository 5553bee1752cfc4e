/* tests/kv_tests.rs */

use std::collections::HashMap;
use std::time::Duration;

use reflip::flag::{Document, FlagDef, FlagType};
use reflip::storage::kv::{DEFAULT_TTL, flag_def_from_record};
use reflip::storage::{KeyValueAdapter, MemoryStore, StorageAdapter, StorageError};
use reflip::{Context, Registry};

fn zoo() -> Document {
	Document::new(vec![
		FlagDef::boolean("aardvarks", true),
		FlagDef::boolean("archaeopteryx", false),
		FlagDef::grouped("agouti", ["red", "blue"]),
	])
	.with_ttl(Duration::from_millis(60_000))
}

fn record(fields: &[(&str, &str)]) -> HashMap<String, String> {
	fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[tokio::test]
async fn test_kv_fetch_assembles_definitions() {
	let store = MemoryStore::new();
	store.load_document("reflip:", &zoo());

	let adapter = KeyValueAdapter::new(store.clone());
	let fetched = adapter.fetch().await.unwrap();

	assert_eq!(fetched.ttl, Some(Duration::from_secs(60)));
	let names: Vec<&str> = fetched.definitions.iter().map(|def| def.name.as_str()).collect();
	assert_eq!(names, vec!["aardvarks", "agouti", "archaeopteryx"]);
	assert_eq!(fetched.definitions[1].groups, Some(vec!["red".to_string(), "blue".to_string()]));
	// index plus one batch of records
	assert_eq!(store.round_trips(), 2);
}

#[tokio::test]
async fn test_kv_missing_ttl_uses_adapter_ttl() {
	let store = MemoryStore::new();
	store.load_document("reflip:", &Document::new(vec![FlagDef::boolean("aardvarks", true)]));

	let adapter = KeyValueAdapter::new(store.clone());
	assert_eq!(adapter.fetch().await.unwrap().ttl, Some(DEFAULT_TTL));

	let adapter = KeyValueAdapter::new(store).with_ttl(Duration::from_secs(30));
	assert_eq!(adapter.fetch().await.unwrap().ttl, Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn test_kv_custom_namespace() {
	let store = MemoryStore::new();
	store.load_document("zoo:", &zoo());

	let default_ns = KeyValueAdapter::new(store.clone());
	assert!(default_ns.fetch().await.unwrap().definitions.is_empty());

	let adapter = KeyValueAdapter::new(store).with_namespace("zoo:");
	assert_eq!(adapter.make_key("ttl"), "zoo:ttl");
	assert_eq!(adapter.fetch().await.unwrap().definitions.len(), 3);
}

#[tokio::test]
async fn test_kv_skips_empty_records() {
	let store = MemoryStore::new();
	store.load_document("reflip:", &zoo());
	store.sadd("reflip:features", "ghost");

	let fetched = KeyValueAdapter::new(store).fetch().await.unwrap();
	assert_eq!(fetched.definitions.len(), 3);
	assert!(fetched.definitions.iter().all(|def| def.name != "ghost"));
}

#[tokio::test]
async fn test_kv_bad_ttl_is_a_parse_error() {
	let store = MemoryStore::new();
	store.set("reflip:ttl", "soon");
	let result = KeyValueAdapter::new(store).fetch().await;
	assert!(matches!(result, Err(StorageError::Parse(_))));
}

#[test]
fn test_record_field_parsing() {
	let def = flag_def_from_record(
		"archaeopteryx",
		&record(&[("type", "metered"), ("enabled", "1"), ("chance", "12.5")]),
	)
	.unwrap();
	assert_eq!(def.name, "archaeopteryx");
	assert_eq!(def.kind, FlagType::Metered);
	assert!(def.enabled);
	assert_eq!(def.chance, Some(12.5));

	let def = flag_def_from_record("agouti", &record(&[("type", "grouped"), ("enabled", "true"), ("groups", "a, b,c")])).unwrap();
	assert_eq!(def.groups, Some(vec!["a".to_string(), "b".to_string(), "c".to_string()]));

	let def = flag_def_from_record("plain", &record(&[("enabled", "false")])).unwrap();
	assert_eq!(def.kind, FlagType::Boolean);
	assert!(!def.enabled);

	assert!(matches!(
		flag_def_from_record("x", &record(&[("enabled", "maybe")])),
		Err(StorageError::Parse(_))
	));
	assert!(matches!(
		flag_def_from_record("x", &record(&[("type", "sometimes")])),
		Err(StorageError::Parse(_))
	));
	assert!(matches!(
		flag_def_from_record("x", &record(&[("chance", "lots")])),
		Err(StorageError::Parse(_))
	));
}

#[cfg(feature = "json")]
#[test]
fn test_record_groups_as_json_array() {
	let def = flag_def_from_record("agouti", &record(&[("type", "grouped"), ("groups", r#"["a","b"]"#)])).unwrap();
	assert_eq!(def.groups, Some(vec!["a".to_string(), "b".to_string()]));
}

#[tokio::test]
async fn test_registry_over_kv_store() {
	let store = MemoryStore::new();
	store.load_document("reflip:", &zoo());

	let registry = Registry::builder()
		.storage(KeyValueAdapter::new(store.clone()))
		.build()
		.unwrap();
	registry.start().await.unwrap();

	let ctx = Context::new();
	assert_eq!(registry.evaluate("aardvarks", &ctx).unwrap(), true);
	assert_eq!(registry.evaluate("archaeopteryx", &ctx).unwrap(), false);
	assert!(registry.evaluate("agouti", &ctx).unwrap().as_group().is_some());
	assert_eq!(registry.ttl(), Some(Duration::from_secs(60)));

	store.hset("reflip:archaeopteryx", "enabled", "true");
	registry.refresh().await.unwrap();
	assert_eq!(registry.evaluate("archaeopteryx", &ctx).unwrap(), true);

	registry.shutdown();
}
