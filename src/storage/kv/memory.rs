/* src/storage/kv/memory.rs */

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{KeyValueStore, record_from_flag_def};
use crate::flag::Document;
use crate::storage::StorageError;

#[derive(Default)]
struct Data {
	sets: HashMap<String, BTreeSet<String>>,
	strings: HashMap<String, String>,
	hashes: HashMap<String, HashMap<String, String>>,
}

/// An in-memory [`KeyValueStore`]. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
	data: Arc<Mutex<Data>>,
	round_trips: Arc<AtomicUsize>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn sadd(&self, key: impl Into<String>, member: impl Into<String>) {
		self.with(|data| {
			data.sets.entry(key.into()).or_default().insert(member.into());
		});
	}

	pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
		self.with(|data| {
			data.strings.insert(key.into(), value.into());
		});
	}

	pub fn hset(&self, key: impl Into<String>, field: impl Into<String>, value: impl Into<String>) {
		self.with(|data| {
			data.hashes.entry(key.into()).or_default().insert(field.into(), value.into());
		});
	}

	/// Removes `key` whatever its type.
	pub fn del(&self, key: &str) {
		self.with(|data| {
			data.sets.remove(key);
			data.strings.remove(key);
			data.hashes.remove(key);
		});
	}

	/// Writes `document` under `namespace` using the adapter's key layout.
	pub fn load_document(&self, namespace: &str, document: &Document) {
		if let Some(ttl) = document.ttl {
			self.set(format!("{namespace}ttl"), ttl.to_string());
		}
		for def in &document.features {
			self.sadd(format!("{namespace}features"), def.name.clone());
			for (field, value) in record_from_flag_def(def) {
				self.hset(format!("{namespace}{}", def.name), field, value);
			}
		}
	}

	/// Number of reads served so far.
	pub fn round_trips(&self) -> usize {
		self.round_trips.load(Ordering::SeqCst)
	}

	fn with<R>(&self, f: impl FnOnce(&mut Data) -> R) -> R {
		let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
		f(&mut data)
	}
}

#[async_trait]
impl KeyValueStore for MemoryStore {
	async fn index(&self, set_key: &str, ttl_key: &str) -> Result<(Vec<String>, Option<String>), StorageError> {
		self.round_trips.fetch_add(1, Ordering::SeqCst);
		Ok(self.with(|data| {
			let members = data
				.sets
				.get(set_key)
				.map(|set| set.iter().cloned().collect())
				.unwrap_or_default();
			(members, data.strings.get(ttl_key).cloned())
		}))
	}

	async fn records(&self, keys: &[String]) -> Result<Vec<HashMap<String, String>>, StorageError> {
		self.round_trips.fetch_add(1, Ordering::SeqCst);
		Ok(self.with(|data| {
			keys.iter()
				.map(|key| data.hashes.get(key).cloned().unwrap_or_default())
				.collect()
		}))
	}
}
