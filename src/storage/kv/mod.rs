/* src/storage/kv/mod.rs */

//!
//! Definitions assembled from a key-value store.
//!
//! With namespace prefix `P` (default `"reflip:"`) the layout is:
//!
//! - `P + "features"`: a set holding every flag name
//! - `P + "ttl"`: a string holding the refresh TTL in milliseconds
//! - `P + name`: one hash per flag with the fields of a definition

mod memory;
mod record;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryStore;
pub use record::{flag_def_from_record, record_from_flag_def};
#[cfg(feature = "redis")]
pub use self::redis::{RedisAdapter, RedisStore};

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::{Fetched, StorageAdapter, StorageError};

/// Namespace prefix used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "reflip:";

/// TTL used when the store holds no TTL key.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// The reads a [`KeyValueAdapter`] needs from its store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
	/// Reads the members of `set_key` and the string at `ttl_key` in one round trip.
	async fn index(&self, set_key: &str, ttl_key: &str) -> Result<(Vec<String>, Option<String>), StorageError>;

	/// Reads one hash per key, in order. Missing keys yield empty maps.
	async fn records(&self, keys: &[String]) -> Result<Vec<HashMap<String, String>>, StorageError>;
}

/// Assembles definitions from a [`KeyValueStore`] under a namespace prefix.
pub struct KeyValueAdapter<S> {
	store: S,
	namespace: String,
	ttl: Duration,
}

impl<S> KeyValueAdapter<S>
where
	S: KeyValueStore,
{
	pub fn new(store: S) -> Self {
		Self {
			store,
			namespace: DEFAULT_NAMESPACE.to_string(),
			ttl: DEFAULT_TTL,
		}
	}

	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();
		self
	}

	/// TTL reported when the store has no TTL key.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;
		self
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	/// Prefixes `base` with the namespace.
	pub fn make_key(&self, base: &str) -> String {
		format!("{}{}", self.namespace, base)
	}

	fn parse_ttl(&self, raw: Option<String>) -> Result<Duration, StorageError> {
		match raw.as_deref().map(str::trim) {
			None | Some("") => Ok(self.ttl),
			Some(raw) => raw
				.parse::<u64>()
				.map(Duration::from_millis)
				.map_err(|e| StorageError::Parse(format!("ttl '{}': {}", raw, e))),
		}
	}
}

#[async_trait]
impl<S> StorageAdapter for KeyValueAdapter<S>
where
	S: KeyValueStore,
{
	fn name(&self) -> &'static str {
		"key-value"
	}

	async fn fetch(&self) -> Result<Fetched, StorageError> {
		let (mut members, raw_ttl) = self
			.store
			.index(&self.make_key("features"), &self.make_key("ttl"))
			.await?;
		let ttl = self.parse_ttl(raw_ttl)?;

		members.sort();
		let keys: Vec<String> = members.iter().map(|name| self.make_key(name)).collect();
		let records = self.store.records(&keys).await?;

		let mut definitions = Vec::with_capacity(members.len());
		for (name, record) in members.iter().zip(records) {
			if record.is_empty() {
				tracing::warn!("Flag '{}' is listed in {}features but has no record", name, self.namespace);
				continue;
			}
			definitions.push(flag_def_from_record(name, &record)?);
		}

		tracing::debug!("Fetched {} definitions from namespace '{}'", definitions.len(), self.namespace);
		Ok(Fetched {
			definitions,
			ttl: Some(ttl),
		})
	}
}

impl<S> std::fmt::Debug for KeyValueAdapter<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeyValueAdapter")
			.field("namespace", &self.namespace)
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}
