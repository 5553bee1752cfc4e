/* src/storage/kv/redis.rs */

use std::collections::HashMap;

use async_trait::async_trait;
use redis::{Client, aio::ConnectionManager};

use super::{KeyValueAdapter, KeyValueStore};
use crate::storage::StorageError;

/// A [`KeyValueAdapter`] backed by Redis.
pub type RedisAdapter = KeyValueAdapter<RedisStore>;

/// [`KeyValueStore`] over a Redis connection manager.
#[derive(Clone)]
pub struct RedisStore {
	connection: ConnectionManager,
}

impl RedisStore {
	/// Connects to `url`, e.g. `redis://localhost:6379`.
	pub async fn connect(url: &str) -> Result<Self, StorageError> {
		if url.is_empty() {
			return Err(StorageError::Config("a redis url is required".to_string()));
		}
		let client = Client::open(url).map_err(|e| StorageError::Connection(e.to_string()))?;
		let connection = ConnectionManager::new(client)
			.await
			.map_err(|e| StorageError::Connection(e.to_string()))?;

		Ok(Self { connection })
	}

	/// Connects to `host:port`.
	pub async fn connect_host(host: &str, port: u16) -> Result<Self, StorageError> {
		if host.is_empty() {
			return Err(StorageError::Config("a redis host is required".to_string()));
		}
		Self::connect(&format!("redis://{}:{}/", host, port)).await
	}

	/// Wraps an existing connection manager.
	pub fn from_connection(connection: ConnectionManager) -> Self {
		Self { connection }
	}

	/// Get the underlying connection manager.
	pub fn connection(&self) -> &ConnectionManager {
		&self.connection
	}
}

#[async_trait]
impl KeyValueStore for RedisStore {
	async fn index(&self, set_key: &str, ttl_key: &str) -> Result<(Vec<String>, Option<String>), StorageError> {
		let mut conn = self.connection.clone();
		let (members, ttl): (Vec<String>, Option<String>) = redis::pipe()
			.atomic()
			.smembers(set_key)
			.get(ttl_key)
			.query_async(&mut conn)
			.await?;
		Ok((members, ttl))
	}

	async fn records(&self, keys: &[String]) -> Result<Vec<HashMap<String, String>>, StorageError> {
		if keys.is_empty() {
			return Ok(Vec::new());
		}

		let mut conn = self.connection.clone();
		let mut pipe = redis::pipe();
		for key in keys {
			pipe.hgetall(key);
		}
		let hashes: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;
		Ok(hashes)
	}
}

impl RedisAdapter {
	/// Connects to `url` and builds an adapter with the default namespace and TTL.
	pub async fn connect(url: &str) -> Result<Self, StorageError> {
		Ok(Self::new(RedisStore::connect(url).await?))
	}
}
