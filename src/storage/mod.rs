/* src/storage/mod.rs */

//!
//! Storage adapters supplying raw flag definitions.
//!
//! - [`FileAdapter`] - a definition document on disk, re-read on change
//! - [`KeyValueAdapter`] - definitions spread over a key-value store
//! - [`MemoryAdapter`] - an in-process document, pushed on demand

mod error;
#[cfg(feature = "file")]
mod file;
pub mod kv;
mod memory;

pub use error::StorageError;
#[cfg(feature = "file")]
pub use file::FileAdapter;
pub use kv::{KeyValueAdapter, KeyValueStore, MemoryStore};
#[cfg(feature = "redis")]
pub use kv::{RedisAdapter, RedisStore};
pub use memory::MemoryAdapter;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::flag::{Document, FlagDef};

/// Capacity of adapter push channels.
pub const DEFAULT_PUSH_CAPACITY: usize = 16;

/// One delivery of definitions from an adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fetched {
	pub definitions: Vec<FlagDef>,
	/// Refresh interval requested by the source; `None` or zero disables polling.
	pub ttl: Option<Duration>,
}

impl From<Document> for Fetched {
	fn from(document: Document) -> Self {
		Self {
			ttl: document.ttl(),
			definitions: document.features,
		}
	}
}

/// Pushed by adapters that can notice changes on their own.
#[derive(Debug, Clone)]
pub enum AdapterEvent {
	/// Fresh definitions are available.
	Update(Fetched),
	/// The source changed but could not be read; previously delivered data stands.
	Error(Arc<StorageError>),
}

/// A source of flag definitions.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
	/// Short label used in logs.
	fn name(&self) -> &'static str;

	/// Reads the full definition set.
	async fn fetch(&self) -> Result<Fetched, StorageError>;

	/// Starts change notifications, if the adapter supports them.
	async fn watch(&self) -> Result<Option<broadcast::Receiver<AdapterEvent>>, StorageError> {
		Ok(None)
	}

	/// Releases notification resources. Must be idempotent.
	fn close(&self) {}
}
