/* src/storage/memory.rs */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{AdapterEvent, DEFAULT_PUSH_CAPACITY, Fetched, StorageAdapter, StorageError};
use crate::flag::Document;

/// A simple in-memory adapter useful for testing and embedded environments.
///
/// [`set`](Self::set) replaces the document and pushes it to watchers.
pub struct MemoryAdapter {
	document: Mutex<Document>,
	failure: Mutex<Option<String>>,
	events: broadcast::Sender<AdapterEvent>,
	fetches: AtomicUsize,
}

impl MemoryAdapter {
	pub fn new(document: Document) -> Self {
		Self {
			document: Mutex::new(document),
			failure: Mutex::new(None),
			events: broadcast::channel(DEFAULT_PUSH_CAPACITY).0,
			fetches: AtomicUsize::new(0),
		}
	}

	/// Replaces the document and notifies watchers.
	pub fn set(&self, document: Document) {
		*self.document.lock().unwrap_or_else(PoisonError::into_inner) = document.clone();
		let _ = self.events.send(AdapterEvent::Update(document.into()));
	}

	/// Replaces the document without notifying anyone.
	pub fn replace(&self, document: Document) {
		*self.document.lock().unwrap_or_else(PoisonError::into_inner) = document;
	}

	/// Makes the next fetch fail with `message`.
	pub fn fail_next(&self, message: impl Into<String>) {
		*self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
	}

	/// Pushes an adapter-level error to watchers.
	pub fn push_error(&self, message: impl Into<String>) {
		let error = StorageError::Other(message.into());
		let _ = self.events.send(AdapterEvent::Error(Arc::new(error)));
	}

	/// Number of fetches served so far, failed ones included.
	pub fn fetch_count(&self) -> usize {
		self.fetches.load(Ordering::SeqCst)
	}
}

impl Default for MemoryAdapter {
	fn default() -> Self {
		Self::new(Document::default())
	}
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
	fn name(&self) -> &'static str {
		"memory"
	}

	async fn fetch(&self) -> Result<Fetched, StorageError> {
		self.fetches.fetch_add(1, Ordering::SeqCst);
		if let Some(message) = self.failure.lock().unwrap_or_else(PoisonError::into_inner).take() {
			return Err(StorageError::Other(message));
		}
		let document = self.document.lock().unwrap_or_else(PoisonError::into_inner).clone();
		Ok(document.into())
	}

	async fn watch(&self) -> Result<Option<broadcast::Receiver<AdapterEvent>>, StorageError> {
		Ok(Some(self.events.subscribe()))
	}
}
