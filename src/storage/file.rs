/* src/storage/file.rs */

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

use super::{AdapterEvent, DEFAULT_PUSH_CAPACITY, Fetched, StorageAdapter, StorageError};
use crate::flag::Document;
use crate::format::{AnyFormat, Format};
use crate::signal::{Config as WatcherConfig, Watcher};

struct WatchState {
	watcher: Watcher,
	abort_handle: AbortHandle,
}

/// Reads the definition document from a single file and re-reads it whenever
/// the operating system reports a change.
pub struct FileAdapter {
	path: PathBuf,
	format: AnyFormat,
	config: WatcherConfig,
	events: broadcast::Sender<AdapterEvent>,
	state: Mutex<Option<WatchState>>,
	closed: AtomicBool,
}

impl FileAdapter {
	/// Creates an adapter for `path`; the format follows the file extension.
	pub fn new(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let path = path.into();
		if path.as_os_str().is_empty() {
			return Err(StorageError::Config("a file path is required".to_string()));
		}
		let format = AnyFormat::from_path(&path)?;

		Ok(Self {
			path,
			format,
			config: WatcherConfig::default(),
			events: broadcast::channel(DEFAULT_PUSH_CAPACITY).0,
			state: Mutex::new(None),
			closed: AtomicBool::new(false),
		})
	}

	/// Overrides the format picked from the extension.
	pub fn with_format(mut self, format: AnyFormat) -> Self {
		self.format = format;
		self
	}

	pub fn with_watcher_config(mut self, config: WatcherConfig) -> Self {
		self.config = config;
		self
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn format(&self) -> AnyFormat {
		self.format
	}

	/// Reads and parses the whole file.
	pub async fn read(&self) -> Result<Document, StorageError> {
		read_document(&self.path, self.format).await
	}

	/// Returns true while the OS watcher is running.
	pub fn is_watching(&self) -> bool {
		self.state.lock().unwrap_or_else(PoisonError::into_inner).is_some()
	}
}

async fn read_document(path: &Path, format: AnyFormat) -> Result<Document, StorageError> {
	let bytes = tokio::fs::read(path).await?;
	format.parse(&bytes)
}

#[async_trait]
impl StorageAdapter for FileAdapter {
	fn name(&self) -> &'static str {
		"file"
	}

	async fn fetch(&self) -> Result<Fetched, StorageError> {
		self.read().await.map(Fetched::from)
	}

	async fn watch(&self) -> Result<Option<broadcast::Receiver<AdapterEvent>>, StorageError> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(StorageError::Closed);
		}

		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		if state.is_some() {
			return Ok(Some(self.events.subscribe()));
		}

		let watcher = Watcher::new(self.path.clone(), self.config.clone())?;
		let mut rx = watcher.subscribe();
		let events = self.events.clone();
		let path = self.path.clone();
		let format = self.format;
		let receiver = self.events.subscribe();

		let handle = tokio::spawn(async move {
			loop {
				let event = match rx.recv().await {
					Ok(event) => event,
					Err(broadcast::error::RecvError::Lagged(_)) => continue,
					Err(broadcast::error::RecvError::Closed) => break,
				};
				tracing::debug!("Definition file changed ({:?}): {:?}", event.kind, event.path);

				let pushed = match read_document(&path, format).await {
					Ok(document) => AdapterEvent::Update(document.into()),
					Err(e) => {
						tracing::warn!("Failed to reload definitions from {:?}: {}", path, e);
						AdapterEvent::Error(Arc::new(e))
					}
				};
				let _ = events.send(pushed);
			}
		});

		*state = Some(WatchState {
			watcher,
			abort_handle: handle.abort_handle(),
		});
		Ok(Some(receiver))
	}

	fn close(&self) {
		self.closed.store(true, Ordering::SeqCst);
		if let Some(state) = self.state.lock().unwrap_or_else(PoisonError::into_inner).take() {
			state.watcher.stop();
			state.abort_handle.abort();
			tracing::debug!("Stopped watching {:?}", self.path);
		}
	}
}

impl Drop for FileAdapter {
	fn drop(&mut self) {
		self.close();
	}
}

impl std::fmt::Debug for FileAdapter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FileAdapter")
			.field("path", &self.path)
			.field("format", &self.format)
			.field("watching", &self.is_watching())
			.finish_non_exhaustive()
	}
}
