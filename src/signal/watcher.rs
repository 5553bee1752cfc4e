/* src/signal/watcher.rs */

use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::target::FileTarget;
use super::worker::process_events;
use super::{Config, Event, Result};

/// Watches one file and broadcasts debounced change events.
///
/// Must be created inside a tokio runtime.
pub struct Watcher {
	_internal_watcher: RecommendedWatcher,
	task_handle: JoinHandle<()>,
	event_tx: broadcast::Sender<Event>,
}

impl Watcher {
	/// Creates a new Watcher and starts monitoring immediately.
	#[must_use = "Watcher must be kept alive"]
	pub fn new(path: impl Into<PathBuf>, config: Config) -> Result<Self> {
		let path = path.into();
		let target = FileTarget::new(&path)?;

		let (raw_tx, raw_rx) = mpsc::channel(100);

		let mut internal_watcher =
			notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
				let _ = raw_tx.blocking_send(res);
			})?;

		internal_watcher.watch(&target.dir, RecursiveMode::NonRecursive)?;
		tracing::debug!("Watching {:?} in {:?}", path, target.dir);

		let (user_tx, _) = broadcast::channel(100);
		let tx_clone = user_tx.clone();

		let task_handle = tokio::spawn(async move {
			process_events(raw_rx, tx_clone, target, config).await;
		});

		Ok(Self {
			_internal_watcher: internal_watcher,
			task_handle,
			event_tx: user_tx,
		})
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.event_tx.subscribe()
	}

	pub fn stop(&self) {
		self.task_handle.abort();
	}
}

impl Drop for Watcher {
	fn drop(&mut self) {
		self.task_handle.abort();
	}
}
