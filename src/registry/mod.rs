/* src/registry/mod.rs */

//!
//! The registry: owns the current flag table, keeps it synchronized with a
//! storage adapter and evaluates flags on request.

mod builder;
mod eval;
mod event;
mod refresh;

pub use builder::{DEFAULT_EXPORT_NAME, Options, RegistryBuilder};
#[cfg(feature = "stream")]
pub use event::EventStream;
pub use event::{DEFAULT_EVENT_CAPACITY, ErrorStage, RegistryEvent};
pub use refresh::MAX_REFRESH_INTERVAL;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

use crate::flag::{Flag, Predicate};
use crate::storage::StorageAdapter;
use crate::table::{FlagTable, TableHolder};

/// Evaluates feature flags against a [`Context`](crate::Context) and keeps
/// them in sync with a [`StorageAdapter`].
///
/// Cheap to clone; clones share the same table, timer and event channel.
/// The background tasks stop when [`shutdown`](Self::shutdown) is called or
/// the last clone is dropped.
#[derive(Clone)]
pub struct Registry {
	inner: Arc<Inner>,
}

pub(crate) struct Inner {
	table: TableHolder,
	storage: Option<Arc<dyn StorageAdapter>>,
	options: Options,
	events: broadcast::Sender<RegistryEvent>,
	refresh: RefreshState,
	rng: SharedRng,
	/// Predicates handed to the registry, kept after their table entries go.
	predicates: Mutex<HashMap<String, Predicate>>,
	push_task: Mutex<Option<AbortHandle>>,
	shut_down: AtomicBool,
}

/// TTL, timer and serialization state of the refresh loop.
#[derive(Default)]
struct RefreshState {
	ttl: Mutex<Option<Duration>>,
	timer: Mutex<Option<AbortHandle>>,
	in_flight: AtomicBool,
	lock: tokio::sync::Mutex<()>,
}

/// A `StdRng` shared between evaluating threads.
///
/// The lock is taken per draw, never across a predicate call.
struct SharedRng(Mutex<StdRng>);

impl SharedRng {
	fn new(seed: Option<u64>) -> Self {
		let rng = match seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		};
		Self(Mutex::new(rng))
	}

	fn with<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
		f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner))
	}
}

impl RngCore for &SharedRng {
	fn next_u32(&mut self) -> u32 {
		self.with(|rng| rng.next_u32())
	}

	fn next_u64(&mut self) -> u64 {
		self.with(|rng| rng.next_u64())
	}

	fn fill_bytes(&mut self, dest: &mut [u8]) {
		self.with(|rng| rng.fill_bytes(dest))
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		self.stop_tasks();
		if let Some(storage) = &self.storage {
			storage.close();
		}
	}
}

impl Inner {
	fn stop_tasks(&self) {
		if let Some(handle) = self.refresh.timer.lock().unwrap_or_else(PoisonError::into_inner).take() {
			handle.abort();
		}
		if let Some(handle) = self.push_task.lock().unwrap_or_else(PoisonError::into_inner).take() {
			handle.abort();
		}
	}

	fn emit(&self, event: RegistryEvent) {
		// No subscribers is fine.
		let _ = self.events.send(event);
	}
}

impl Registry {
	pub fn builder() -> RegistryBuilder {
		RegistryBuilder::new()
	}

	pub(crate) fn from_parts(
		storage: Option<Arc<dyn StorageAdapter>>,
		table: FlagTable,
		options: Options,
		seed: Option<u64>,
	) -> Self {
		let (events, _) = broadcast::channel(options.event_capacity);
		let predicates = table
			.iter()
			.filter_map(|(name, entry)| entry.flag.predicate().map(|predicate| (name.clone(), predicate.clone())))
			.collect();
		Self {
			inner: Arc::new(Inner {
				table: TableHolder::new(table),
				storage,
				options,
				events,
				refresh: RefreshState::default(),
				rng: SharedRng::new(seed),
				predicates: Mutex::new(predicates),
				push_task: Mutex::new(None),
				shut_down: AtomicBool::new(false),
			}),
		}
	}

	/// Snapshot of the current table.
	pub fn table(&self) -> Arc<FlagTable> {
		self.inner.table.load_full()
	}

	pub fn get(&self, name: &str) -> Option<Arc<Flag>> {
		self.inner.table.load().get(name).cloned()
	}

	/// Names in the current table, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.inner.table.load().names().map(str::to_string).collect();
		names.sort();
		names
	}

	pub fn len(&self) -> usize {
		self.inner.table.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.table.load().is_empty()
	}

	/// The refresh interval currently in effect, if recurring refresh is on.
	pub fn ttl(&self) -> Option<Duration> {
		*self.inner.refresh.ttl.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Returns true while a fetch is in progress.
	pub fn is_refreshing(&self) -> bool {
		self.inner.refresh.in_flight.load(Ordering::SeqCst)
	}

	pub fn options(&self) -> &Options {
		&self.inner.options
	}

	/// The storage adapter, if the registry was built with one.
	pub fn storage(&self) -> Option<&Arc<dyn StorageAdapter>> {
		self.inner.storage.as_ref()
	}

	/// Subscribes to registry events.
	pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
		self.inner.events.subscribe()
	}

	/// Registry events as a `Stream`.
	#[cfg(feature = "stream")]
	pub fn events(&self) -> EventStream {
		EventStream {
			inner: tokio_stream::wrappers::BroadcastStream::new(self.subscribe()),
		}
	}
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut s = f.debug_struct("Registry");
		s.field("flags", &self.len());
		s.field("storage", &self.inner.storage.as_ref().map(|storage| storage.name()));
		s.field("ttl", &self.ttl());
		s.field("options", &self.inner.options);
		s.field("shut_down", &self.inner.shut_down.load(Ordering::SeqCst));
		s.finish()
	}
}
