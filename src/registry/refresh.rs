/* src/registry/refresh.rs */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use super::{ErrorStage, Registry, RegistryEvent};
use crate::context::Context;
use crate::error::{ReflipError, Result};
use crate::flag::{Flag, FlagDef, Predicate};
use crate::storage::{AdapterEvent, Fetched};
use crate::table::{Origin, TableChange, build_flags};

/// Longest refresh interval a source may request; longer TTLs are capped to it.
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Marks a fetch as in flight for as long as it lives.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
	fn enter(flag: &'a AtomicBool) -> Self {
		flag.store(true, Ordering::SeqCst);
		Self(flag)
	}
}

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

impl Registry {
	/// Subscribes to the adapter's change notifications and performs the initial refresh.
	///
	/// Calling it again restarts the push subscription.
	pub async fn start(&self) -> Result<()> {
		self.ensure_running()?;
		let Some(storage) = self.inner.storage.clone() else {
			return Ok(());
		};

		match storage.watch().await {
			Ok(Some(rx)) => self.spawn_push_task(rx),
			Ok(None) => tracing::debug!("Storage '{}' has no change notifications", storage.name()),
			Err(e) => {
				tracing::error!("Failed to watch storage '{}': {}", storage.name(), e);
				self.report(ErrorStage::Watch, &e);
				return Err(e.into());
			}
		}

		self.refresh().await
	}

	/// Fetches the definitions and swaps in a new table.
	///
	/// Concurrent calls are serialized. On failure the previous table stays
	/// active, an `Error` event is emitted and the error is returned.
	pub async fn refresh(&self) -> Result<()> {
		self.ensure_running()?;
		let Some(storage) = self.inner.storage.clone() else {
			return Ok(());
		};

		let _guard = self.inner.refresh.lock.lock().await;
		let _in_flight = InFlight::enter(&self.inner.refresh.in_flight);
		self.inner.emit(RegistryEvent::Refreshing);
		tracing::debug!("Fetching definitions from '{}'", storage.name());

		let fetched = match storage.fetch().await {
			Ok(fetched) => fetched,
			Err(e) => {
				tracing::warn!("Fetch from '{}' failed: {}", storage.name(), e);
				self.report(ErrorStage::Fetch, &e);
				return Err(e.into());
			}
		};

		self.schedule(fetched.ttl);
		self.install(&fetched.definitions)?;
		Ok(())
	}

	/// Replaces the whole table with `definitions` without fetching.
	///
	/// Waits for an in-flight refresh or push, so its result cannot overwrite this one.
	pub async fn update(&self, definitions: &[FlagDef]) -> Result<TableChange> {
		self.ensure_running()?;
		let _guard = self.inner.refresh.lock.lock().await;
		self.install(definitions)
	}

	/// Inserts or overwrites one flag and returns the one it replaced.
	///
	/// Registered flags outlive later definition sets that do not mention them.
	/// A registered predicate stays available to custom definitions of the same
	/// name until the name is unregistered or registered again without one.
	pub fn register(&self, flag: Flag) -> Option<Arc<Flag>> {
		let name = flag.name().to_string();
		{
			let mut predicates = self.inner.predicates.lock().unwrap_or_else(PoisonError::into_inner);
			match flag.predicate() {
				Some(predicate) => predicates.insert(name.clone(), predicate.clone()),
				None => predicates.remove(&name),
			};
		}
		let previous = self.inner.table.insert(flag, Origin::Registered);
		tracing::debug!("Registered flag '{}' (replaced: {})", name, previous.is_some());
		self.inner.emit(RegistryEvent::Registered {
			replaced: previous.is_some(),
			name,
		});
		previous
	}

	/// Registers an enabled custom flag backed by `check`.
	pub fn register_fn<F>(&self, name: impl Into<String>, check: F) -> Result<Option<Arc<Flag>>>
	where
		F: Fn(&Context) -> bool + Send + Sync + 'static,
	{
		let flag = Flag::custom(name, Predicate::new(check))?;
		Ok(self.register(flag))
	}

	/// Removes a flag whatever its origin. Later lookups fall back to the default.
	pub fn unregister(&self, name: &str) -> Option<Arc<Flag>> {
		self.inner
			.predicates
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(name);
		let removed = self.inner.table.remove(name);
		if removed.is_some() {
			tracing::debug!("Unregistered flag '{}'", name);
		}
		removed
	}

	/// Stops the refresh timer and push task and closes the adapter.
	///
	/// The table stays readable. Safe to call more than once.
	pub fn shutdown(&self) {
		if self.inner.shut_down.swap(true, Ordering::SeqCst) {
			return;
		}
		self.inner.stop_tasks();
		*self.inner.refresh.ttl.lock().unwrap_or_else(PoisonError::into_inner) = None;
		if let Some(storage) = &self.inner.storage {
			storage.close();
		}
		tracing::info!("Registry shut down");
	}

	pub fn is_shut_down(&self) -> bool {
		self.inner.shut_down.load(Ordering::SeqCst)
	}

	fn ensure_running(&self) -> Result<()> {
		if self.is_shut_down() {
			return Err(ReflipError::ShutDown);
		}
		Ok(())
	}

	fn report(&self, stage: ErrorStage, error: &dyn std::fmt::Display) {
		self.inner.emit(RegistryEvent::Error {
			stage,
			message: error.to_string(),
		});
	}

	/// Validates `definitions`, swaps the table and emits `Ready`.
	fn install(&self, definitions: &[FlagDef]) -> Result<TableChange> {
		let current = self.inner.table.load_full();
		let built = {
			let predicates = self.inner.predicates.lock().unwrap_or_else(PoisonError::into_inner);
			build_flags(definitions, &current, &predicates)
		};
		let flags = match built {
			Ok(flags) => flags,
			Err(e) => {
				tracing::warn!("Rejected definition set, keeping table v{}: {}", current.version(), e);
				self.report(ErrorStage::Definitions, &e);
				return Err(e.into());
			}
		};

		let change = self.inner.table.replace_all(flags);
		tracing::info!(
			"Installed flag table v{} (+{} ~{} -{})",
			change.version,
			change.added.len(),
			change.updated.len(),
			change.removed.len()
		);
		self.inner.emit(RegistryEvent::Ready(change.clone()));
		Ok(change)
	}

	/// Adopts `ttl` and restarts the recurring refresh. Zero or `None` stops it.
	fn schedule(&self, ttl: Option<Duration>) {
		let ttl = ttl
			.filter(|ttl| !ttl.is_zero())
			.map(|ttl| ttl.min(MAX_REFRESH_INTERVAL));
		*self.inner.refresh.ttl.lock().unwrap_or_else(PoisonError::into_inner) = ttl;

		let mut timer = self.inner.refresh.timer.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(handle) = timer.take() {
			handle.abort();
		}

		let Some(period) = ttl else {
			tracing::debug!("Recurring refresh disabled");
			return;
		};
		if self.is_shut_down() {
			return;
		}

		let weak = Arc::downgrade(&self.inner);
		let handle = tokio::spawn(async move {
			let mut interval = tokio::time::interval_at(Instant::now() + period, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				interval.tick().await;
				let Some(inner) = weak.upgrade() else {
					break;
				};
				if inner.refresh.in_flight.load(Ordering::SeqCst) {
					tracing::debug!("Skipping scheduled refresh, one is already running");
					continue;
				}
				let registry = Registry { inner };
				// Failures are already reported as events.
				let _ = registry.refresh().await;
			}
		});
		*timer = Some(handle.abort_handle());
		tracing::debug!("Refreshing every {:?}", period);
	}

	fn spawn_push_task(&self, mut rx: broadcast::Receiver<AdapterEvent>) {
		let weak = Arc::downgrade(&self.inner);
		let handle = tokio::spawn(async move {
			loop {
				let event = match rx.recv().await {
					Ok(event) => event,
					Err(broadcast::error::RecvError::Lagged(skipped)) => {
						tracing::warn!("Push channel lagged, {} notifications skipped", skipped);
						continue;
					}
					Err(broadcast::error::RecvError::Closed) => break,
				};
				let Some(inner) = weak.upgrade() else {
					break;
				};
				Registry { inner }.on_push(event).await;
			}
		});

		let mut slot = self.inner.push_task.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(previous) = slot.replace(handle.abort_handle()) {
			previous.abort();
		}
	}

	async fn on_push(&self, event: AdapterEvent) {
		if self.is_shut_down() {
			return;
		}
		match event {
			AdapterEvent::Update(fetched) => {
				let _guard = self.inner.refresh.lock.lock().await;
				self.inner.emit(RegistryEvent::Update {
					definitions: fetched.definitions.len(),
				});
				self.apply_push(fetched);
			}
			AdapterEvent::Error(e) => {
				tracing::warn!("Storage reported a failed change: {}", e);
				self.report(ErrorStage::Push, &e);
			}
		}
	}

	fn apply_push(&self, fetched: Fetched) {
		if fetched.ttl.is_some() {
			self.schedule(fetched.ttl);
		}
		// Failures are already reported as events.
		let _ = self.install(&fetched.definitions);
	}
}

