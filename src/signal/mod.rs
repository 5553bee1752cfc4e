/* src/signal/mod.rs */

//!
//! Debounced OS notifications for a single definition file.

use std::path::PathBuf;
use std::time::Duration;

mod target;
mod watcher;
mod worker;

pub use watcher::Watcher;

/// Errors raised while setting up a watcher.
#[derive(thiserror::Error, Debug)]
pub enum SignalError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Notify error: {0}")]
	Notify(#[from] notify::Error),

	#[error("Invalid configuration: {0}")]
	Config(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, SignalError>;

/// Configuration for the watcher behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// Time window to debounce events.
	pub debounce: Duration,

	/// Whether to coalesce continuous events of the file into a single event.
	pub coalesce: bool,

	/// Specific event kinds to listen for; `None` means all.
	pub listen_events: Option<Vec<EventKind>>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			debounce: Duration::from_millis(500),
			coalesce: true,
			listen_events: None,
		}
	}
}

impl Config {
	pub fn with_debounce(mut self, debounce: Duration) -> Self {
		self.debounce = debounce;
		self
	}
}

/// The kind of filesystem event we care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	/// File was created or renamed into place.
	Create,
	/// File content or name was modified.
	Modify,
	/// File was removed.
	Remove,
}

/// A simplified, high-level filesystem event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
	pub path: PathBuf,
	pub kind: EventKind,
}
