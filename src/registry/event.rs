/* src/registry/event.rs */

use crate::table::TableChange;

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Where a reported failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
	/// Fetching from the adapter.
	Fetch,
	/// Validating a definition set.
	Definitions,
	/// The adapter's change notification reported a failure.
	Push,
	/// Starting the adapter's change notifications.
	Watch,
	/// A custom predicate failed while building a snapshot.
	Predicate,
}

/// Events emitted by the registry.
///
/// Events may be dropped if subscribers fall more than the channel capacity behind.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
	/// A fetch from the adapter started.
	Refreshing,
	/// A new table is installed and visible to readers.
	Ready(TableChange),
	/// The adapter pushed a definition set.
	Update { definitions: usize },
	/// A flag was registered directly.
	Registered { name: String, replaced: bool },
	/// Something failed; the previous table is still active.
	Error { stage: ErrorStage, message: String },
}

impl RegistryEvent {
	pub fn is_ready(&self) -> bool {
		matches!(self, Self::Ready(_))
	}

	pub fn is_error(&self) -> bool {
		matches!(self, Self::Error { .. })
	}
}

#[cfg(feature = "stream")]
pub use stream::EventStream;

#[cfg(feature = "stream")]
mod stream {
	use futures_util::Stream;

	use super::RegistryEvent;

	/// [`RegistryEvent`]s as a `Stream`.
	pub struct EventStream {
		pub(crate) inner: tokio_stream::wrappers::BroadcastStream<RegistryEvent>,
	}

	impl Stream for EventStream {
		type Item = Result<RegistryEvent, tokio_stream::wrappers::errors::BroadcastStreamRecvError>;

		fn poll_next(
			mut self: std::pin::Pin<&mut Self>,
			cx: &mut std::task::Context<'_>,
		) -> std::task::Poll<Option<Self::Item>> {
			std::pin::Pin::new(&mut self.inner).poll_next(cx)
		}
	}
}
