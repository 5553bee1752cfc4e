/* src/registry/builder.rs */

use std::sync::Arc;

use http::StatusCode;

use super::event::DEFAULT_EVENT_CAPACITY;
use super::Registry;
use crate::error::{ReflipError, Result};
use crate::flag::Evaluation;
use crate::storage::StorageAdapter;
use crate::table::FlagTable;

/// Accessor name used when none is configured.
pub const DEFAULT_EXPORT_NAME: &str = "check";

/// Immutable registry configuration.
#[derive(Debug, Clone)]
pub struct Options {
	/// Result for names missing from the table.
	pub default: Evaluation,
	/// Status a gate reports when it rejects without a custom handler.
	pub http_code: StatusCode,
	/// Name under which snapshots are attached to the context.
	pub export_name: String,
	pub event_capacity: usize,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			default: Evaluation::Bool(false),
			http_code: StatusCode::NOT_FOUND,
			export_name: DEFAULT_EXPORT_NAME.to_string(),
			event_capacity: DEFAULT_EVENT_CAPACITY,
		}
	}
}

/// Builder for [`Registry`].
///
/// Exactly one of [`storage`](Self::storage) or [`features`](Self::features) is required.
pub struct RegistryBuilder {
	storage: Option<Arc<dyn StorageAdapter>>,
	features: Option<FlagTable>,
	default: Evaluation,
	http_code: u16,
	export_name: String,
	event_capacity: usize,
	seed: Option<u64>,
}

impl RegistryBuilder {
	pub fn new() -> Self {
		let options = Options::default();
		Self {
			storage: None,
			features: None,
			default: options.default,
			http_code: options.http_code.as_u16(),
			export_name: options.export_name,
			event_capacity: options.event_capacity,
			seed: None,
		}
	}

	pub fn storage(self, storage: impl StorageAdapter + 'static) -> Self {
		self.shared_storage(Arc::new(storage))
	}

	/// Like [`storage`](Self::storage) for an adapter the caller keeps a handle to.
	pub fn shared_storage(mut self, storage: Arc<dyn StorageAdapter>) -> Self {
		self.storage = Some(storage);
		self
	}

	/// A pre-built table, for registries without storage.
	pub fn features(mut self, table: FlagTable) -> Self {
		self.features = Some(table);
		self
	}

	pub fn default_value(mut self, default: impl Into<Evaluation>) -> Self {
		self.default = default.into();
		self
	}

	pub fn http_code(mut self, code: u16) -> Self {
		self.http_code = code;
		self
	}

	pub fn export_name(mut self, name: impl Into<String>) -> Self {
		self.export_name = name.into();
		self
	}

	pub fn event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	/// Seeds the random source used by metered and grouped flags.
	pub fn seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		self
	}

	pub fn build(self) -> Result<Registry> {
		let table = match (self.storage.is_some(), self.features) {
			(true, Some(_)) => {
				return Err(ReflipError::Precondition(
					"pass either storage or a pre-built feature table, not both".to_string(),
				));
			}
			(false, None) => {
				return Err(ReflipError::Precondition(
					"either storage or a pre-built feature table is required".to_string(),
				));
			}
			(true, None) => FlagTable::new(),
			(false, Some(table)) => table,
		};

		let http_code = StatusCode::from_u16(self.http_code)
			.map_err(|_| ReflipError::Precondition(format!("invalid http code: {}", self.http_code)))?;

		if self.export_name.is_empty() {
			return Err(ReflipError::Precondition("export name must not be empty".to_string()));
		}

		if self.event_capacity == 0 {
			return Err(ReflipError::Precondition("event capacity must be positive".to_string()));
		}

		let options = Options {
			default: self.default,
			http_code,
			export_name: self.export_name,
			event_capacity: self.event_capacity,
		};

		Ok(Registry::from_parts(self.storage, table, options, self.seed))
	}
}

impl Default for RegistryBuilder {
	fn default() -> Self {
		Self::new()
	}
}
