/* src/context.rs */

//!
//! Per-request evaluation context and the snapshots cached on it.

use std::collections::HashMap;

use crate::flag::Evaluation;

/// Request-scoped data handed to predicates, plus any snapshots the
/// [`Flip`](crate::middleware::Flip) middleware attached to it.
#[derive(Debug, Clone, Default)]
pub struct Context {
	attributes: HashMap<String, String>,
	snapshots: HashMap<String, Snapshot>,
}

impl Context {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.set_attribute(key, value);
		self
	}

	pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.attributes.insert(key.into(), value.into());
	}

	pub fn attribute(&self, key: &str) -> Option<&str> {
		self.attributes.get(key).map(String::as_str)
	}

	pub fn attributes(&self) -> &HashMap<String, String> {
		&self.attributes
	}

	/// The snapshot stored under `accessor` (the registry's export name).
	pub fn snapshot(&self, accessor: &str) -> Option<&Snapshot> {
		self.snapshots.get(accessor)
	}

	/// Stores `snapshot` under `accessor`, replacing any earlier one.
	pub fn attach(&mut self, accessor: impl Into<String>, snapshot: Snapshot) {
		self.snapshots.insert(accessor.into(), snapshot);
	}
}

/// Evaluations of every flag for one request, computed once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
	values: HashMap<String, Evaluation>,
	default: Evaluation,
}

impl Snapshot {
	pub fn new(values: HashMap<String, Evaluation>, default: Evaluation) -> Self {
		Self { values, default }
	}

	/// The full name to evaluation map.
	pub fn all(&self) -> &HashMap<String, Evaluation> {
		&self.values
	}

	/// The evaluation for `name`, or the registry default when absent.
	pub fn get(&self, name: &str) -> Evaluation {
		self.values.get(name).unwrap_or(&self.default).clone()
	}

	/// Truthiness of [`get`](Self::get) without cloning.
	pub fn check(&self, name: &str) -> bool {
		self.values.get(name).unwrap_or(&self.default).is_active()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.values.contains_key(name)
	}

	pub fn default_value(&self) -> &Evaluation {
		&self.default
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}
