/* src/table/mod.rs */

//!
//! The immutable flag table and the holder that swaps it atomically.

mod build;
mod change;
mod entry;
mod replace;
mod write;

pub use change::TableChange;
pub use entry::{Entry, Meta, Origin};

pub(crate) use build::build_flags;

use std::collections::HashMap;
use std::collections::hash_map;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use arc_swap::{ArcSwap, Guard};

use crate::flag::{DefinitionError, Flag};

/// An immutable name to flag mapping. A new table replaces the old one wholesale.
#[derive(Debug, Clone, Default)]
pub struct FlagTable {
	entries: HashMap<String, Entry>,
	version: u64,
}

impl FlagTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a table from pre-built flags. Duplicate names are rejected.
	pub fn from_flags<I>(flags: I) -> Result<Self, DefinitionError>
	where
		I: IntoIterator<Item = Flag>,
	{
		let mut entries = HashMap::new();
		let mut version = 0;
		for flag in flags {
			version += 1;
			let name = flag.name().to_string();
			let entry = Entry {
				flag: Arc::new(flag),
				meta: Meta {
					origin: Origin::Registered,
					loaded_at: Instant::now(),
					version,
				},
			};
			if entries.insert(name.clone(), entry).is_some() {
				return Err(DefinitionError::DuplicateName { name });
			}
		}
		Ok(Self { entries, version })
	}

	pub fn get(&self, name: &str) -> Option<&Arc<Flag>> {
		self.entries.get(name).map(|entry| &entry.flag)
	}

	pub fn entry(&self, name: &str) -> Option<&Entry> {
		self.entries.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> hash_map::Iter<'_, String, Entry> {
		self.entries.iter()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Version of this table; grows with every swap.
	pub fn version(&self) -> u64 {
		self.version
	}
}

/// Holds the current table behind an [`ArcSwap`].
///
/// Readers load the pointer wait-free; writers build a complete new table and
/// swap it in with RCU, so a reader sees either the whole old table or the
/// whole new one.
pub(crate) struct TableHolder {
	inner: ArcSwap<FlagTable>,
	version: AtomicU64,
}

impl TableHolder {
	pub(crate) fn new(table: FlagTable) -> Self {
		let version = AtomicU64::new(table.version);
		Self {
			inner: ArcSwap::from_pointee(table),
			version,
		}
	}

	/// Cheap guard for short synchronous reads.
	pub(crate) fn load(&self) -> Guard<Arc<FlagTable>> {
		self.inner.load()
	}

	/// Owned snapshot of the current table.
	pub(crate) fn load_full(&self) -> Arc<FlagTable> {
		self.inner.load_full()
	}
}
