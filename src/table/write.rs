/* src/table/write.rs */

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use super::{Entry, FlagTable, Meta, Origin, TableHolder};
use crate::flag::Flag;

impl TableHolder {
	/// Inserts or overwrites one flag, keeping every other entry.
	///
	/// Returns the flag previously stored under the same name.
	pub(crate) fn insert(&self, flag: Flag, origin: Origin) -> Option<Arc<Flag>> {
		let name = flag.name().to_string();
		let entry = Entry {
			flag: Arc::new(flag),
			meta: Meta {
				origin,
				loaded_at: Instant::now(),
				version: self.version.fetch_add(1, Ordering::SeqCst) + 1,
			},
		};
		let table_version = entry.meta.version;

		let old_entry: RefCell<Option<Entry>> = RefCell::new(None);

		self.inner.rcu(|table| {
			*old_entry.borrow_mut() = table.entries.get(&name).cloned();
			let mut entries = table.entries.clone();
			entries.insert(name.clone(), entry.clone());
			FlagTable {
				entries,
				version: table_version,
			}
		});

		old_entry.into_inner().map(|entry| entry.flag)
	}

	/// Removes a flag by name, whatever its origin.
	pub(crate) fn remove(&self, name: &str) -> Option<Arc<Flag>> {
		// Pre-check to avoid an unnecessary clone in rcu.
		if !self.inner.load().contains(name) {
			return None;
		}

		let table_version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
		let removed: RefCell<Option<Arc<Flag>>> = RefCell::new(None);

		self.inner.rcu(|table| {
			let mut entries = table.entries.clone();
			*removed.borrow_mut() = entries.remove(name).map(|entry| entry.flag);
			FlagTable {
				entries,
				version: table_version,
			}
		});

		removed.into_inner()
	}
}
