/* src/table/replace.rs */

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use super::{Entry, FlagTable, Meta, Origin, TableChange, TableHolder};
use crate::flag::Flag;

impl TableHolder {
	/// Atomically replaces every storage entry with `flags`.
	///
	/// Registered entries absent from `flags` are carried over; a storage
	/// definition with the same name as a registered entry takes its place.
	pub(crate) fn replace_all(&self, flags: Vec<Flag>) -> TableChange {
		let mut new_entries: HashMap<String, Entry> = HashMap::with_capacity(flags.len());
		for flag in flags {
			let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
			new_entries.insert(
				flag.name().to_string(),
				Entry {
					flag: Arc::new(flag),
					meta: Meta {
						origin: Origin::Storage,
						loaded_at: Instant::now(),
						version,
					},
				},
			);
		}
		let table_version = self.version.fetch_add(1, Ordering::SeqCst) + 1;

		// Capture the replaced table inside rcu so the change report matches what was swapped out.
		let old_table: RefCell<Arc<FlagTable>> = RefCell::new(Arc::new(FlagTable::default()));

		self.inner.rcu(|current| {
			*old_table.borrow_mut() = Arc::clone(current);
			let mut entries = new_entries.clone();

			for (name, entry) in current.entries.iter() {
				if !entries.contains_key(name) && entry.meta.origin == Origin::Registered {
					entries.insert(name.clone(), entry.clone());
				}
			}

			FlagTable {
				entries,
				version: table_version,
			}
		});

		describe_change(&old_table.into_inner(), &new_entries, table_version)
	}
}

fn describe_change(old: &FlagTable, new_entries: &HashMap<String, Entry>, version: u64) -> TableChange {
	let mut change = TableChange {
		version,
		..TableChange::default()
	};

	for name in new_entries.keys() {
		if old.contains(name) {
			change.updated.push(name.clone());
		} else {
			change.added.push(name.clone());
		}
	}

	for (name, entry) in old.iter() {
		if new_entries.contains_key(name) {
			continue;
		}
		match entry.meta.origin {
			Origin::Registered => change.retained.push(name.clone()),
			Origin::Storage => change.removed.push(name.clone()),
		}
	}

	change.sort();
	change
}
