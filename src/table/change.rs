/* src/table/change.rs */

/// What a table swap did, reported with the `Ready` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableChange {
	/// Version of the table that was installed.
	pub version: u64,
	/// Names that were newly added.
	pub added: Vec<String>,
	/// Names that existed before and were replaced.
	pub updated: Vec<String>,
	/// Names that were dropped.
	pub removed: Vec<String>,
	/// Registered names kept although the new definitions omitted them.
	pub retained: Vec<String>,
}

impl TableChange {
	pub fn is_empty(&self) -> bool {
		self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
	}

	pub(crate) fn sort(&mut self) {
		self.added.sort();
		self.updated.sort();
		self.removed.sort();
		self.retained.sort();
	}
}
