/* src/table/entry.rs */

use std::sync::Arc;
use std::time::Instant;

use crate::flag::Flag;

/// Where a table entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
	/// Delivered by the storage adapter; dropped when a later definition set omits it.
	#[default]
	Storage,
	/// Added through `register`; survives full replaces unless storage redefines the name.
	Registered,
}

/// Metadata associated with a table entry.
#[derive(Debug, Clone)]
pub struct Meta {
	pub origin: Origin,
	/// When the entry was installed.
	pub loaded_at: Instant,
	/// Version number, auto-incremented on each change.
	pub version: u64,
}

/// A flag plus its metadata.
#[derive(Debug, Clone)]
pub struct Entry {
	pub flag: Arc<Flag>,
	pub meta: Meta,
}
