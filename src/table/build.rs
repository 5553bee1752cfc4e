/* src/table/build.rs */

use std::collections::{HashMap, HashSet};

use super::FlagTable;
use crate::flag::{DefinitionError, Flag, FlagDef, Predicate};

/// Validates a definition set against the current table and turns it into flags.
///
/// A custom definition takes its predicate from `registered` first, then from
/// the custom flag currently installed under the same name.
///
/// Fails on the first invalid definition; nothing is installed in that case.
pub(crate) fn build_flags(
	defs: &[FlagDef],
	current: &FlagTable,
	registered: &HashMap<String, Predicate>,
) -> Result<Vec<Flag>, DefinitionError> {
	let mut seen = HashSet::with_capacity(defs.len());
	let mut flags = Vec::with_capacity(defs.len());

	for def in defs {
		if !seen.insert(def.name.as_str()) {
			return Err(DefinitionError::DuplicateName {
				name: def.name.clone(),
			});
		}
		let predicate = registered
			.get(&def.name)
			.or_else(|| current.get(&def.name).and_then(|flag| flag.predicate()));
		flags.push(Flag::from_def_with(def, predicate)?);
	}

	Ok(flags)
}
