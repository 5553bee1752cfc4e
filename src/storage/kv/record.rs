/* src/storage/kv/record.rs */

use std::collections::HashMap;

use crate::flag::{FlagDef, FlagType};
use crate::storage::StorageError;

/// Converts a flag hash into a definition.
///
/// Every field arrives as a string. `name` falls back to the set member the
/// record was found under; `enabled` accepts `true/false`, `1/0` and `yes/no`;
/// `groups` is either a JSON array or a comma-separated list.
pub fn flag_def_from_record(member: &str, record: &HashMap<String, String>) -> Result<FlagDef, StorageError> {
	let name = match record.get("name").map(|name| name.trim()) {
		Some(name) if !name.is_empty() => name.to_string(),
		_ => member.to_string(),
	};

	let kind = match record.get("type") {
		Some(raw) => raw
			.parse::<FlagType>()
			.map_err(|e| invalid(&name, "type", e))?,
		None => FlagType::default(),
	};

	let enabled = match record.get("enabled") {
		Some(raw) => parse_bool(raw).ok_or_else(|| invalid(&name, "enabled", format!("'{}' is not a boolean", raw)))?,
		None => false,
	};

	let chance = match record.get("chance").map(|raw| raw.trim()) {
		None | Some("") => None,
		Some(raw) => Some(
			raw.parse::<f64>()
				.map_err(|e| invalid(&name, "chance", e.to_string()))?,
		),
	};

	let groups = match record.get("groups") {
		None => None,
		Some(raw) => Some(parse_groups(raw).map_err(|e| invalid(&name, "groups", e))?),
	};

	Ok(FlagDef {
		name,
		kind,
		enabled,
		chance,
		groups,
	})
}

/// The hash fields written for `def`, inverse of [`flag_def_from_record`].
pub fn record_from_flag_def(def: &FlagDef) -> Vec<(String, String)> {
	let mut fields = vec![
		("name".to_string(), def.name.clone()),
		("type".to_string(), def.kind.as_str().to_string()),
		("enabled".to_string(), def.enabled.to_string()),
	];
	if let Some(chance) = def.chance {
		fields.push(("chance".to_string(), chance.to_string()));
	}
	if let Some(groups) = &def.groups {
		fields.push(("groups".to_string(), groups.join(",")));
	}
	fields
}

fn parse_bool(raw: &str) -> Option<bool> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" => Some(true),
		"false" | "0" | "no" | "" => Some(false),
		_ => None,
	}
}

fn parse_groups(raw: &str) -> Result<Vec<String>, String> {
	let raw = raw.trim();

	#[cfg(feature = "json")]
	if raw.starts_with('[') {
		return serde_json::from_str(raw).map_err(|e| e.to_string());
	}

	Ok(raw
		.split(',')
		.map(str::trim)
		.filter(|group| !group.is_empty())
		.map(str::to_string)
		.collect())
}

fn invalid(name: &str, field: &str, reason: impl std::fmt::Display) -> StorageError {
	StorageError::Parse(format!("field '{}' of flag '{}': {}", field, name, reason))
}
