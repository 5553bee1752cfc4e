/* src/flag/def.rs */

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// The `type` tag of a raw definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
	#[default]
	Boolean,
	Metered,
	Grouped,
	Custom,
}

impl FlagType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Boolean => "boolean",
			Self::Metered => "metered",
			Self::Grouped => "grouped",
			Self::Custom => "custom",
		}
	}
}

impl std::str::FromStr for FlagType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"boolean" => Ok(Self::Boolean),
			"metered" => Ok(Self::Metered),
			"grouped" => Ok(Self::Grouped),
			"custom" => Ok(Self::Custom),
			other => Err(format!("unknown flag type '{other}'")),
		}
	}
}

/// A flag definition as delivered by storage, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FlagDef {
	#[validate(length(min = 1))]
	pub name: String,
	#[serde(rename = "type", default)]
	pub kind: FlagType,
	#[serde(default)]
	pub enabled: bool,
	/// Percentage in `0..=100`; only consulted for metered flags.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	#[validate(range(min = 0.0, max = 100.0))]
	pub chance: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	#[validate(length(min = 1))]
	pub groups: Option<Vec<String>>,
}

impl FlagDef {
	pub fn boolean(name: impl Into<String>, enabled: bool) -> Self {
		Self {
			name: name.into(),
			kind: FlagType::Boolean,
			enabled,
			chance: None,
			groups: None,
		}
	}

	pub fn metered(name: impl Into<String>, chance: f64) -> Self {
		Self {
			chance: Some(chance),
			kind: FlagType::Metered,
			..Self::boolean(name, true)
		}
	}

	pub fn grouped<I, S>(name: impl Into<String>, groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			groups: Some(groups.into_iter().map(Into::into).collect()),
			kind: FlagType::Grouped,
			..Self::boolean(name, true)
		}
	}

	/// A custom definition; the predicate must already be registered under `name`.
	pub fn custom(name: impl Into<String>, enabled: bool) -> Self {
		Self {
			kind: FlagType::Custom,
			..Self::boolean(name, enabled)
		}
	}

	pub fn disabled(mut self) -> Self {
		self.enabled = false;
		self
	}
}

/// The definition document: an optional refresh TTL plus the flag list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Document {
	/// Refresh interval in milliseconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ttl: Option<u64>,
	#[serde(default)]
	#[validate(nested)]
	pub features: Vec<FlagDef>,
}

impl Document {
	pub fn new(features: Vec<FlagDef>) -> Self {
		Self { ttl: None, features }
	}

	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
		self
	}

	pub fn ttl(&self) -> Option<Duration> {
		self.ttl.map(Duration::from_millis)
	}
}
