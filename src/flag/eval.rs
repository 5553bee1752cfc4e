/* src/flag/eval.rs */

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::{Flag, FlagKind, PredicateError};
use crate::context::Context;

/// Outcome of evaluating one flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evaluation {
	Bool(bool),
	/// The label picked for a grouped flag.
	Group(String),
}

impl Evaluation {
	/// Truthiness used by gates: `Bool(b)` is `b`, a group label is active when non-empty.
	pub fn is_active(&self) -> bool {
		match self {
			Self::Bool(b) => *b,
			Self::Group(label) => !label.is_empty(),
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			Self::Group(_) => None,
		}
	}

	pub fn as_group(&self) -> Option<&str> {
		match self {
			Self::Group(label) => Some(label),
			Self::Bool(_) => None,
		}
	}
}

impl Default for Evaluation {
	fn default() -> Self {
		Self::Bool(false)
	}
}

impl From<bool> for Evaluation {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<&str> for Evaluation {
	fn from(value: &str) -> Self {
		Self::Group(value.to_string())
	}
}

impl From<String> for Evaluation {
	fn from(value: String) -> Self {
		Self::Group(value)
	}
}

impl PartialEq<bool> for Evaluation {
	fn eq(&self, other: &bool) -> bool {
		self.as_bool() == Some(*other)
	}
}

impl PartialEq<&str> for Evaluation {
	fn eq(&self, other: &&str) -> bool {
		self.as_group() == Some(*other)
	}
}

/// Evaluates `flag` for `ctx`, drawing from `rng` for metered and grouped flags.
///
/// A disabled flag is `Bool(false)` whatever its kind. A metered flag is active
/// when a uniform draw in `[0, 100)` falls below its chance, so `chance = 0`
/// never fires and `chance = 100` always does. Grouped flags pick a label
/// uniformly on every call; there is no stickiness between calls.
pub fn evaluate<R: Rng>(flag: &Flag, ctx: &Context, rng: &mut R) -> Result<Evaluation, PredicateError> {
	if !flag.enabled {
		return Ok(Evaluation::Bool(false));
	}

	match &flag.kind {
		FlagKind::Boolean => Ok(Evaluation::Bool(true)),
		FlagKind::Metered { chance } => {
			let draw: f64 = rng.random_range(0.0..100.0);
			Ok(Evaluation::Bool(draw < *chance))
		}
		FlagKind::Grouped { groups } => Ok(groups
			.choose(rng)
			.map(|label| Evaluation::Group(label.clone()))
			.unwrap_or_default()),
		FlagKind::Custom { predicate } => predicate.call(ctx).map(Evaluation::Bool),
	}
}
