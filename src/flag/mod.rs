/* src/flag/mod.rs */

//!
//! Flag model: validated flags, their raw definitions and evaluation.

mod def;
mod error;
mod eval;
mod predicate;

pub use def::{Document, FlagDef, FlagType};
pub use error::{DefinitionError, PredicateError};
pub use eval::{Evaluation, evaluate};
pub use predicate::Predicate;

use rand::Rng;
use validator::Validate;

use crate::context::Context;

/// Chance used when a metered definition omits one.
pub const DEFAULT_CHANCE: f64 = 100.0;

/// The evaluation rule of a flag.
#[derive(Debug, Clone)]
pub enum FlagKind {
	Boolean,
	Metered { chance: f64 },
	Grouped { groups: Vec<String> },
	Custom { predicate: Predicate },
}

impl FlagKind {
	/// The predicate behind a custom flag.
	pub fn predicate(&self) -> Option<&Predicate> {
		match self {
			Self::Custom { predicate } => Some(predicate),
			_ => None,
		}
	}

	pub fn flag_type(&self) -> FlagType {
		match self {
			Self::Boolean => FlagType::Boolean,
			Self::Metered { .. } => FlagType::Metered,
			Self::Grouped { .. } => FlagType::Grouped,
			Self::Custom { .. } => FlagType::Custom,
		}
	}
}

/// A validated, immutable flag.
#[derive(Debug, Clone)]
pub struct Flag {
	name: String,
	kind: FlagKind,
	enabled: bool,
}

impl Flag {
	/// Builds a flag, checking the name and the kind-specific invariants.
	pub fn new(name: impl Into<String>, kind: FlagKind, enabled: bool) -> Result<Self, DefinitionError> {
		let name = name.into();
		if name.is_empty() {
			return Err(DefinitionError::EmptyName);
		}

		match &kind {
			FlagKind::Metered { chance } if !(0.0..=100.0).contains(chance) => {
				return Err(DefinitionError::ChanceOutOfRange {
					name,
					chance: *chance,
				});
			}
			FlagKind::Grouped { groups } if groups.is_empty() => {
				return Err(DefinitionError::EmptyGroups { name });
			}
			_ => {}
		}

		Ok(Self { name, kind, enabled })
	}

	pub fn boolean(name: impl Into<String>, enabled: bool) -> Result<Self, DefinitionError> {
		Self::new(name, FlagKind::Boolean, enabled)
	}

	pub fn metered(name: impl Into<String>, chance: f64) -> Result<Self, DefinitionError> {
		Self::new(name, FlagKind::Metered { chance }, true)
	}

	pub fn grouped<I, S>(name: impl Into<String>, groups: I) -> Result<Self, DefinitionError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let groups = groups.into_iter().map(Into::into).collect();
		Self::new(name, FlagKind::Grouped { groups }, true)
	}

	/// An enabled custom flag backed by `predicate`.
	pub fn custom(name: impl Into<String>, predicate: Predicate) -> Result<Self, DefinitionError> {
		Self::new(name, FlagKind::Custom { predicate }, true)
	}

	/// Builds a flag from a raw definition.
	///
	/// Custom definitions cannot carry code, so they reuse the predicate of
	/// `existing` (the flag currently installed under the same name).
	pub fn from_def(def: &FlagDef, existing: Option<&Flag>) -> Result<Self, DefinitionError> {
		Self::from_def_with(def, existing.and_then(Flag::predicate))
	}

	/// Like [`from_def`](Self::from_def), with the custom predicate given directly.
	pub(crate) fn from_def_with(def: &FlagDef, predicate: Option<&Predicate>) -> Result<Self, DefinitionError> {
		def.validate()?;

		let kind = match def.kind {
			FlagType::Boolean => FlagKind::Boolean,
			FlagType::Metered => FlagKind::Metered {
				chance: def.chance.unwrap_or(DEFAULT_CHANCE),
			},
			FlagType::Grouped => FlagKind::Grouped {
				groups: def.groups.clone().unwrap_or_default(),
			},
			FlagType::Custom => match predicate {
				Some(predicate) => FlagKind::Custom {
					predicate: predicate.clone(),
				},
				None => {
					return Err(DefinitionError::MissingPredicate {
						name: def.name.clone(),
					});
				}
			},
		};

		Self::new(def.name.clone(), kind, def.enabled)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn kind(&self) -> &FlagKind {
		&self.kind
	}

	pub fn flag_type(&self) -> FlagType {
		self.kind.flag_type()
	}

	pub fn predicate(&self) -> Option<&Predicate> {
		self.kind.predicate()
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Returns a copy with the master switch set to `enabled`.
	pub fn with_enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	pub fn evaluate<R: Rng>(&self, ctx: &Context, rng: &mut R) -> Result<Evaluation, PredicateError> {
		evaluate(self, ctx, rng)
	}
}
