/* src/flag/error.rs */

use thiserror::Error;

/// A definition that violates the flag invariants.
#[derive(Debug, Error)]
pub enum DefinitionError {
	#[error("flag name must not be empty")]
	EmptyName,

	#[error("chance for flag '{name}' must be within 0..=100, got {chance}")]
	ChanceOutOfRange { name: String, chance: f64 },

	#[error("grouped flag '{name}' needs at least one group")]
	EmptyGroups { name: String },

	/// A `custom` definition arrived from storage but nothing registered a predicate for it.
	#[error("custom flag '{name}' has no registered predicate")]
	MissingPredicate { name: String },

	#[error("duplicate flag name: {name}")]
	DuplicateName { name: String },

	#[error("validation failed: {0}")]
	Validation(#[from] validator::ValidationErrors),
}

/// A custom predicate failed while evaluating a flag.
#[derive(Debug, Error)]
#[error("predicate failed: {source}")]
pub struct PredicateError {
	source: Box<dyn std::error::Error + Send + Sync>,
}

impl PredicateError {
	pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
		Self { source: err.into() }
	}
}
