/* src/error.rs */

use thiserror::Error;

use crate::flag::{DefinitionError, PredicateError};
use crate::storage::StorageError;

/// Errors that can occur in the registry.
#[derive(Debug, Error)]
pub enum ReflipError {
	/// Missing or contradictory options, detected at call time.
	#[error("precondition violated: {0}")]
	Precondition(String),

	#[error("storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("invalid definitions: {0}")]
	Definition(#[from] DefinitionError),

	#[error(transparent)]
	Predicate(#[from] PredicateError),

	#[error("registry has been shut down")]
	ShutDown,
}

pub type Result<T, E = ReflipError> = std::result::Result<T, E>;
