/* src/flag/predicate.rs */

use std::fmt;
use std::sync::Arc;

use super::PredicateError;
use crate::context::Context;

type PredicateFn = dyn Fn(&Context) -> Result<bool, PredicateError> + Send + Sync;

/// User-supplied check backing a custom flag. Cheap to clone.
#[derive(Clone)]
pub struct Predicate(Arc<PredicateFn>);

impl Predicate {
	/// Wraps an infallible check.
	pub fn new<F>(check: F) -> Self
	where
		F: Fn(&Context) -> bool + Send + Sync + 'static,
	{
		Self(Arc::new(move |ctx| Ok(check(ctx))))
	}

	/// Wraps a check whose errors are propagated to the evaluating caller.
	pub fn fallible<F>(check: F) -> Self
	where
		F: Fn(&Context) -> Result<bool, PredicateError> + Send + Sync + 'static,
	{
		Self(Arc::new(check))
	}

	pub fn call(&self, ctx: &Context) -> Result<bool, PredicateError> {
		(self.0)(ctx)
	}

	/// True when both handles point at the same closure.
	pub fn ptr_eq(&self, other: &Predicate) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for Predicate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Predicate").finish_non_exhaustive()
	}
}
