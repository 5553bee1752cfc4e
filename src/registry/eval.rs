/* src/registry/eval.rs */

use std::collections::HashMap;
use std::sync::Arc;

use super::{ErrorStage, Registry, RegistryEvent};
use crate::context::{Context, Snapshot};
use crate::error::Result;
use crate::flag::{Evaluation, Flag};
use crate::middleware::{FailureHandler, Flip, Gate, ResponseSink};

impl Registry {
	/// Evaluates `name` for `ctx`. Unknown names resolve to the configured default.
	///
	/// Errors from a custom predicate are returned as is.
	pub fn evaluate(&self, name: &str, ctx: &Context) -> Result<Evaluation> {
		let Some(flag) = self.get(name) else {
			return Ok(self.inner.options.default.clone());
		};
		self.evaluate_flag(&flag, ctx)
	}

	/// Truthiness of [`evaluate`](Self::evaluate).
	pub fn is_enabled(&self, name: &str, ctx: &Context) -> Result<bool> {
		self.evaluate(name, ctx).map(|evaluation| evaluation.is_active())
	}

	/// Evaluates every flag, failing on the first predicate error.
	pub fn evaluate_all(&self, ctx: &Context) -> Result<HashMap<String, Evaluation>> {
		let table = self.table();
		let mut values = HashMap::with_capacity(table.len());
		for (name, entry) in table.iter() {
			values.insert(name.clone(), self.evaluate_flag(&entry.flag, ctx)?);
		}
		Ok(values)
	}

	/// Evaluates every flag into a [`Snapshot`].
	///
	/// A failing predicate records the default for its flag and is reported
	/// as an `Error` event instead of failing the whole snapshot.
	pub fn snapshot(&self, ctx: &Context) -> Snapshot {
		let table = self.table();
		let default = &self.inner.options.default;
		let mut values = HashMap::with_capacity(table.len());

		for (name, entry) in table.iter() {
			let evaluation = match self.evaluate_flag(&entry.flag, ctx) {
				Ok(evaluation) => evaluation,
				Err(e) => {
					tracing::warn!("Flag '{}' failed to evaluate, using the default: {}", name, e);
					self.inner.emit(RegistryEvent::Error {
						stage: ErrorStage::Predicate,
						message: format!("{}: {}", name, e),
					});
					default.clone()
				}
			};
			values.insert(name.clone(), evaluation);
		}

		Snapshot::new(values, default.clone())
	}

	/// Middleware attaching a per-request [`Snapshot`] under the export name.
	pub fn flip(&self) -> Flip {
		Flip::new(self.clone())
	}

	/// Middleware letting requests through only while `name` is active.
	///
	/// Refused requests get `next` called with a rejection carrying the
	/// configured status.
	pub fn gate(&self, name: impl Into<String>) -> Result<Gate> {
		self.build_gate(name.into(), None)
	}

	/// Like [`gate`](Self::gate), with `handler` answering refused requests.
	pub fn gate_with<F>(&self, name: impl Into<String>, handler: F) -> Result<Gate>
	where
		F: Fn(&mut Context, &mut dyn ResponseSink) + Send + Sync + 'static,
	{
		let handler: FailureHandler = Arc::new(handler);
		self.build_gate(name.into(), Some(handler))
	}

	fn build_gate(&self, name: String, handler: Option<FailureHandler>) -> Result<Gate> {
		let options = &self.inner.options;
		Gate::new(
			name,
			options.export_name.clone(),
			options.default.clone(),
			options.http_code,
			handler,
		)
	}

	fn evaluate_flag(&self, flag: &Flag, ctx: &Context) -> Result<Evaluation> {
		let mut rng = &self.inner.rng;
		Ok(flag.evaluate(ctx, &mut rng)?)
	}
}
