/* src/middleware/gate.rs */

use std::sync::Arc;

use http::StatusCode;

use super::{Middleware, Next, Rejection, ResponseSink};
use crate::context::Context;
use crate::error::{ReflipError, Result};
use crate::flag::Evaluation;

/// Answers a request a [`Gate`] refused. When set, `next` is not called.
pub type FailureHandler = Arc<dyn Fn(&mut Context, &mut dyn ResponseSink) + Send + Sync>;

/// Lets a request through only when one flag is active in its snapshot.
///
/// Requests without a snapshot see the registry default.
#[derive(Clone)]
pub struct Gate {
	name: String,
	accessor: String,
	default: Evaluation,
	status: StatusCode,
	handler: Option<FailureHandler>,
}

impl Gate {
	pub(crate) fn new(
		name: String,
		accessor: String,
		default: Evaluation,
		status: StatusCode,
		handler: Option<FailureHandler>,
	) -> Result<Self> {
		if name.is_empty() {
			return Err(ReflipError::Precondition("a gate needs a flag name".to_string()));
		}
		Ok(Self {
			name,
			accessor,
			default,
			status,
			handler,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Whether `ctx` would pass this gate.
	pub fn allows(&self, ctx: &Context) -> bool {
		match ctx.snapshot(&self.accessor) {
			Some(snapshot) => snapshot.check(&self.name),
			None => self.default.is_active(),
		}
	}
}

impl Middleware for Gate {
	fn handle(&self, ctx: &mut Context, sink: &mut dyn ResponseSink, next: Next<'_>) {
		if self.allows(ctx) {
			return next(Ok(()));
		}

		tracing::debug!("Gate '{}' refused the request", self.name);
		match &self.handler {
			Some(handler) => handler(ctx, sink),
			None => next(Err(Rejection::from_status(self.status))),
		}
	}
}

impl std::fmt::Debug for Gate {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Gate")
			.field("name", &self.name)
			.field("accessor", &self.accessor)
			.field("status", &self.status)
			.field("handler", &self.handler.is_some())
			.finish()
	}
}
