/* src/middleware/flip.rs */

use super::{Middleware, Next, ResponseSink};
use crate::context::Context;
use crate::registry::Registry;

/// Evaluates every flag once per request and attaches the
/// [`Snapshot`](crate::Snapshot) to the context under the export name.
#[derive(Debug, Clone)]
pub struct Flip {
	registry: Registry,
}

impl Flip {
	pub fn new(registry: Registry) -> Self {
		Self { registry }
	}
}

impl Middleware for Flip {
	fn handle(&self, ctx: &mut Context, _sink: &mut dyn ResponseSink, next: Next<'_>) {
		let snapshot = self.registry.snapshot(ctx);
		ctx.attach(self.registry.options().export_name.clone(), snapshot);
		next(Ok(()));
	}
}
