/* src/middleware/mod.rs */

//!
//! Framework-neutral request pipeline pieces.
//!
//! A [`Middleware`] receives the request [`Context`], a [`ResponseSink`] and a
//! [`Next`] continuation. It either calls `next` exactly once, possibly with a
//! [`Rejection`], or answers through the sink itself and drops `next`.

mod flip;
mod gate;

pub use flip::Flip;
pub use gate::{FailureHandler, Gate};

use std::cell::RefCell;
use std::sync::Arc;

use http::StatusCode;

use crate::context::Context;

/// A negative gate outcome handed to `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
	pub status: StatusCode,
	pub message: String,
}

impl Rejection {
	/// A rejection carrying the status's standard reason phrase.
	pub fn from_status(status: StatusCode) -> Self {
		Self {
			status,
			message: status.canonical_reason().unwrap_or_default().to_string(),
		}
	}
}

impl std::fmt::Display for Rejection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.status.as_u16(), self.message)
	}
}

/// Continuation of the pipeline.
pub type Next<'a> = Box<dyn FnOnce(Result<(), Rejection>) + 'a>;

/// Where a middleware writes a response when it short-circuits.
pub trait ResponseSink {
	fn send(&mut self, status: StatusCode, body: &str);
}

pub trait Middleware: Send + Sync {
	fn handle(&self, ctx: &mut Context, sink: &mut dyn ResponseSink, next: Next<'_>);
}

/// A [`ResponseSink`] that records what was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedResponse {
	pub status: Option<StatusCode>,
	pub body: String,
	/// Number of `send` calls.
	pub sends: usize,
}

impl BufferedResponse {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_sent(&self) -> bool {
		self.sends > 0
	}
}

impl ResponseSink for BufferedResponse {
	fn send(&mut self, status: StatusCode, body: &str) {
		self.status = Some(status);
		self.body = body.to_string();
		self.sends += 1;
	}
}

/// How a [`Chain`] run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
	/// Every middleware passed.
	Completed,
	/// A middleware called `next` with a rejection; it was written to the sink.
	Rejected(Rejection),
	/// A middleware answered through the sink without calling `next`.
	Intercepted,
}

/// Runs middlewares in order, stopping at the first one that does not pass.
#[derive(Clone, Default)]
pub struct Chain {
	layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
		self.layers.push(Arc::new(middleware));
		self
	}

	pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
		self.layers.push(middleware);
	}

	pub fn len(&self) -> usize {
		self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	pub fn run(&self, ctx: &mut Context, sink: &mut dyn ResponseSink) -> ChainOutcome {
		for layer in &self.layers {
			let outcome: RefCell<Option<Result<(), Rejection>>> = RefCell::new(None);
			layer.handle(
				ctx,
				sink,
				Box::new(|result| {
					*outcome.borrow_mut() = Some(result);
				}),
			);

			match outcome.into_inner() {
				Some(Ok(())) => continue,
				Some(Err(rejection)) => {
					sink.send(rejection.status, &rejection.message);
					return ChainOutcome::Rejected(rejection);
				}
				None => return ChainOutcome::Intercepted,
			}
		}
		ChainOutcome::Completed
	}
}

impl std::fmt::Debug for Chain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Chain").field("layers", &self.layers.len()).finish()
	}
}
