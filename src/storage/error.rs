/* src/storage/error.rs */

use thiserror::Error;

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The adapter was constructed with missing or invalid options.
	#[error("invalid adapter configuration: {0}")]
	Config(String),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	/// The definition document could not be parsed.
	#[error("parse error: {0}")]
	Parse(String),

	#[error("unsupported definition format: {0}")]
	UnsupportedFormat(String),

	#[cfg(feature = "file")]
	#[error("signal error: {0}")]
	Signal(#[from] crate::signal::SignalError),

	#[cfg(feature = "redis")]
	#[error("redis error: {0}")]
	Redis(#[from] redis::RedisError),

	#[error("connection error: {0}")]
	Connection(String),

	#[error("adapter is closed")]
	Closed,

	#[error("{0}")]
	Other(String),
}
