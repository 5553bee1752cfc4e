/* src/lib.rs */

//!
//! Feature flags evaluated per request and kept in sync with an external
//! definition source.
//!
//! - **flag**: the flag model (boolean, metered, grouped, custom) and its evaluator.
//! - **table**: the immutable flag table, swapped atomically on every change.
//! - **storage**: adapters delivering definitions (file, key-value store, memory).
//! - **registry**: owns the table, drives refreshes and publishes events (`Registry`).
//! - **middleware**: the per-request snapshot builder (`Flip`) and access guard (`Gate`).
//!
//! ## Feature Flags
//!
//! - `full`: Enables all features.
//! - `json`, `toml`, `yaml`: Definition document formats.
//! - `file`: The `FileAdapter` and its debounced watcher (`signal`).
//! - `redis`: The Redis-backed key-value adapter.
//! - `stream`: Registry events as a `Stream`.
//!
//! ## Basic Usage
//!
//! See `demos/basic.rs` for a complete example.

pub mod context;
pub mod error;
pub mod flag;
pub mod format;
pub mod middleware;
pub mod registry;
#[cfg(feature = "file")]
pub mod signal;
pub mod storage;
pub mod table;

pub use context::{Context, Snapshot};
pub use error::{ReflipError, Result};
pub use flag::{Evaluation, Flag, FlagDef, FlagKind, FlagType};
pub use middleware::{BufferedResponse, Chain, ChainOutcome, Middleware, Rejection, ResponseSink};
pub use registry::{Registry, RegistryBuilder, RegistryEvent};
pub use storage::{StorageAdapter, StorageError};
pub use table::FlagTable;
