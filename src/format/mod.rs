/* src/format/mod.rs */

//!
//! Parsers for the definition document, picked by file extension.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::storage::StorageError;

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "json")]
pub use json::Json;

#[cfg(feature = "toml")]
mod toml;
#[cfg(feature = "toml")]
pub use self::toml::Toml;

#[cfg(feature = "yaml")]
mod yaml;
#[cfg(feature = "yaml")]
pub use yaml::Yaml;

/// Abstract format parser that converts bytes into a structured object.
pub trait Format: Send + Sync {
	/// List of supported extensions or identifiers.
	fn extensions(&self) -> &'static [&'static str];

	/// Parse the raw bytes into the target type.
	fn parse<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, StorageError>;
}

/// An enum wrapper for all enabled formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyFormat {
	#[cfg(feature = "json")]
	Json,
	#[cfg(feature = "toml")]
	Toml,
	#[cfg(feature = "yaml")]
	Yaml,
}

impl AnyFormat {
	/// Every format compiled into this build, JSON first.
	pub const ALL: &'static [AnyFormat] = &[
		#[cfg(feature = "json")]
		AnyFormat::Json,
		#[cfg(feature = "toml")]
		AnyFormat::Toml,
		#[cfg(feature = "yaml")]
		AnyFormat::Yaml,
	];

	/// Finds the format registered for `ext` (case-insensitive).
	pub fn from_extension(ext: &str) -> Option<Self> {
		let ext = ext.to_ascii_lowercase();
		Self::ALL
			.iter()
			.copied()
			.find(|format| format.extensions().contains(&ext.as_str()))
	}

	/// Picks the format from the path's extension; a path without one falls back to the first enabled format.
	pub fn from_path(path: &Path) -> Result<Self, StorageError> {
		match path.extension().and_then(|ext| ext.to_str()) {
			Some(ext) => {
				Self::from_extension(ext).ok_or_else(|| StorageError::UnsupportedFormat(ext.to_string()))
			}
			None => Self::ALL
				.first()
				.copied()
				.ok_or_else(|| StorageError::UnsupportedFormat("no format enabled".to_string())),
		}
	}
}

impl Format for AnyFormat {
	fn extensions(&self) -> &'static [&'static str] {
		match self {
			#[cfg(feature = "json")]
			Self::Json => Json.extensions(),
			#[cfg(feature = "toml")]
			Self::Toml => Toml.extensions(),
			#[cfg(feature = "yaml")]
			Self::Yaml => Yaml.extensions(),
			#[cfg(not(any(feature = "json", feature = "toml", feature = "yaml")))]
			_ => unreachable!(),
		}
	}

	fn parse<T: DeserializeOwned>(&self, _input: &[u8]) -> Result<T, StorageError> {
		match self {
			#[cfg(feature = "json")]
			Self::Json => Json.parse(_input),
			#[cfg(feature = "toml")]
			Self::Toml => Toml.parse(_input),
			#[cfg(feature = "yaml")]
			Self::Yaml => Yaml.parse(_input),
			#[cfg(not(any(feature = "json", feature = "toml", feature = "yaml")))]
			_ => unreachable!(),
		}
	}
}
