/* src/format/toml.rs */

use serde::de::DeserializeOwned;

use super::Format;
use crate::storage::StorageError;

/// TOML format parser using `toml`.
pub struct Toml;

impl Format for Toml {
	fn extensions(&self) -> &'static [&'static str] {
		&["toml"]
	}

	fn parse<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, StorageError> {
		let s = std::str::from_utf8(input).map_err(|e| StorageError::Parse(e.to_string()))?;
		toml::from_str(s).map_err(|e| StorageError::Parse(e.to_string()))
	}
}
