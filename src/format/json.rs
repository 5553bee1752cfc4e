/* src/format/json.rs */

use serde::de::DeserializeOwned;

use super::Format;
use crate::storage::StorageError;

/// JSON format parser using `serde_json`.
pub struct Json;

impl Format for Json {
	fn extensions(&self) -> &'static [&'static str] {
		&["json"]
	}

	fn parse<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, StorageError> {
		serde_json::from_slice(input).map_err(|e| StorageError::Parse(e.to_string()))
	}
}
