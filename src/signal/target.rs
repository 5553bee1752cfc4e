/* src/signal/target.rs */

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{Result, SignalError};

/// The watched file, resolved to its directory and file name.
#[derive(Debug)]
pub(crate) struct FileTarget {
	pub(crate) dir: PathBuf,
	file_name: OsString,
}

impl FileTarget {
	pub(crate) fn new(path: &Path) -> Result<Self> {
		let file_name = path
			.file_name()
			.map(|name| name.to_os_string())
			.ok_or_else(|| SignalError::Config(format!("Not a file path: {:?}", path)))?;

		let dir = match path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
			_ => PathBuf::from("."),
		};

		if !dir.exists() {
			return Err(SignalError::Config(format!("Path does not exist: {:?}", dir)));
		}

		// Editors often replace the file, so the directory is watched and
		// events are matched on file name.
		let dir = dir.canonicalize()?;

		Ok(Self { dir, file_name })
	}

	pub(crate) fn matches(&self, path: &Path) -> bool {
		path.file_name() == Some(self.file_name.as_os_str())
	}
}
