//! --exclude-from file parsing

use crate::error::ExclusionError;
use std::path::Path;

/// Parser for pattern files, one glob per line
pub struct PatternFileParser;

impl PatternFileParser {
	/// Read a pattern file and return its patterns
	pub fn parse_file(path: &Path) -> Result<Vec<String>, ExclusionError> {
		let contents = std::fs::read_to_string(path)
			.map_err(|e| ExclusionError::PatternFile { path: path.to_path_buf(), source: e })?;

		Ok(Self::parse_contents(&contents))
	}

	/// Parse pattern file contents
	pub fn parse_contents(contents: &str) -> Vec<String> {
		contents
			.lines()
			.filter_map(|line| {
				let line = line.trim();

				// Skip empty lines and comments
				if line.is_empty() || line.starts_with('#') {
					return None;
				}

				Some(line.to_string())
			})
			.collect()
	}
}


// vim: ts=4
