//! Configuration for adbsync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (`Config::default()`)
//! 2. Config file (`--config FILE`, otherwise `~/.config/adbsync/config.toml`)
//! 3. CLI flags (highest priority)
//!
//! Files ending in `.json` or `.json5` are read as JSON5, everything else as TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diff::SyncPolicy;
use crate::error::SyncError;
use crate::logging::*;

/// Settings for one adbsync invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// EXCLUSION
	// ========================================================================
	/// Glob patterns to exclude (e.g. "*.tmp", ".thumbnails")
	pub exclude_patterns: Vec<String>,

	/// Files with one exclude pattern per line
	pub exclude_from: Vec<PathBuf>,

	/// Match patterns case-insensitively
	pub case_insensitive: bool,

	// ========================================================================
	// SYNC BEHAVIOR
	// ========================================================================
	/// Delete destination entries that are missing from the source
	pub delete: bool,

	/// Delete excluded destination entries
	pub delete_excluded: bool,

	/// Allow replacing files with directories and the reverse
	pub force: bool,

	/// Follow symlinks instead of skipping them
	pub copy_links: bool,

	/// Ignore modification time differences below this many seconds
	/// (default: the coarser precision of the two endpoints)
	pub mtime_tolerance_secs: Option<u64>,

	/// Send changes into `DEST_YYYY_MM_DD` when the destination exists
	pub copy_to_new_folder: bool,

	// ========================================================================
	// OUTPUT
	// ========================================================================
	/// Plan changes without applying them
	pub dry_run: bool,

	/// Print both trees with the plan; nothing is applied
	pub show_tree: bool,

	/// Print the plan as JSON
	pub json: bool,

	// ========================================================================
	// ADB
	// ========================================================================
	pub adb: AdbConfig,
}

/// How to invoke the adb binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdbConfig {
	/// adb executable
	pub bin: String,

	/// Global flags without the dash, e.g. `d` for `adb -d`
	pub flags: Vec<String>,

	/// Global options with values, e.g. `("P", "5037")` for `adb -P 5037`
	pub options: Vec<(String, String)>,
}

impl Default for AdbConfig {
	fn default() -> Self {
		AdbConfig { bin: "adb".to_string(), flags: Vec::new(), options: Vec::new() }
	}
}

impl Default for Config {
	fn default() -> Self {
		Config {
			exclude_patterns: Vec::new(),
			exclude_from: Vec::new(),
			case_insensitive: false,
			delete: false,
			delete_excluded: false,
			force: false,
			copy_links: false,
			mtime_tolerance_secs: None,
			copy_to_new_folder: false,
			dry_run: false,
			show_tree: false,
			json: false,
			adb: AdbConfig::default(),
		}
	}
}

impl Config {
	/// `$XDG_CONFIG_HOME/adbsync/config.toml`, falling back to `~/.config`
	pub fn default_path() -> Option<PathBuf> {
		let base = match std::env::var_os("XDG_CONFIG_HOME") {
			Some(dir) if !dir.is_empty() => PathBuf::from(dir),
			_ => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
		};
		Some(base.join("adbsync").join("config.toml"))
	}

	/// Load `path` if given, otherwise the default file if it exists
	pub fn load(path: Option<&Path>) -> Result<Config, SyncError> {
		match path {
			Some(path) => Self::load_from_file(path),
			None => match Self::default_path() {
				Some(path) if path.is_file() => Self::load_from_file(&path),
				_ => Ok(Config::default()),
			},
		}
	}

	pub fn load_from_file(path: &Path) -> Result<Config, SyncError> {
		debug!("Loading configuration from {}", path.display());
		let text = std::fs::read_to_string(path).map_err(|e| SyncError::InvalidConfig {
			message: format!("{}: {}", path.display(), e),
		})?;
		let is_json = matches!(path.extension().and_then(|e| e.to_str()), Some("json" | "json5"));
		let config = if is_json { Self::from_json5(&text) } else { Self::from_toml(&text) };
		config.map_err(|message| SyncError::InvalidConfig {
			message: format!("{}: {}", path.display(), message),
		})
	}

	pub fn from_toml(text: &str) -> Result<Config, String> {
		toml::from_str(text).map_err(|e| e.to_string())
	}

	pub fn from_json5(text: &str) -> Result<Config, String> {
		json5::from_str(text).map_err(|e| e.to_string())
	}

	pub fn validate(&self) -> Result<(), SyncError> {
		if self.adb.bin.trim().is_empty() {
			return Err(SyncError::InvalidConfig { message: "adb binary must not be empty".to_string() });
		}
		if let Some(pattern) = self.exclude_patterns.iter().find(|p| p.trim().is_empty()) {
			return Err(SyncError::InvalidConfig {
				message: format!("blank exclude pattern {:?}", pattern),
			});
		}
		if let Some(flag) = self.adb.flags.iter().find(|f| f.trim_start_matches('-').is_empty()) {
			return Err(SyncError::InvalidConfig { message: format!("invalid adb flag {:?}", flag) });
		}
		if self.delete_excluded && self.exclude_patterns.is_empty() && self.exclude_from.is_empty() {
			warn!("--delete-excluded has no effect without exclude patterns");
		}
		Ok(())
	}

	pub fn policy(&self) -> SyncPolicy {
		SyncPolicy { delete: self.delete, delete_excluded: self.delete_excluded }
	}

	pub fn mtime_tolerance(&self) -> Option<Duration> {
		self.mtime_tolerance_secs.map(Duration::from_secs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[test]
	fn test_config_default() {
		let config = Config::default();
		assert_eq!(config.adb.bin, "adb");
		assert!(!config.delete);
		assert_eq!(config.mtime_tolerance(), None);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_toml_partial() {
		let config = Config::from_toml(
			r#"
			excludePatterns = ["*.tmp", ".thumbnails"]
			delete = true
			mtimeToleranceSecs = 2
			copyToNewFolder = true

			[adb]
			flags = ["d"]
			options = [["P", "5037"]]
			"#,
		)
		.unwrap();

		assert_eq!(config.exclude_patterns, vec!["*.tmp", ".thumbnails"]);
		assert!(config.delete);
		assert!(!config.delete_excluded);
		assert!(config.copy_to_new_folder);
		assert_eq!(config.mtime_tolerance(), Some(Duration::from_secs(2)));
		assert_eq!(config.adb.bin, "adb");
		assert_eq!(config.adb.options, vec![("P".to_string(), "5037".to_string())]);
	}

	#[test]
	fn test_json5_file() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("adbsync.json5");
		fs::write(&path, "{ // comment\n  deleteExcluded: true, adb: { bin: '/opt/adb' } }").unwrap();

		let config = Config::load(Some(&path)).unwrap();
		assert!(config.delete_excluded);
		assert_eq!(config.adb.bin, "/opt/adb");
	}

	#[test]
	fn test_invalid_file_and_values() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("bad.toml");
		fs::write(&path, "delete = \"yes\"").unwrap();
		assert!(matches!(Config::load(Some(&path)), Err(SyncError::InvalidConfig { .. })));

		let missing = temp.path().join("missing.toml");
		assert!(matches!(Config::load(Some(&missing)), Err(SyncError::InvalidConfig { .. })));

		let mut config = Config::default();
		config.exclude_patterns.push("  ".to_string());
		assert!(config.validate().is_err());

		let mut config = Config::default();
		config.adb.bin = String::new();
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_serialization_round_trip() {
		let mut config = Config::default();
		config.exclude_from.push(PathBuf::from("/tmp/excludes"));
		let text = toml::to_string(&config).unwrap();
		assert_eq!(Config::from_toml(&text).unwrap(), config);
	}
}

// vim: ts=4
