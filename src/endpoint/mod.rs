//! Endpoint adapters
//!
//! An endpoint is one side of a sync: the local filesystem or a device
//! behind adb. The tree builder and the executor only talk to the
//! [`Endpoint`] and [`FileCopier`] traits; paths handed to them are full
//! endpoint paths built with [`Endpoint::join`].

pub mod bridge;
pub mod device;
pub mod local;
pub mod ls;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::EndpointError;
use crate::types::{EntryStat, RelPath};

pub use bridge::{AdbBridge, ShellOutput};
pub use device::{AdbTransfer, DeviceEndpoint};
pub use local::LocalEndpoint;

/// Result type for endpoint operations
pub type EndpointResult<T> = Result<T, EndpointError>;

/// Modification times reported by the local filesystem, truncated to seconds
pub const LOCAL_MTIME_PRECISION: Duration = Duration::from_secs(1);

/// `ls -la` on the device prints minutes only
pub const DEVICE_MTIME_PRECISION: Duration = Duration::from_secs(60);

/// Enumeration and mutation primitives of one side of a sync
#[async_trait]
pub trait Endpoint: Send + Sync {
	/// Short label used in logs ("local", "device")
	fn label(&self) -> &str;

	/// Granularity of the modification times this endpoint reports
	fn mtime_precision(&self) -> Duration;

	/// Join a root and a relative path using this endpoint's separator
	fn join(&self, root: &str, rel: &RelPath) -> String;

	/// Split a path into (parent, last component)
	fn split<'a>(&self, path: &'a str) -> (&'a str, &'a str);

	/// Stat a single path; `Ok(None)` when it does not exist
	async fn stat(&self, path: &str) -> EndpointResult<Option<EntryStat>>;

	/// List the direct children of a directory
	async fn list_children(&self, path: &str) -> EndpointResult<Vec<EntryStat>>;

	/// Create a directory and any missing parents
	async fn create_dir(&self, path: &str) -> EndpointResult<()>;

	async fn remove_file(&self, path: &str) -> EndpointResult<()>;

	/// Remove an empty directory
	async fn remove_dir(&self, path: &str) -> EndpointResult<()>;

	/// Set the modification time (seconds since the epoch)
	async fn set_modified(&self, path: &str, modified: i64) -> EndpointResult<()>;
}

/// Moves file contents from the source endpoint to the destination endpoint
#[async_trait]
pub trait FileCopier: Send + Sync {
	async fn copy_file(&self, source: &str, destination: &str) -> EndpointResult<()>;
}

/// Join for `/`-separated endpoints
pub(crate) fn join_slash(root: &str, rel: &RelPath) -> String {
	if rel.is_root() {
		return root.to_string();
	}
	let rel = rel.to_slash_string();
	if root.is_empty() {
		rel
	} else if root.ends_with('/') {
		format!("{}{}", root, rel)
	} else {
		format!("{}/{}", root, rel)
	}
}

/// Split for `/`-separated endpoints, ignoring trailing separators
pub(crate) fn split_slash(path: &str) -> (&str, &str) {
	let trimmed = path.trim_end_matches('/');
	if trimmed.is_empty() {
		return (path, "");
	}
	match trimmed.rfind('/') {
		Some(0) => ("/", &trimmed[1..]),
		Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
		None => ("", trimmed),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_join_slash() {
		let rel = RelPath::parse("a/b.txt").unwrap();
		assert_eq!(join_slash("/sdcard", &rel), "/sdcard/a/b.txt");
		assert_eq!(join_slash("/sdcard/", &rel), "/sdcard/a/b.txt");
		assert_eq!(join_slash("", &rel), "a/b.txt");
		assert_eq!(join_slash("/sdcard", &RelPath::root()), "/sdcard");
	}

	#[test]
	fn test_split_slash() {
		assert_eq!(split_slash("/sdcard/DCIM"), ("/sdcard", "DCIM"));
		assert_eq!(split_slash("/sdcard/DCIM/"), ("/sdcard", "DCIM"));
		assert_eq!(split_slash("/DCIM"), ("/", "DCIM"));
		assert_eq!(split_slash("DCIM"), ("", "DCIM"));
		assert_eq!(split_slash("/"), ("/", ""));
	}
}

// vim: ts=4
