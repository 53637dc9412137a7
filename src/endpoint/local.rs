//! Local filesystem endpoint

use async_trait::async_trait;
use filetime::FileTime;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs as afs;

use super::{Endpoint, EndpointResult, FileCopier, LOCAL_MTIME_PRECISION};
use crate::error::EndpointError;
use crate::logging::*;
use crate::types::{EntryKind, EntryStat, RelPath};

/// The computer side of a sync
#[derive(Debug, Clone, Default)]
pub struct LocalEndpoint {
	/// Follow symlinks and sync their referents instead of skipping them
	follow_links: bool,
}

impl LocalEndpoint {
	pub fn new(follow_links: bool) -> Self {
		LocalEndpoint { follow_links }
	}

	fn entry_stat(name: String, meta: &Metadata) -> Option<EntryStat> {
		let kind = if meta.is_dir() {
			EntryKind::Directory
		} else if meta.is_file() {
			EntryKind::File
		} else {
			return None;
		};
		let size = if kind == EntryKind::File { meta.len() } else { 0 };
		let modified = meta.modified().map(unix_seconds).unwrap_or(0);
		Some(EntryStat { name, kind, size, modified })
	}
}

/// Seconds since the epoch, negative for pre-1970 times
fn unix_seconds(t: SystemTime) -> i64 {
	match t.duration_since(UNIX_EPOCH) {
		Ok(d) => d.as_secs() as i64,
		Err(e) => -(e.duration().as_secs() as i64),
	}
}

#[async_trait]
impl Endpoint for LocalEndpoint {
	fn label(&self) -> &str {
		"local"
	}

	fn mtime_precision(&self) -> Duration {
		LOCAL_MTIME_PRECISION
	}

	fn join(&self, root: &str, rel: &RelPath) -> String {
		let mut path = PathBuf::from(root);
		for segment in rel.segments() {
			path.push(segment);
		}
		path.to_string_lossy().into_owned()
	}

	fn split<'a>(&self, path: &'a str) -> (&'a str, &'a str) {
		let p = Path::new(path);
		let parent = p.parent().and_then(|p| p.to_str()).unwrap_or("");
		let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
		(parent, name)
	}

	async fn stat(&self, path: &str) -> EndpointResult<Option<EntryStat>> {
		match afs::metadata(path).await {
			Ok(meta) => {
				let name = self.split(path).1.to_string();
				match Self::entry_stat(name, &meta) {
					Some(stat) => Ok(Some(stat)),
					None => Err(EndpointError::Io {
						path: path.to_string(),
						source: std::io::Error::new(
							std::io::ErrorKind::Other,
							"not a regular file or directory",
						),
					}),
				}
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(EndpointError::from_io(path, e)),
		}
	}

	async fn list_children(&self, path: &str) -> EndpointResult<Vec<EntryStat>> {
		let mut dir = afs::read_dir(path).await.map_err(|e| EndpointError::from_io(path, e))?;
		let mut entries = Vec::new();

		while let Some(entry) = dir.next_entry().await.map_err(|e| EndpointError::from_io(path, e))? {
			let name = match entry.file_name().into_string() {
				Ok(name) => name,
				Err(raw) => {
					warn!("Skipping non UTF-8 name {:?} in {}", raw, path);
					continue;
				}
			};
			let child = entry.path();

			let meta = match afs::symlink_metadata(&child).await {
				Ok(meta) if meta.file_type().is_symlink() => {
					if !self.follow_links {
						warn!("Ignoring symlink {}", child.display());
						continue;
					}
					debug!("Following symlink {}", child.display());
					match afs::metadata(&child).await {
						Ok(meta) => meta,
						Err(e) => {
							warn!("Skipping symlink {}: {}", child.display(), e);
							continue;
						}
					}
				}
				Ok(meta) => meta,
				Err(e) => {
					warn!("Cannot stat {}: {}", child.display(), e);
					continue;
				}
			};

			match Self::entry_stat(name, &meta) {
				Some(stat) => entries.push(stat),
				None => warn!("Skipping special file {}", child.display()),
			}
		}

		Ok(entries)
	}

	async fn create_dir(&self, path: &str) -> EndpointResult<()> {
		afs::create_dir_all(path).await.map_err(|e| EndpointError::from_io(path, e))
	}

	async fn remove_file(&self, path: &str) -> EndpointResult<()> {
		afs::remove_file(path).await.map_err(|e| EndpointError::from_io(path, e))
	}

	async fn remove_dir(&self, path: &str) -> EndpointResult<()> {
		afs::remove_dir(path).await.map_err(|e| EndpointError::from_io(path, e))
	}

	async fn set_modified(&self, path: &str, modified: i64) -> EndpointResult<()> {
		filetime::set_file_mtime(path, FileTime::from_unix_time(modified, 0))
			.map_err(|e| EndpointError::from_io(path, e))
	}
}

/// Plain local copy, used for computer-to-computer syncs
#[async_trait]
impl FileCopier for LocalEndpoint {
	async fn copy_file(&self, source: &str, destination: &str) -> EndpointResult<()> {
		afs::copy(source, destination)
			.await
			.map(|_| ())
			.map_err(|e| EndpointError::TransferFailed {
				message: format!("{} -> {}: {}", source, destination, e),
			})
	}
}


// vim: ts=4
