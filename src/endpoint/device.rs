//! Android device endpoint reached through a persistent adb shell

use async_trait::async_trait;
use chrono::DateTime;
use std::sync::Arc;
use std::time::Duration;

use super::bridge::{quote, AdbBridge};
use super::ls::{self, LsKind, LsLine};
use super::{join_slash, split_slash, Endpoint, EndpointResult, FileCopier, DEVICE_MTIME_PRECISION};
use crate::error::EndpointError;
use crate::logging::*;
use crate::types::{Direction, EntryKind, EntryStat, RelPath};

/// The device side of a sync
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
	bridge: Arc<AdbBridge>,
	follow_links: bool,
}

impl DeviceEndpoint {
	pub fn new(bridge: Arc<AdbBridge>, follow_links: bool) -> Self {
		DeviceEndpoint { bridge, follow_links }
	}

	/// Run a mutating command that prints nothing on success
	async fn run_silent(&self, command: String) -> EndpointResult<()> {
		let output = self.bridge.shell(&command).await?;
		match output.lines.into_iter().chain(output.undecodable).next() {
			None => Ok(()),
			Some(line) => {
				Err(ls::error_line(&line).unwrap_or(EndpointError::Unexpected { line }))
			}
		}
	}
}

fn to_stat(entry: ls::LsEntry) -> Option<EntryStat> {
	let kind = match entry.kind {
		LsKind::File => EntryKind::File,
		LsKind::Directory => EntryKind::Directory,
		LsKind::Symlink | LsKind::Special => return None,
	};
	Some(EntryStat { name: entry.name, kind, size: entry.size, modified: entry.modified })
}

/// `touch -t` timestamp in UTC
fn touch_stamp(modified: i64) -> Option<String> {
	DateTime::from_timestamp(modified, 0).map(|t| t.format("%Y%m%d%H%M.%S").to_string())
}

#[async_trait]
impl Endpoint for DeviceEndpoint {
	fn label(&self) -> &str {
		"device"
	}

	fn mtime_precision(&self) -> Duration {
		DEVICE_MTIME_PRECISION
	}

	fn join(&self, root: &str, rel: &RelPath) -> String {
		join_slash(root, rel)
	}

	fn split<'a>(&self, path: &'a str) -> (&'a str, &'a str) {
		split_slash(path)
	}

	async fn stat(&self, path: &str) -> EndpointResult<Option<EntryStat>> {
		// -L so that roots such as /sdcard resolve to their target directory
		let output = self.bridge.shell(&format!("TZ=UTC ls -ladL {}", quote(path))).await?;
		let name = self.split(path).1.to_string();

		for line in output.lines {
			match ls::parse_line(&line) {
				Ok(LsLine::Total) => continue,
				Ok(LsLine::Entry(entry)) => {
					return match to_stat(entry) {
						Some(stat) => Ok(Some(EntryStat { name, ..stat })),
						None => Err(EndpointError::Unexpected { line }),
					}
				}
				Err(e) if e.is_not_found() => return Ok(None),
				Err(e) => return Err(e),
			}
		}
		match output.undecodable.into_iter().next() {
			Some(line) => Err(EndpointError::Unexpected { line }),
			None => Ok(None),
		}
	}

	async fn list_children(&self, path: &str) -> EndpointResult<Vec<EntryStat>> {
		let flags = if self.follow_links { "-laL" } else { "-la" };
		let output = self.bridge.shell(&format!("TZ=UTC ls {} {}", flags, quote(path))).await?;
		for line in &output.undecodable {
			warn!("Skipping entry of {} with a name that is not valid UTF-8: {}", path, line);
		}

		let mut entries = Vec::new();
		let mut errors = Vec::new();
		for line in output.lines {
			match ls::parse_line(&line) {
				Ok(LsLine::Total) => {}
				Ok(LsLine::Entry(entry)) => {
					if entry.name == "." || entry.name == ".." {
						continue;
					}
					match entry.kind {
						LsKind::Symlink => warn!("Ignoring symlink {}/{}", path, entry.name),
						LsKind::Special => warn!("Skipping special file {}/{}", path, entry.name),
						_ => {}
					}
					if let Some(stat) = to_stat(entry) {
						entries.push(stat);
					}
				}
				Err(e) => errors.push(e),
			}
		}

		if errors.is_empty() {
			return Ok(entries);
		}
		// A listing of the directory itself always yields at least "." and
		// "..", so errors without entries mean the directory was unreadable
		if entries.is_empty() {
			return Err(errors.remove(0));
		}
		for e in errors {
			warn!("While listing {}: {}", path, e);
		}
		Ok(entries)
	}

	async fn create_dir(&self, path: &str) -> EndpointResult<()> {
		self.run_silent(format!("mkdir -p {}", quote(path))).await
	}

	async fn remove_file(&self, path: &str) -> EndpointResult<()> {
		self.run_silent(format!("rm {}", quote(path))).await
	}

	async fn remove_dir(&self, path: &str) -> EndpointResult<()> {
		self.run_silent(format!("rmdir {}", quote(path))).await
	}

	async fn set_modified(&self, path: &str, modified: i64) -> EndpointResult<()> {
		let stamp = touch_stamp(modified).ok_or_else(|| EndpointError::Unexpected {
			line: format!("timestamp out of range: {}", modified),
		})?;
		self.run_silent(format!("TZ=UTC touch -m -t {} {}", stamp, quote(path))).await
	}
}

/// File transfer with `adb push` / `adb pull`
#[derive(Debug, Clone)]
pub struct AdbTransfer {
	bridge: Arc<AdbBridge>,
	direction: Direction,
}

impl AdbTransfer {
	pub fn new(bridge: Arc<AdbBridge>, direction: Direction) -> Self {
		AdbTransfer { bridge, direction }
	}
}

#[async_trait]
impl FileCopier for AdbTransfer {
	async fn copy_file(&self, source: &str, destination: &str) -> EndpointResult<()> {
		let subcommand = match self.direction {
			Direction::Push => "push",
			Direction::Pull => "pull",
		};
		let output = self.bridge.run(&[subcommand, source, destination]).await?;
		if output.status.success() {
			return Ok(());
		}

		let mut message = String::from_utf8_lossy(&output.stderr).trim().to_string();
		if message.is_empty() {
			message = String::from_utf8_lossy(&output.stdout).trim().to_string();
		}
		Err(EndpointError::TransferFailed {
			message: format!("adb {} {} {}: {}", subcommand, source, destination, message),
		})
	}
}


// vim: ts=4
