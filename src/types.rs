//! Shared value types: root-relative paths, entry metadata and sync direction

use serde::{Serialize, Serializer};
use std::fmt;

/// Path of an entry relative to the synchronized root
///
/// Stored as normalized segments (never empty, never `.` or `..`, never
/// containing a separator). The empty path is the root itself. Ordering is
/// segment-wise, so a directory sorts right before its own subtree.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelPath {
	segments: Vec<String>,
}

impl RelPath {
	/// The synchronized root
	pub fn root() -> Self {
		RelPath { segments: Vec::new() }
	}

	/// Parse a `/`-separated relative path, dropping empty and `.` segments
	///
	/// Returns an error for `..` segments, which could escape the root.
	pub fn parse(path: &str) -> Result<Self, String> {
		let mut segments = Vec::new();
		for segment in path.split('/') {
			match segment {
				"" | "." => continue,
				".." => {
					return Err(format!("Path contains parent directory reference (..): {}", path))
				}
				s => segments.push(s.to_string()),
			}
		}
		Ok(RelPath { segments })
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	pub fn depth(&self) -> usize {
		self.segments.len()
	}

	/// Last segment, `None` for the root
	pub fn name(&self) -> Option<&str> {
		self.segments.last().map(|s| s.as_str())
	}

	/// Path of the child `name` below this one
	pub fn join(&self, name: &str) -> Self {
		let mut segments = self.segments.clone();
		segments.push(name.to_string());
		RelPath { segments }
	}

	pub fn parent(&self) -> Option<Self> {
		if self.segments.is_empty() {
			return None;
		}
		Some(RelPath { segments: self.segments[..self.segments.len() - 1].to_vec() })
	}

	/// Every proper ancestor, nearest first, excluding the root
	pub fn ancestors(&self) -> impl Iterator<Item = RelPath> + '_ {
		(1..self.segments.len())
			.rev()
			.map(move |n| RelPath { segments: self.segments[..n].to_vec() })
	}

	/// True if `self` lies strictly below `other`
	pub fn is_descendant_of(&self, other: &RelPath) -> bool {
		self.segments.len() > other.segments.len() && self.segments.starts_with(&other.segments)
	}

	/// `/`-joined form used for pattern matching (empty for the root)
	pub fn to_slash_string(&self) -> String {
		self.segments.join("/")
	}
}

impl fmt::Display for RelPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.segments.is_empty() {
			write!(f, ".")
		} else {
			write!(f, "{}", self.segments.join("/"))
		}
	}
}

impl Serialize for RelPath {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

/// Kind of an entry as the sync engine sees it
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
	File,
	Directory,
}

/// One entry reported by an endpoint listing
#[derive(Clone, PartialEq, Debug)]
pub struct EntryStat {
	pub name: String,
	pub kind: EntryKind,
	/// Byte count, zero for directories
	pub size: u64,
	/// Modification time, seconds since the Unix epoch
	pub modified: i64,
}

/// Which way bytes flow
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	/// Computer to device
	Push,
	/// Device to computer
	Pull,
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Direction::Push => write!(f, "push"),
			Direction::Pull => write!(f, "pull"),
		}
	}
}


// vim: ts=4
