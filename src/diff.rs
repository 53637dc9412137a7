//! Diff engine: compares two snapshots and emits the unordered operation set
//!
//! Exclusion is always evaluated on the root-relative path, so the same
//! rules apply whichever way the sync runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::exclusion::PatternMatcher;
use crate::logging::*;
use crate::plan::{Operation, OperationKind};
use crate::tree::{Node, Tree};
use crate::types::{Direction, EntryKind, RelPath};

/// Deletion policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncPolicy {
	/// Delete destination entries missing from the source (`--del`)
	pub delete: bool,
	/// Delete excluded destination entries (`--delete-excluded`)
	pub delete_excluded: bool,
}

impl SyncPolicy {
	fn allows(&self, excluded: bool) -> bool {
		if excluded {
			self.delete_excluded
		} else {
			self.delete
		}
	}

	fn any(&self) -> bool {
		self.delete || self.delete_excluded
	}
}

pub struct DiffEngine<'a> {
	matcher: &'a PatternMatcher,
	policy: SyncPolicy,
	direction: Direction,
	tolerance: Option<Duration>,
}

impl<'a> DiffEngine<'a> {
	pub fn new(matcher: &'a PatternMatcher, policy: SyncPolicy, direction: Direction) -> Self {
		DiffEngine { matcher, policy, direction, tolerance: None }
	}

	/// Override the timestamp tolerance derived from the trees' precisions
	pub fn with_tolerance(mut self, tolerance: Option<Duration>) -> Self {
		self.tolerance = tolerance;
		self
	}

	pub fn direction(&self) -> Direction {
		self.direction
	}

	/// Tolerance used for `source` vs `destination`
	pub fn tolerance_for(&self, source: &Tree, destination: &Tree) -> Duration {
		self.tolerance.unwrap_or_else(|| source.precision.max(destination.precision))
	}

	/// Unordered operations that make `destination` converge to `source`
	pub fn diff(&self, source: &Tree, destination: &Tree) -> Vec<Operation> {
		let tolerance = self.tolerance_for(source, destination).as_secs().max(1) as i64;
		let mut walk = Walk { engine: self, tolerance, ops: Vec::new() };
		let dest_root = if destination.exists { Some(&destination.root) } else { None };
		walk.visit(Some(&source.root), dest_root, false);
		walk.ops
	}
}

/// State of one diff run
struct Walk<'e, 'a> {
	engine: &'e DiffEngine<'a>,
	/// Seconds; timestamps closer than this are equal
	tolerance: i64,
	ops: Vec<Operation>,
}

impl<'e, 'a> Walk<'e, 'a> {
	fn excluded(&self, path: &RelPath, parent_excluded: bool) -> bool {
		if parent_excluded {
			return true;
		}
		if !self.engine.matcher.matches(path) {
			return false;
		}
		if let Some(pattern) = self.engine.matcher.matching_pattern(path) {
			trace!("{} excluded by {}", path, pattern.glob);
		}
		true
	}

	fn push(&mut self, kind: OperationKind, path: &RelPath, conflict: bool) {
		self.ops.push(Operation {
			kind,
			path: path.clone(),
			direction: self.engine.direction,
			conflict,
		});
	}

	fn in_sync(&self, src: &Node, dst: &Node) -> bool {
		src.size == dst.size && (src.modified - dst.modified).abs() < self.tolerance
	}

	fn visit(&mut self, src: Option<&Node>, dst: Option<&Node>, parent_excluded: bool) {
		let path = match src.or(dst) {
			Some(node) => node.path.clone(),
			None => return,
		};
		if src.map_or(false, |n| n.unreadable) || dst.map_or(false, |n| n.unreadable) {
			debug!("Skipping unreadable {}", path);
			return;
		}
		let excluded = self.excluded(&path, parent_excluded);

		match (src, dst) {
			(None, None) => {}
			(Some(src), None) => self.create(src, excluded, false),
			(None, Some(dst)) => {
				self.remove(dst, excluded);
			}
			(Some(src), Some(dst)) if src.kind != dst.kind => {
				if excluded {
					self.remove(dst, true);
				} else if dst.has_unreadable() {
					warn!("Not replacing {}: part of it could not be read", path);
				} else {
					debug!("{} changes from {:?} to {:?}", path, dst.kind, src.kind);
					self.replace(dst);
					self.create(src, false, true);
				}
			}
			(Some(src), Some(dst)) if src.kind == EntryKind::File => {
				if !excluded && !self.in_sync(src, dst) {
					trace!(
						"{} differs: size {} vs {}, mtime {} vs {}",
						path,
						src.size,
						dst.size,
						src.modified,
						dst.modified
					);
					self.push(OperationKind::CopyFile, &path, false);
				}
			}
			(Some(src), Some(dst)) => {
				// An excluded directory can only hold excluded entries, which
				// matter only when they are to be deleted
				if excluded && !self.engine.policy.delete_excluded {
					return;
				}
				let names: BTreeSet<&String> = src.children.keys().chain(dst.children.keys()).collect();
				for name in names {
					self.visit(src.child(name), dst.child(name), excluded);
				}
			}
		}
	}

	/// Source-only entry and everything below it
	fn create(&mut self, src: &Node, excluded: bool, conflict: bool) {
		if excluded {
			return;
		}
		match src.kind {
			EntryKind::File => self.push(OperationKind::CopyFile, &src.path, conflict),
			EntryKind::Directory => {
				self.push(OperationKind::CreateDir, &src.path, conflict);
				for child in src.children.values() {
					self.visit(Some(child), None, false);
				}
			}
		}
	}

	/// Destination-only entry; returns true when it ends up fully deleted
	fn remove(&mut self, dst: &Node, excluded: bool) -> bool {
		if dst.unreadable {
			return false;
		}
		let allowed = self.engine.policy.allows(excluded);
		match dst.kind {
			EntryKind::File => {
				if allowed {
					self.push(OperationKind::DeleteFile, &dst.path, false);
				}
				allowed
			}
			EntryKind::Directory => {
				if !self.engine.policy.any() || (excluded && !allowed) {
					return false;
				}
				let mut emptied = true;
				for child in dst.children.values() {
					let child_excluded = self.excluded(&child.path, excluded);
					emptied &= self.remove(child, child_excluded);
				}
				if emptied && allowed {
					self.push(OperationKind::DeleteDir, &dst.path, false);
					true
				} else {
					false
				}
			}
		}
	}

	/// Destination entry of the wrong kind: delete all of it, ungated
	fn replace(&mut self, dst: &Node) {
		match dst.kind {
			EntryKind::File => self.push(OperationKind::DeleteFile, &dst.path, true),
			EntryKind::Directory => {
				for child in dst.children.values() {
					self.replace(child);
				}
				self.push(OperationKind::DeleteDir, &dst.path, true);
			}
		}
	}
}

/// Operations turning `destination` into a mirror of `source`, unordered
pub fn diff(
	source: &Tree,
	destination: &Tree,
	matcher: &PatternMatcher,
	policy: SyncPolicy,
	direction: Direction,
) -> Vec<Operation> {
	DiffEngine::new(matcher, policy, direction).diff(source, destination)
}


// vim: ts=4
