//! Operations and the ordered sync plan

use serde::Serialize;
use std::fmt;

use crate::diff::{DiffEngine, SyncPolicy};
use crate::error::SubtreeUnreadable;
use crate::exclusion::PatternMatcher;
use crate::sequence::sequence;
use crate::tree::Tree;
use crate::types::{Direction, RelPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
	CreateDir,
	CopyFile,
	DeleteFile,
	DeleteDir,
}

impl OperationKind {
	pub fn is_delete(&self) -> bool {
		matches!(self, OperationKind::DeleteFile | OperationKind::DeleteDir)
	}

	pub fn is_create(&self) -> bool {
		!self.is_delete()
	}
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			OperationKind::CreateDir => "mkdir",
			OperationKind::CopyFile => "copy",
			OperationKind::DeleteFile => "delete",
			OperationKind::DeleteDir => "rmdir",
		};
		write!(f, "{}", label)
	}
}

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
	pub kind: OperationKind,
	pub path: RelPath,
	pub direction: Direction,
	/// Half of a delete-then-create pair replacing an entry of the other kind
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub conflict: bool,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.kind, self.path)
	}
}

/// Operation counts of a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
	pub create_dirs: usize,
	pub copy_files: usize,
	pub delete_files: usize,
	pub delete_dirs: usize,
	pub bytes_to_copy: u64,
	pub conflicts: usize,
}

impl PlanSummary {
	pub fn total(&self) -> usize {
		self.create_dirs + self.copy_files + self.delete_files + self.delete_dirs
	}
}

/// Ordered operations for one invocation, together with the snapshots they were
/// computed from
#[derive(Debug, Clone)]
pub struct SyncPlan {
	pub direction: Direction,
	pub source: Tree,
	pub destination: Tree,
	operations: Vec<Operation>,
	warnings: Vec<SubtreeUnreadable>,
}

impl SyncPlan {
	pub fn build(source: Tree, destination: Tree, engine: &DiffEngine<'_>) -> Self {
		let operations = sequence(engine.diff(&source, &destination));
		let warnings = source.unreadable.iter().chain(&destination.unreadable).cloned().collect();
		SyncPlan { direction: engine.direction(), source, destination, operations, warnings }
	}

	pub fn operations(&self) -> &[Operation] {
		&self.operations
	}

	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}

	pub fn len(&self) -> usize {
		self.operations.len()
	}

	pub fn summary(&self) -> PlanSummary {
		let mut summary = PlanSummary::default();
		for op in &self.operations {
			match op.kind {
				OperationKind::CreateDir => summary.create_dirs += 1,
				OperationKind::CopyFile => {
					summary.copy_files += 1;
					summary.bytes_to_copy += self.source.get(&op.path).map_or(0, |n| n.size);
				}
				OperationKind::DeleteFile => summary.delete_files += 1,
				OperationKind::DeleteDir => summary.delete_dirs += 1,
			}
		}
		summary.conflicts = self.conflicts().len();
		summary
	}

	/// Paths where an entry gets replaced by one of the other kind
	pub fn conflicts(&self) -> Vec<&RelPath> {
		self.operations
			.iter()
			.filter(|op| op.conflict && op.kind.is_create())
			.map(|op| &op.path)
			.collect()
	}

	/// Subtrees that could not be read and were left alone
	pub fn warnings(&self) -> &[SubtreeUnreadable] {
		&self.warnings
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		let view = PlanJson {
			direction: self.direction,
			summary: self.summary(),
			operations: &self.operations,
			warnings: self.warnings.iter().map(|w| w.to_string()).collect(),
		};
		serde_json::to_string_pretty(&view)
	}
}

impl fmt::Display for SyncPlan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", crate::render::render_plan(self))
	}
}

#[derive(Serialize)]
struct PlanJson<'a> {
	direction: Direction,
	summary: PlanSummary,
	operations: &'a [Operation],
	warnings: Vec<String>,
}

/// Diff and sequence two snapshots
pub fn build_plan(
	source: Tree,
	destination: Tree,
	matcher: &PatternMatcher,
	policy: SyncPolicy,
	direction: Direction,
) -> SyncPlan {
	SyncPlan::build(source, destination, &DiffEngine::new(matcher, policy, direction))
}


// vim: ts=4
