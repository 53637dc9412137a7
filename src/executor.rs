//! Applies a sync plan through the endpoint adapters
//!
//! Operations run strictly in plan order, one at a time. A failure only
//! affects the operations that depend on the failed path; independent
//! subtrees still get synced.

use crate::endpoint::{Endpoint, EndpointResult, FileCopier};
use crate::error::{ConflictStep, ExecutionError};
use crate::logging::*;
use crate::plan::{Operation, OperationKind, SyncPlan};
use crate::types::RelPath;
use crate::utils::shutdown_requested;

/// Outcome of one execution
#[derive(Debug, Default)]
pub struct ExecutionReport {
	/// Operations that completed
	pub applied: usize,
	pub errors: Vec<ExecutionError>,
	/// Stopped early on a termination signal
	pub cancelled: bool,
}

impl ExecutionReport {
	pub fn is_success(&self) -> bool {
		self.errors.is_empty() && !self.cancelled
	}

	/// Errors other than skips caused by an earlier failure
	pub fn failures(&self) -> impl Iterator<Item = &ExecutionError> {
		self.errors.iter().filter(|e| !matches!(e, ExecutionError::Skipped { .. }))
	}
}

pub struct Executor<'a> {
	source: &'a dyn Endpoint,
	source_root: &'a str,
	destination: &'a dyn Endpoint,
	destination_root: &'a str,
	copier: &'a dyn FileCopier,
}

impl<'a> Executor<'a> {
	pub fn new(
		source: &'a dyn Endpoint,
		source_root: &'a str,
		destination: &'a dyn Endpoint,
		destination_root: &'a str,
		copier: &'a dyn FileCopier,
	) -> Self {
		Executor { source, source_root, destination, destination_root, copier }
	}

	/// Run the plan, stopping between operations on a termination signal
	pub async fn execute(&self, plan: &SyncPlan) -> ExecutionReport {
		self.execute_until(plan, shutdown_requested).await
	}

	/// Run the plan, checking `should_stop` before every operation
	pub async fn execute_until(
		&self,
		plan: &SyncPlan,
		should_stop: impl Fn() -> bool,
	) -> ExecutionReport {
		let mut report = ExecutionReport::default();
		let mut failed: Vec<RelPath> = Vec::new();

		for op in plan.operations() {
			if should_stop() {
				warn!("Stopping, {} operations not applied", plan.len() - report.applied - report.errors.len());
				report.cancelled = true;
				break;
			}

			if let Some(blocker) = blocked_by(op, &failed) {
				debug!("Skipping {}: {} failed", op, blocker);
				report.errors.push(ExecutionError::Skipped { operation: op.clone(), blocked_by: blocker });
				continue;
			}

			match self.apply(op, plan).await {
				Ok(()) => {
					info!("{}", op);
					report.applied += 1;
				}
				Err(source) => {
					failed.push(op.path.clone());
					let error = if op.conflict {
						let completed = if op.kind.is_delete() {
							ConflictStep::NothingApplied
						} else {
							ConflictStep::Deleted
						};
						ExecutionError::KindConflictResolution { path: conflict_root(op, plan), completed, source }
					} else {
						ExecutionError::Transfer { operation: op.clone(), source }
					};
					error!("{}", error);
					report.errors.push(error);
				}
			}
		}

		report
	}

	async fn apply(&self, op: &Operation, plan: &SyncPlan) -> EndpointResult<()> {
		let target = self.destination.join(self.destination_root, &op.path);
		match op.kind {
			OperationKind::CreateDir => self.destination.create_dir(&target).await,
			OperationKind::CopyFile => {
				let source = self.source.join(self.source_root, &op.path);
				self.copier.copy_file(&source, &target).await?;
				match plan.source.get(&op.path) {
					Some(node) => self.destination.set_modified(&target, node.modified).await,
					None => Ok(()),
				}
			}
			OperationKind::DeleteFile => self.destination.remove_file(&target).await,
			OperationKind::DeleteDir => self.destination.remove_dir(&target).await,
		}
	}
}

/// Path of the replacement `op` is part of
///
/// Deletions of a replaced directory's contents report the directory itself.
fn conflict_root(op: &Operation, plan: &SyncPlan) -> RelPath {
	plan.conflicts()
		.into_iter()
		.find(|root| op.path == **root || op.path.is_descendant_of(root))
		.unwrap_or(&op.path)
		.clone()
}

/// The failed path that makes `op` pointless, if any
///
/// Creations below a failed path (or replacing a subtree whose removal
/// failed) cannot succeed; a directory cannot be removed while something
/// below it failed to go away.
fn blocked_by(op: &Operation, failed: &[RelPath]) -> Option<RelPath> {
	failed
		.iter()
		.find(|f| match op.kind {
			OperationKind::CreateDir | OperationKind::CopyFile => {
				op.path == **f || op.path.is_descendant_of(f) || (op.conflict && f.is_descendant_of(&op.path))
			}
			OperationKind::DeleteDir => f.is_descendant_of(&op.path),
			OperationKind::DeleteFile => false,
		})
		.cloned()
}


// vim: ts=4
