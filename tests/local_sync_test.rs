/// Real file integration tests - local to local syncs through the full pipeline
///
/// These tests create real directories with files, run actual syncs with
/// different options, and then verify the results on disk.
///
/// Tests verify:
/// 1. Copies land with their modification times, so a second run is empty
/// 2. Dry-run doesn't modify files
/// 3. Deletion flags actually delete/preserve files
/// 4. Trailing-slash root resolution
/// 5. Failures are isolated to their subtree
/// 6. Cancellation stops between operations
use async_trait::async_trait;
use filetime::{set_file_mtime, FileTime};
use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

use adbsync::endpoint::{Endpoint, EndpointResult, FileCopier, LocalEndpoint};
use adbsync::error::ConflictStep;
use adbsync::sync::{plan_sync, sync_endpoints, SyncOptions};
use adbsync::{
	Direction, EndpointError, EntryStat, ExecutionError, Executor, OperationKind, PatternMatcher, RelPath,
	SyncPolicy,
};

/// Helper to create a file with specific content and modification time
fn create_file(dir: &Path, name: &str, content: &str, mtime: i64) {
	let path = dir.join(name);
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).unwrap();
	}
	fs::write(&path, content).unwrap();
	set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

fn read_file(dir: &Path, name: &str) -> Option<String> {
	fs::read_to_string(dir.join(name)).ok()
}

fn mtime(dir: &Path, name: &str) -> i64 {
	let meta = fs::metadata(dir.join(name)).unwrap();
	FileTime::from_last_modification_time(&meta).unix_seconds()
}

/// Source root with a trailing slash: sync contents, not the directory itself
fn contents(dir: &Path) -> String {
	format!("{}/", dir.to_str().unwrap())
}

fn root(dir: &Path) -> String {
	dir.to_str().unwrap().to_string()
}

fn options() -> SyncOptions {
	SyncOptions { silent: true, ..SyncOptions::default() }
}

fn excluding(patterns: &[&str], policy: SyncPolicy) -> SyncOptions {
	let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
	SyncOptions {
		matcher: PatternMatcher::compile(&patterns, &[], false).unwrap(),
		policy,
		..options()
	}
}

/// Local copier failing for one file name
struct FailingCopier {
	inner: LocalEndpoint,
	fail_on: &'static str,
}

#[async_trait]
impl FileCopier for FailingCopier {
	async fn copy_file(&self, source: &str, destination: &str) -> EndpointResult<()> {
		if source.ends_with(self.fail_on) {
			return Err(EndpointError::TransferFailed { message: "device full".to_string() });
		}
		self.inner.copy_file(source, destination).await
	}
}

/// Local endpoint refusing to remove one file name
struct StubbornEndpoint {
	inner: LocalEndpoint,
	keep: &'static str,
}

#[async_trait]
impl Endpoint for StubbornEndpoint {
	fn label(&self) -> &str {
		self.inner.label()
	}

	fn mtime_precision(&self) -> Duration {
		self.inner.mtime_precision()
	}

	fn join(&self, root: &str, rel: &RelPath) -> String {
		self.inner.join(root, rel)
	}

	fn split<'a>(&self, path: &'a str) -> (&'a str, &'a str) {
		self.inner.split(path)
	}

	async fn stat(&self, path: &str) -> EndpointResult<Option<EntryStat>> {
		self.inner.stat(path).await
	}

	async fn list_children(&self, path: &str) -> EndpointResult<Vec<EntryStat>> {
		self.inner.list_children(path).await
	}

	async fn create_dir(&self, path: &str) -> EndpointResult<()> {
		self.inner.create_dir(path).await
	}

	async fn remove_file(&self, path: &str) -> EndpointResult<()> {
		if path.ends_with(self.keep) {
			return Err(EndpointError::PermissionDenied { path: path.to_string() });
		}
		self.inner.remove_file(path).await
	}

	async fn remove_dir(&self, path: &str) -> EndpointResult<()> {
		self.inner.remove_dir(path).await
	}

	async fn set_modified(&self, path: &str, modified: i64) -> EndpointResult<()> {
		self.inner.set_modified(path, modified).await
	}
}

// ===================================================================
// COPY AND IDEMPOTENCE
// ===================================================================

#[tokio::test]
async fn test_push_then_replan_is_empty() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "a/b.txt", "0123456789", 1_700_000_000);
	create_file(src.path(), "a/c.txt", "hello", 1_700_000_100);
	create_file(src.path(), "top.txt", "top", 1_600_000_000);
	let ep = LocalEndpoint::new(false);

	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(dst.path()), &ep, Direction::Push, &options())
		.await
		.unwrap();
	assert!(outcome.is_success());
	assert_eq!(outcome.report.unwrap().applied, 4);

	assert_eq!(read_file(dst.path(), "a/b.txt").unwrap(), "0123456789");
	assert_eq!(read_file(dst.path(), "top.txt").unwrap(), "top");
	assert_eq!(mtime(dst.path(), "a/c.txt"), 1_700_000_100);

	let again = plan_sync(&ep, &contents(src.path()), &ep, &root(dst.path()), Direction::Push, &options())
		.await
		.unwrap();
	assert!(again.plan.is_empty(), "{}", again.plan);
}

#[tokio::test]
async fn test_changed_file_is_overwritten() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "note.txt", "new text", 1_700_000_500);
	create_file(dst.path(), "note.txt", "old text", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(dst.path()), &ep, Direction::Pull, &options())
		.await
		.unwrap();
	assert!(outcome.is_success());
	assert_eq!(read_file(dst.path(), "note.txt").unwrap(), "new text");
	assert_eq!(mtime(dst.path(), "note.txt"), 1_700_000_500);
}

#[tokio::test]
async fn test_missing_destination_root_is_created() {
	let src = TempDir::new().unwrap();
	let parent = TempDir::new().unwrap();
	let dst = parent.path().join("fresh");
	create_file(src.path(), "x/y.txt", "y", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(&dst), &ep, Direction::Push, &options())
		.await
		.unwrap();
	assert!(outcome.is_success());
	assert_eq!(read_file(&dst, "x/y.txt").unwrap(), "y");
}

// ===================================================================
// DRY RUN
// ===================================================================

#[tokio::test]
async fn test_dry_run_changes_nothing() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "a.txt", "a", 1_700_000_000);
	create_file(dst.path(), "stale.txt", "s", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let opts = SyncOptions {
		dry_run: true,
		policy: SyncPolicy { delete: true, delete_excluded: false },
		..options()
	};
	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(dst.path()), &ep, Direction::Push, &opts)
		.await
		.unwrap();

	assert!(outcome.report.is_none());
	assert_eq!(outcome.planned.plan.len(), 2);
	assert!(read_file(dst.path(), "a.txt").is_none());
	assert!(read_file(dst.path(), "stale.txt").is_some());
}

#[tokio::test]
async fn test_show_tree_does_not_execute() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "a.txt", "a", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let opts = SyncOptions { show_tree: true, ..options() };
	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(dst.path()), &ep, Direction::Push, &opts)
		.await
		.unwrap();

	assert!(outcome.report.is_none());
	assert_eq!(outcome.planned.plan.len(), 1);
	assert!(read_file(dst.path(), "a.txt").is_none());
}

// ===================================================================
// DELETION
// ===================================================================

#[tokio::test]
async fn test_delete_flags_on_disk() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "keep.txt", "k", 1_700_000_000);
	create_file(dst.path(), "keep.txt", "k", 1_700_000_000);
	create_file(dst.path(), "old/gone.txt", "g", 1_700_000_000);
	create_file(dst.path(), "old/cache.tmp", "c", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let opts = excluding(&["*.tmp"], SyncPolicy { delete: true, delete_excluded: false });
	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(dst.path()), &ep, Direction::Push, &opts)
		.await
		.unwrap();
	assert!(outcome.is_success());
	assert!(!dst.path().join("old/gone.txt").exists());
	assert!(dst.path().join("old/cache.tmp").exists());

	let opts = excluding(&["*.tmp"], SyncPolicy { delete: true, delete_excluded: true });
	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(dst.path()), &ep, Direction::Push, &opts)
		.await
		.unwrap();
	assert!(outcome.is_success());
	assert!(!dst.path().join("old").exists());
	assert!(dst.path().join("keep.txt").exists());
}

// ===================================================================
// COPY TO NEW FOLDER
// ===================================================================

#[tokio::test]
async fn test_copy_to_new_folder_sends_only_changes() {
	let src = TempDir::new().unwrap();
	let parent = TempDir::new().unwrap();
	let dst = parent.path().join("backup");
	create_file(src.path(), "same.txt", "same", 1_700_000_000);
	create_file(src.path(), "changed.txt", "new", 1_700_000_500);
	create_file(src.path(), "fresh/added.txt", "added", 1_700_000_000);
	create_file(&dst, "same.txt", "same", 1_700_000_000);
	create_file(&dst, "changed.txt", "old", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let opts = SyncOptions { copy_to_new_folder: true, ..options() };
	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(&dst), &ep, Direction::Push, &opts)
		.await
		.unwrap();
	assert!(outcome.is_success());

	let dated = Path::new(&outcome.planned.destination_root).to_path_buf();
	assert_eq!(dated.parent().unwrap(), parent.path());
	assert!(dated.file_name().unwrap().to_str().unwrap().starts_with("backup_"));
	assert_eq!(read_file(&dated, "changed.txt").unwrap(), "new");
	assert_eq!(read_file(&dated, "fresh/added.txt").unwrap(), "added");
	assert!(read_file(&dated, "same.txt").is_none());

	// Original destination untouched
	assert_eq!(read_file(&dst, "changed.txt").unwrap(), "old");
	assert!(!dst.join("fresh").exists());
}

#[tokio::test]
async fn test_copy_to_new_folder_without_destination_is_plain_sync() {
	let src = TempDir::new().unwrap();
	let parent = TempDir::new().unwrap();
	let dst = parent.path().join("backup");
	create_file(src.path(), "a.txt", "a", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let opts = SyncOptions { copy_to_new_folder: true, ..options() };
	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(&dst), &ep, Direction::Push, &opts)
		.await
		.unwrap();
	assert!(outcome.is_success());
	assert_eq!(outcome.planned.destination_root, root(&dst));
	assert_eq!(read_file(&dst, "a.txt").unwrap(), "a");
}

// ===================================================================
// ROOT RESOLUTION
// ===================================================================

#[tokio::test]
async fn test_source_without_trailing_slash_goes_below_destination() {
	let parent = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	let src = parent.path().join("Camera");
	create_file(&src, "IMG_1.jpg", "jpeg", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let outcome = sync_endpoints(&ep, &root(&src), &ep, &root(dst.path()), &ep, Direction::Pull, &options())
		.await
		.unwrap();
	assert!(outcome.is_success());
	assert_eq!(read_file(dst.path(), "Camera/IMG_1.jpg").unwrap(), "jpeg");
	assert!(!dst.path().join("IMG_1.jpg").exists());
}

#[tokio::test]
async fn test_single_file_source() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "song.mp3", "la la", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let file = root(&src.path().join("song.mp3"));
	let outcome = sync_endpoints(&ep, &file, &ep, &root(dst.path()), &ep, Direction::Push, &options())
		.await
		.unwrap();
	assert!(outcome.is_success());
	assert_eq!(read_file(dst.path(), "song.mp3").unwrap(), "la la");
	assert_eq!(mtime(dst.path(), "song.mp3"), 1_700_000_000);
}

// ===================================================================
// FAILURES AND CANCELLATION
// ===================================================================

#[tokio::test]
async fn test_failed_copy_does_not_stop_independent_files() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "a/bad.bin", "x", 1_700_000_000);
	create_file(src.path(), "a/good.bin", "y", 1_700_000_000);
	create_file(src.path(), "b/other.bin", "z", 1_700_000_000);
	let ep = LocalEndpoint::new(false);
	let copier = FailingCopier { inner: LocalEndpoint::new(false), fail_on: "bad.bin" };

	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(dst.path()), &copier, Direction::Push, &options())
		.await
		.unwrap();

	let report = outcome.report.unwrap();
	assert!(!report.is_success());
	assert_eq!(report.errors.len(), 1);
	assert!(matches!(
		&report.errors[0],
		ExecutionError::Transfer { operation, .. } if operation.path.to_string() == "a/bad.bin"
	));
	assert!(dst.path().join("a/good.bin").exists());
	assert!(dst.path().join("b/other.bin").exists());
}

#[tokio::test]
async fn test_cancellation_between_operations() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "1.txt", "1", 1_700_000_000);
	create_file(src.path(), "2.txt", "2", 1_700_000_000);
	create_file(src.path(), "3.txt", "3", 1_700_000_000);
	let ep = LocalEndpoint::new(false);

	let planned = plan_sync(&ep, &contents(src.path()), &ep, &root(dst.path()), Direction::Push, &options())
		.await
		.unwrap();
	assert_eq!(planned.plan.len(), 3);

	let checks = Cell::new(0);
	let executor = Executor::new(&ep, &planned.source_root, &ep, &planned.destination_root, &ep);
	let report = executor
		.execute_until(&planned.plan, || {
			checks.set(checks.get() + 1);
			checks.get() > 1
		})
		.await;

	assert!(report.cancelled);
	assert_eq!(report.applied, 1);
	assert!(dst.path().join("1.txt").exists());
	assert!(!dst.path().join("2.txt").exists());
}

// ===================================================================
// KIND CONFLICTS
// ===================================================================

#[tokio::test]
async fn test_failed_conflict_delete_leaves_old_directory() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "d", "now a file", 1_700_000_000);
	create_file(dst.path(), "d/inner/keep.txt", "k", 1_700_000_000);
	create_file(dst.path(), "d/other.txt", "o", 1_700_000_000);
	let ep = LocalEndpoint::new(false);
	let stubborn = StubbornEndpoint { inner: LocalEndpoint::new(false), keep: "keep.txt" };

	let opts = SyncOptions { force: true, ..options() };
	let outcome = sync_endpoints(&ep, &contents(src.path()), &stubborn, &root(dst.path()), &ep, Direction::Push, &opts)
		.await
		.unwrap();
	let report = outcome.report.unwrap();
	assert!(!report.is_success());
	assert_eq!(report.applied, 1);

	let failures: Vec<&ExecutionError> = report.failures().collect();
	assert_eq!(failures.len(), 1);
	assert!(matches!(
		failures[0],
		ExecutionError::KindConflictResolution { path, completed: ConflictStep::NothingApplied, .. }
			if path.to_string() == "d"
	));
	assert!(report.errors.iter().any(|e| matches!(
		e,
		ExecutionError::Skipped { operation, .. }
			if operation.kind == OperationKind::CopyFile && operation.path.to_string() == "d"
	)));

	assert!(dst.path().join("d").is_dir());
	assert_eq!(read_file(dst.path(), "d/inner/keep.txt").unwrap(), "k");
}

#[tokio::test]
async fn test_failed_conflict_create_reports_deleted_step() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "swap.bin", "new", 1_700_000_000);
	fs::create_dir(dst.path().join("swap.bin")).unwrap();
	let ep = LocalEndpoint::new(false);
	let copier = FailingCopier { inner: LocalEndpoint::new(false), fail_on: "swap.bin" };

	let opts = SyncOptions { force: true, ..options() };
	let outcome = sync_endpoints(&ep, &contents(src.path()), &ep, &root(dst.path()), &copier, Direction::Push, &opts)
		.await
		.unwrap();
	let report = outcome.report.unwrap();

	assert_eq!(report.applied, 1);
	assert_eq!(report.errors.len(), 1);
	assert!(matches!(
		&report.errors[0],
		ExecutionError::KindConflictResolution { path, completed: ConflictStep::Deleted, .. }
			if path.to_string() == "swap.bin"
	));
	assert!(!dst.path().join("swap.bin").exists());
}
