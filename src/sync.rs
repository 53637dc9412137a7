//! One sync invocation: resolve roots, snapshot, plan, print, execute

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::diff::{DiffEngine, SyncPolicy};
use crate::endpoint::{AdbBridge, AdbTransfer, DeviceEndpoint, Endpoint, FileCopier, LocalEndpoint};
use crate::error::SyncError;
use crate::exclusion::PatternMatcher;
use crate::executor::{ExecutionReport, Executor};
use crate::logging::*;
use crate::plan::SyncPlan;
use crate::render::render_tree;
use crate::tree::{build_tree, TreeRole};
use crate::types::{Direction, EntryKind, RelPath};

/// Everything the engine needs besides the endpoints
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
	pub matcher: PatternMatcher,
	pub policy: SyncPolicy,
	/// Overrides the endpoints' declared timestamp precision
	pub tolerance: Option<Duration>,
	pub force: bool,
	/// Send changes into a dated sibling of an existing destination
	pub copy_to_new_folder: bool,
	pub dry_run: bool,
	/// Print both snapshots with the plan; implies a dry run
	pub show_tree: bool,
	pub json: bool,
	/// Don't print anything to stdout
	pub silent: bool,
}

impl SyncOptions {
	pub fn from_config(config: &Config) -> Result<Self, SyncError> {
		config.validate()?;
		let matcher = PatternMatcher::compile(
			&config.exclude_patterns,
			&config.exclude_from,
			config.case_insensitive,
		)?;
		debug!(
			"Compiled {} exclude patterns{}",
			matcher.patterns().len(),
			if matcher.is_case_insensitive() { ", ignoring case" } else { "" }
		);
		Ok(SyncOptions {
			matcher,
			policy: config.policy(),
			tolerance: config.mtime_tolerance(),
			force: config.force,
			copy_to_new_folder: config.copy_to_new_folder,
			dry_run: config.dry_run,
			show_tree: config.show_tree,
			json: config.json,
			silent: false,
		})
	}
}

/// A plan together with the roots it applies to
#[derive(Debug)]
pub struct PlannedSync {
	pub plan: SyncPlan,
	pub source_root: String,
	pub destination_root: String,
}

/// Result of [`sync_endpoints`]
#[derive(Debug)]
pub struct SyncOutcome {
	pub planned: PlannedSync,
	/// `None` for dry runs, tree displays and empty plans
	pub report: Option<ExecutionReport>,
}

impl SyncOutcome {
	pub fn is_success(&self) -> bool {
		self.report.as_ref().map_or(true, ExecutionReport::is_success)
	}
}

fn has_trailing_separator(path: &str) -> bool {
	path.ends_with('/') || (cfg!(windows) && path.ends_with('\\'))
}

/// Apply rsync's trailing-slash rule to the destination root
///
/// When the destination is an existing directory and the source is a file,
/// or a directory named without a trailing separator, the source is synced
/// into `destination/basename(source)`.
pub async fn resolve_destination(
	source: &dyn Endpoint,
	source_root: &str,
	destination: &dyn Endpoint,
	destination_root: &str,
) -> Result<String, SyncError> {
	let dest_stat = destination.stat(destination_root).await.map_err(|e| {
		SyncError::EndpointUnreachable {
			endpoint: destination.label().to_string(),
			path: destination_root.to_string(),
			source: e,
		}
	})?;
	if !matches!(dest_stat, Some(ref s) if s.kind == EntryKind::Directory) {
		return Ok(destination_root.to_string());
	}

	let source_is_file = matches!(
		source.stat(source_root).await,
		Ok(Some(ref s)) if s.kind == EntryKind::File
	);
	if !source_is_file && has_trailing_separator(source_root) {
		return Ok(destination_root.to_string());
	}

	let name = source.split(source_root).1;
	match RelPath::parse(name) {
		Ok(rel) if rel.depth() == 1 => {
			let resolved = destination.join(destination_root, &rel);
			debug!("Destination root resolved to {}", resolved);
			Ok(resolved)
		}
		_ => Ok(destination_root.to_string()),
	}
}

/// `root_YYYY_MM_DD`
pub fn dated_root(root: &str, date: NaiveDate) -> String {
	let base = root.trim_end_matches(|c: char| c == '/' || c == '\\');
	let base = if base.is_empty() { root } else { base };
	format!("{}_{}", base, date.format("%Y_%m_%d"))
}

/// Snapshot both sides and compute the plan; reads only
pub async fn plan_sync(
	source: &dyn Endpoint,
	source_root: &str,
	destination: &dyn Endpoint,
	destination_root: &str,
	direction: Direction,
	options: &SyncOptions,
) -> Result<PlannedSync, SyncError> {
	let destination_root = resolve_destination(source, source_root, destination, destination_root).await?;
	info!("{}: {} -> {}", direction, source_root, destination_root);

	let source_tree = build_tree(source, source_root, TreeRole::Source).await?;
	let destination_tree = build_tree(destination, &destination_root, TreeRole::Destination).await?;

	let engine = DiffEngine::new(&options.matcher, options.policy, direction).with_tolerance(options.tolerance);
	debug!("Timestamp tolerance {:?}", engine.tolerance_for(&source_tree, &destination_tree));
	let mut plan = SyncPlan::build(source_tree, destination_tree, &engine);
	let mut destination_root = destination_root;

	if options.copy_to_new_folder && plan.destination.exists {
		let dated = dated_root(&destination_root, Local::now().date_naive());
		info!("Sending changes to {}", dated);
		let changed: Vec<&RelPath> =
			plan.operations().iter().filter(|op| op.kind.is_create()).map(|op| &op.path).collect();
		let source_tree = plan.source.subset(changed);
		let destination_tree = build_tree(destination, &dated, TreeRole::Destination).await?;
		plan = SyncPlan::build(source_tree, destination_tree, &engine);
		destination_root = dated;
	}

	Ok(PlannedSync { plan, source_root: source_root.to_string(), destination_root })
}

/// Print trees and plan to stdout as the options ask
pub fn print_plan(planned: &PlannedSync, options: &SyncOptions) -> Result<(), SyncError> {
	if options.silent {
		return Ok(());
	}
	if options.json {
		let json = planned.plan.to_json().map_err(|e| SyncError::Io(e.into()))?;
		println!("{}", json);
		return Ok(());
	}
	if options.show_tree {
		print!("{}", render_tree(&planned.plan.source, &format!("Source {}", planned.source_root)));
		println!();
		print!(
			"{}",
			render_tree(&planned.plan.destination, &format!("Destination {}", planned.destination_root))
		);
		println!();
	}
	print!("{}", planned.plan);
	Ok(())
}

/// Execute a plan, refusing kind conflicts unless forced
pub async fn apply_plan(
	planned: &PlannedSync,
	source: &dyn Endpoint,
	destination: &dyn Endpoint,
	copier: &dyn FileCopier,
	options: &SyncOptions,
) -> Result<ExecutionReport, SyncError> {
	let conflicts = planned.plan.conflicts();
	if !conflicts.is_empty() && !options.force {
		return Err(SyncError::KindConflictRefused { paths: conflicts.into_iter().cloned().collect() });
	}

	let executor = Executor::new(
		source,
		&planned.source_root,
		destination,
		&planned.destination_root,
		copier,
	);
	let report = executor.execute(&planned.plan).await;
	if report.is_success() {
		info!("Applied {} operations", report.applied);
	} else {
		warn!(
			"Applied {} of {} operations, {} errors{}",
			report.applied,
			planned.plan.len(),
			report.errors.len(),
			if report.cancelled { ", cancelled" } else { "" }
		);
	}
	Ok(report)
}

/// Plan, print and (unless dry run or tree display) execute one sync between two endpoints
pub async fn sync_endpoints(
	source: &dyn Endpoint,
	source_root: &str,
	destination: &dyn Endpoint,
	destination_root: &str,
	copier: &dyn FileCopier,
	direction: Direction,
	options: &SyncOptions,
) -> Result<SyncOutcome, SyncError> {
	let planned = plan_sync(source, source_root, destination, destination_root, direction, options).await?;
	print_plan(&planned, options)?;

	if options.dry_run || options.show_tree || planned.plan.is_empty() {
		return Ok(SyncOutcome { planned, report: None });
	}

	let report = apply_plan(&planned, source, destination, copier, options).await?;
	Ok(SyncOutcome { planned, report: Some(report) })
}

/// Sync between the local filesystem and the device
///
/// `local` and `device` are the two command line paths; `direction` decides
/// which one is the source.
pub async fn run(
	config: &Config,
	direction: Direction,
	local: &str,
	device: &str,
) -> Result<SyncOutcome, SyncError> {
	let options = SyncOptions::from_config(config)?;

	let bridge = Arc::new(AdbBridge::connect(&config.adb).await?);
	let local_ep = LocalEndpoint::new(config.copy_links);
	let device_ep = DeviceEndpoint::new(bridge.clone(), config.copy_links);
	let transfer = AdbTransfer::new(bridge, direction);

	match direction {
		Direction::Push => {
			sync_endpoints(&local_ep, local, &device_ep, device, &transfer, direction, &options).await
		}
		Direction::Pull => {
			sync_endpoints(&device_ep, device, &local_ep, local, &transfer, direction, &options).await
		}
	}
}


// vim: ts=4
