//! Plain-text rendering of snapshots and plans

use chrono::DateTime;
use std::fmt::Write;

use crate::plan::{OperationKind, SyncPlan};
use crate::tree::{Node, Tree};
use crate::types::EntryKind;

/// Byte count with a binary unit, e.g. `1.5 MiB`
pub fn human_size(bytes: u64) -> String {
	const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
	if bytes < 1024 {
		return format!("{} B", bytes);
	}
	let mut value = bytes as f64 / 1024.0;
	let mut unit = 0;
	while value >= 1024.0 && unit < UNITS.len() - 1 {
		value /= 1024.0;
		unit += 1;
	}
	format!("{:.1} {}", value, UNITS[unit])
}

fn timestamp(modified: i64) -> String {
	DateTime::from_timestamp(modified, 0)
		.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
		.unwrap_or_else(|| modified.to_string())
}

fn node_label(node: &Node, name: &str) -> String {
	let mut label = match node.kind {
		EntryKind::Directory => format!("{}/", name),
		EntryKind::File => {
			format!("{}  {}  {}", name, human_size(node.size), timestamp(node.modified))
		}
	};
	if node.unreadable {
		label.push_str("  [unreadable]");
	}
	label
}

fn render_children(out: &mut String, node: &Node, prefix: &str) {
	let count = node.children.len();
	for (i, (name, child)) in node.children.iter().enumerate() {
		let last = i + 1 == count;
		let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
		let _ = writeln!(out, "{}{}{}", prefix, branch, node_label(child, name));
		if child.is_dir() {
			render_children(out, child, &format!("{}{}", prefix, indent));
		}
	}
}

/// Box-drawing listing of a snapshot under a title line
pub fn render_tree(tree: &Tree, title: &str) -> String {
	let mut out = String::new();
	let _ = writeln!(out, "{}:", title);
	if !tree.exists {
		let _ = writeln!(out, "(does not exist)");
		return out;
	}
	let _ = writeln!(out, "{}", node_label(&tree.root, "."));
	render_children(&mut out, &tree.root, "");
	out
}

/// One line per operation, then warnings and a summary line
pub fn render_plan(plan: &SyncPlan) -> String {
	let mut out = String::new();
	for op in plan.operations() {
		let detail = match op.kind {
			OperationKind::CopyFile => plan
				.source
				.get(&op.path)
				.map(|n| format!(" ({})", human_size(n.size)))
				.unwrap_or_default(),
			_ => String::new(),
		};
		let marker = if op.conflict { "  [replaces]" } else { "" };
		let _ = writeln!(out, "{:<7} {}{}{}", op.kind.to_string(), op.path, detail, marker);
	}
	for warning in plan.warnings() {
		let _ = writeln!(out, "warning: {}", warning);
	}

	let s = plan.summary();
	if plan.is_empty() {
		let _ = writeln!(out, "Nothing to do");
	} else {
		let _ = writeln!(
			out,
			"{}: {} directories to create, {} files to copy ({}), {} files and {} directories to delete",
			plan.direction,
			s.create_dirs,
			s.copy_files,
			human_size(s.bytes_to_copy),
			s.delete_files,
			s.delete_dirs
		);
	}
	out
}


// vim: ts=4
