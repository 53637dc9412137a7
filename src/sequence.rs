//! Safe total order over a diff's operations

use std::cmp::Ordering;

use crate::plan::Operation;
use crate::types::RelPath;

/// Children before parents, otherwise segment-wise
pub fn post_order(a: &RelPath, b: &RelPath) -> Ordering {
	for (x, y) in a.segments().iter().zip(b.segments()) {
		match x.cmp(y) {
			Ordering::Equal => continue,
			other => return other,
		}
	}
	b.depth().cmp(&a.depth())
}

/// Order operations for execution
///
/// Conflict deletions come first (post-order) so that a path is free before
/// its replacement is created. Creations and copies follow in pre-order,
/// remaining deletions close in post-order.
pub fn sequence(operations: Vec<Operation>) -> Vec<Operation> {
	let mut conflict_deletes = Vec::new();
	let mut creates = Vec::new();
	let mut deletes = Vec::new();

	for op in operations {
		if op.kind.is_delete() {
			if op.conflict {
				conflict_deletes.push(op);
			} else {
				deletes.push(op);
			}
		} else {
			creates.push(op);
		}
	}

	conflict_deletes.sort_by(|a, b| post_order(&a.path, &b.path));
	creates.sort_by(|a, b| a.path.cmp(&b.path));
	deletes.sort_by(|a, b| post_order(&a.path, &b.path));

	conflict_deletes.into_iter().chain(creates).chain(deletes).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::plan::OperationKind;
	use crate::types::Direction;

	fn op(kind: OperationKind, path: &str) -> Operation {
		Operation {
			kind,
			path: RelPath::parse(path).unwrap(),
			direction: Direction::Push,
			conflict: false,
		}
	}

	fn rendered(ops: &[Operation]) -> Vec<String> {
		ops.iter().map(|op| format!("{} {}", op.kind, op.path)).collect()
	}

	#[test]
	fn test_post_order() {
		let p = |s: &str| RelPath::parse(s).unwrap();
		assert_eq!(post_order(&p("a/b"), &p("a")), Ordering::Less);
		assert_eq!(post_order(&p("a"), &p("a/b")), Ordering::Greater);
		assert_eq!(post_order(&p("a/z"), &p("b")), Ordering::Less);
		assert_eq!(post_order(&p("a/b"), &p("a-b")), Ordering::Less);
		assert_eq!(post_order(&p("a"), &p("a")), Ordering::Equal);
	}

	#[test]
	fn test_phases() {
		let mut replace = op(OperationKind::DeleteFile, "x");
		replace.conflict = true;
		let mut create = op(OperationKind::CreateDir, "x");
		create.conflict = true;

		let ops = vec![
			op(OperationKind::DeleteDir, "old"),
			op(OperationKind::CopyFile, "x/f"),
			op(OperationKind::DeleteFile, "old/a"),
			create,
			op(OperationKind::CopyFile, "a/b.txt"),
			replace,
			op(OperationKind::CreateDir, "a"),
			op(OperationKind::DeleteFile, "old/sub/b"),
			op(OperationKind::DeleteDir, "old/sub"),
		];

		assert_eq!(
			rendered(&sequence(ops)),
			vec![
				"delete x",
				"mkdir a",
				"copy a/b.txt",
				"mkdir x",
				"copy x/f",
				"delete old/a",
				"delete old/sub/b",
				"rmdir old/sub",
				"rmdir old",
			]
		);
	}

	#[test]
	fn test_conflict_subtree_deleted_bottom_up() {
		let conflicted = |kind, path| {
			let mut o = op(kind, path);
			o.conflict = true;
			o
		};
		let ops = vec![
			conflicted(OperationKind::DeleteDir, "d"),
			conflicted(OperationKind::CopyFile, "d"),
			conflicted(OperationKind::DeleteFile, "d/inner"),
		];
		assert_eq!(rendered(&sequence(ops)), vec!["delete d/inner", "rmdir d", "copy d"]);
	}
}

// vim: ts=4
