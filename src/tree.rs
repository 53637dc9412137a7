//! In-memory snapshot of one endpoint's directory hierarchy
//!
//! Trees are built once per invocation, before diffing, and never mutated
//! afterwards.

use futures::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::{EndpointError, SubtreeUnreadable, SyncError};
use crate::logging::*;
use crate::types::{EntryKind, EntryStat, RelPath};

/// Nesting limit; anything deeper is treated as unreadable
const MAX_DEPTH: usize = 256;

/// One entry of a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
	pub path: RelPath,
	pub kind: EntryKind,
	/// Byte count, zero for directories
	pub size: u64,
	/// Seconds since the Unix epoch
	pub modified: i64,
	/// Enumeration of this directory failed; it has no children
	pub unreadable: bool,
	pub children: BTreeMap<String, Node>,
}

impl Node {
	pub fn file(path: RelPath, size: u64, modified: i64) -> Self {
		Node {
			path,
			kind: EntryKind::File,
			size,
			modified,
			unreadable: false,
			children: BTreeMap::new(),
		}
	}

	pub fn dir(path: RelPath, modified: i64) -> Self {
		Node {
			path,
			kind: EntryKind::Directory,
			size: 0,
			modified,
			unreadable: false,
			children: BTreeMap::new(),
		}
	}

	fn from_stat(parent: &RelPath, stat: &EntryStat) -> Self {
		let path = parent.join(&stat.name);
		match stat.kind {
			EntryKind::File => Node::file(path, stat.size, stat.modified),
			EntryKind::Directory => Node::dir(path, stat.modified),
		}
	}

	pub fn is_dir(&self) -> bool {
		self.kind == EntryKind::Directory
	}

	pub fn child(&self, name: &str) -> Option<&Node> {
		self.children.get(name)
	}

	/// Number of nodes in this subtree, including this one
	pub fn count(&self) -> usize {
		1 + self.children.values().map(Node::count).sum::<usize>()
	}

	/// This node without its children
	fn shallow(&self) -> Node {
		Node {
			path: self.path.clone(),
			kind: self.kind,
			size: self.size,
			modified: self.modified,
			unreadable: self.unreadable,
			children: BTreeMap::new(),
		}
	}

	/// Whether this node or anything below it could not be enumerated
	pub fn has_unreadable(&self) -> bool {
		self.unreadable || self.children.values().any(Node::has_unreadable)
	}
}

/// Snapshot of one endpoint below its root
#[derive(Debug, Clone)]
pub struct Tree {
	pub root: Node,
	/// False when the destination root did not exist yet
	pub exists: bool,
	/// Timestamp granularity of the endpoint the tree was read from
	pub precision: Duration,
	/// Subdirectories whose enumeration failed
	pub unreadable: Vec<SubtreeUnreadable>,
}

impl Tree {
	pub fn new(root: Node, precision: Duration) -> Self {
		Tree { root, exists: true, precision, unreadable: Vec::new() }
	}

	/// Stand-in for a destination root that does not exist yet
	pub fn absent(precision: Duration) -> Self {
		Tree { root: Node::dir(RelPath::root(), 0), exists: false, precision, unreadable: Vec::new() }
	}

	/// Empty existing directory tree
	pub fn empty_dir(precision: Duration) -> Self {
		Tree::new(Node::dir(RelPath::root(), 0), precision)
	}

	pub fn get(&self, path: &RelPath) -> Option<&Node> {
		let mut node = &self.root;
		for segment in path.segments() {
			node = node.children.get(segment)?;
		}
		Some(node)
	}

	fn get_mut(&mut self, path: &RelPath) -> Option<&mut Node> {
		let mut node = &mut self.root;
		for segment in path.segments() {
			node = node.children.get_mut(segment)?;
		}
		Some(node)
	}

	/// Insert a file, creating missing parent directories
	pub fn insert_file(&mut self, path: &str, size: u64, modified: i64) -> &mut Self {
		self.insert(path, |rel| Node::file(rel, size, modified))
	}

	/// Insert a directory, creating missing parent directories
	pub fn insert_dir(&mut self, path: &str) -> &mut Self {
		self.insert(path, |rel| Node::dir(rel, 0))
	}

	/// Mark an inserted directory as unreadable
	pub fn mark_unreadable(&mut self, path: &str, endpoint: &str) -> &mut Self {
		let rel = RelPath::parse(path).unwrap_or_default();
		if let Some(node) = self.get_mut(&rel) {
			node.unreadable = true;
			node.children.clear();
		} else {
			return self;
		}
		self.unreadable.push(SubtreeUnreadable {
			endpoint: endpoint.to_string(),
			path: rel,
			reason: "Permission denied".to_string(),
		});
		self
	}

	fn insert(&mut self, path: &str, make: impl FnOnce(RelPath) -> Node) -> &mut Self {
		let rel = match RelPath::parse(path) {
			Ok(rel) if !rel.is_root() => rel,
			_ => return self,
		};
		let mut node = &mut self.root;
		let mut current = RelPath::root();
		let last = rel.depth() - 1;
		for (i, segment) in rel.segments().iter().enumerate() {
			current = current.join(segment);
			if i == last {
				node.children.insert(segment.clone(), make(current.clone()));
				break;
			}
			let dir = current.clone();
			node = node.children.entry(segment.clone()).or_insert_with(|| Node::dir(dir, 0));
		}
		self
	}

	/// Copy holding only `paths` and the directories leading to them
	pub fn subset<'p>(&self, paths: impl IntoIterator<Item = &'p RelPath>) -> Tree {
		let mut root = self.root.shallow();
		for path in paths {
			let mut from = &self.root;
			let mut into = &mut root;
			for segment in path.segments() {
				let Some(next) = from.children.get(segment) else {
					break;
				};
				from = next;
				into = into.children.entry(segment.clone()).or_insert_with(|| next.shallow());
			}
		}
		Tree { root, exists: self.exists, precision: self.precision, unreadable: self.unreadable.clone() }
	}

	/// Number of nodes, the root included
	pub fn len(&self) -> usize {
		self.root.count()
	}

	pub fn is_empty(&self) -> bool {
		self.root.children.is_empty()
	}
}

/// Which side of the sync a tree is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeRole {
	Source,
	Destination,
}

impl fmt::Display for TreeRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TreeRole::Source => write!(f, "source"),
			TreeRole::Destination => write!(f, "destination"),
		}
	}
}

/// Recursive enumeration through an [`Endpoint`], one request at a time
pub struct TreeBuilder<'a> {
	endpoint: &'a dyn Endpoint,
	root: &'a str,
	role: TreeRole,
	unreadable: Vec<SubtreeUnreadable>,
}

impl<'a> TreeBuilder<'a> {
	pub fn new(endpoint: &'a dyn Endpoint, root: &'a str, role: TreeRole) -> Self {
		TreeBuilder { endpoint, root, role, unreadable: Vec::new() }
	}

	/// Snapshot the tree below the root
	///
	/// Failing to read the root is fatal, except that a missing destination
	/// root yields an absent tree.
	pub async fn build(mut self) -> Result<Tree, SyncError> {
		let precision = self.endpoint.mtime_precision();
		debug!("Reading {} tree {} ({})", self.role, self.root, self.endpoint.label());

		let stat = match self.endpoint.stat(self.root).await {
			Ok(Some(stat)) => stat,
			Ok(None) if self.role == TreeRole::Destination => {
				debug!("Destination {} does not exist yet", self.root);
				return Ok(Tree::absent(precision));
			}
			Ok(None) => {
				return Err(self.unreachable(EndpointError::NotFound { path: self.root.to_string() }))
			}
			Err(e) => return Err(self.unreachable(e)),
		};

		let mut root = match stat.kind {
			EntryKind::File => Node::file(RelPath::root(), stat.size, stat.modified),
			EntryKind::Directory => Node::dir(RelPath::root(), stat.modified),
		};

		if root.is_dir() {
			let children = match self.endpoint.list_children(self.root).await {
				Ok(children) => children,
				Err(e) => return Err(self.unreachable(e)),
			};
			self.attach(&mut root, children, 1).await;
		}

		let mut tree = Tree::new(root, precision);
		tree.unreadable = self.unreadable;
		debug!("Read {} {} entries", tree.len() - 1, self.role);
		Ok(tree)
	}

	fn unreachable(&self, source: EndpointError) -> SyncError {
		SyncError::EndpointUnreachable {
			endpoint: self.endpoint.label().to_string(),
			path: self.root.to_string(),
			source,
		}
	}

	fn attach<'b>(
		&'b mut self,
		node: &'b mut Node,
		children: Vec<EntryStat>,
		depth: usize,
	) -> BoxFuture<'b, ()> {
		async move {
			for stat in children {
				if stat.name.is_empty() || stat.name.contains('/') {
					warn!("Ignoring invalid entry name {:?} in {}", stat.name, node.path);
					continue;
				}
				let mut child = Node::from_stat(&node.path, &stat);
				if child.is_dir() {
					self.fill(&mut child, depth).await;
				}
				node.children.insert(stat.name, child);
			}
		}
		.boxed()
	}

	/// Enumerate one subdirectory; failures mark it unreadable
	fn fill<'b>(&'b mut self, node: &'b mut Node, depth: usize) -> BoxFuture<'b, ()> {
		async move {
			if depth >= MAX_DEPTH {
				self.mark_unreadable(node, "directory nesting too deep".to_string());
				return;
			}
			let path = self.endpoint.join(self.root, &node.path);
			match self.endpoint.list_children(&path).await {
				Ok(children) => self.attach(node, children, depth + 1).await,
				Err(e) => self.mark_unreadable(node, e.to_string()),
			}
		}
		.boxed()
	}

	fn mark_unreadable(&mut self, node: &mut Node, reason: String) {
		let warning = SubtreeUnreadable {
			endpoint: self.role.to_string(),
			path: node.path.clone(),
			reason,
		};
		warn!("{}", warning);
		node.unreadable = true;
		node.children.clear();
		self.unreadable.push(warning);
	}
}

/// Snapshot `root` on `endpoint`
pub async fn build_tree(endpoint: &dyn Endpoint, root: &str, role: TreeRole) -> Result<Tree, SyncError> {
	TreeBuilder::new(endpoint, root, role).build().await
}


// vim: ts=4
