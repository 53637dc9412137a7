//! # adbsync - Mirror directory trees between a computer and an Android device
//!
//! adbsync snapshots both sides of a sync, computes an ordered plan of
//! create/copy/delete operations honouring exclusion patterns and deletion
//! flags, and applies it through `adb`.
//!
//! ## Planning without a device
//!
//! ```rust,ignore
//! use adbsync::{build_plan, Direction, PatternMatcher, SyncPolicy, Tree};
//! use adbsync::endpoint::LOCAL_MTIME_PRECISION;
//!
//! let mut source = Tree::empty_dir(LOCAL_MTIME_PRECISION);
//! source.insert_file("a/b.txt", 10, 100);
//! let destination = Tree::absent(LOCAL_MTIME_PRECISION);
//!
//! let matcher = PatternMatcher::compile(&["*.tmp".to_string()], &[], false)?;
//! let plan = build_plan(source, destination, &matcher, SyncPolicy::default(), Direction::Push);
//! print!("{}", plan);
//! ```
//!
//! ## Syncing two local directories
//!
//! ```rust,ignore
//! use adbsync::endpoint::LocalEndpoint;
//! use adbsync::sync::{sync_endpoints, SyncOptions};
//!
//! let ep = LocalEndpoint::new(false);
//! let outcome = sync_endpoints(&ep, "./a/", &ep, "./b", &ep, Direction::Push, &SyncOptions::default()).await?;
//! ```

pub mod config;
pub mod diff;
pub mod endpoint;
pub mod error;
pub mod exclusion;
pub mod executor;
pub mod logging;
pub mod plan;
pub mod render;
pub mod sequence;
pub mod sync;
pub mod tree;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{AdbConfig, Config};
pub use diff::{diff, DiffEngine, SyncPolicy};
pub use error::{
	ConnectionError, EndpointError, ExclusionError, ExecutionError, SubtreeUnreadable, SyncError,
};
pub use exclusion::{Pattern, PatternMatcher, PatternSource};
pub use executor::{ExecutionReport, Executor};
pub use plan::{build_plan, Operation, OperationKind, PlanSummary, SyncPlan};
pub use sequence::sequence;
pub use tree::{build_tree, Node, Tree, TreeRole};
pub use types::{Direction, EntryKind, EntryStat, RelPath};

// vim: ts=4
