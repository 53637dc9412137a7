//! Exclusion rules
//!
//! Compiles `--exclude` globs and `--exclude-from` files into a single
//! matcher over source-relative paths.

mod pattern_file;
mod patterns;

pub use crate::error::ExclusionError;
pub use pattern_file::PatternFileParser;
pub use patterns::{Pattern, PatternMatcher, PatternSource};


// vim: ts=4
