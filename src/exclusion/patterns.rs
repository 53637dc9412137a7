//! Pattern-based exclusion using glob patterns

use crate::error::ExclusionError;
use crate::types::RelPath;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::PathBuf;

/// Where a pattern came from (informational only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
	/// --exclude on the command line or the config file
	Flag,

	/// A line of an --exclude-from file
	File(PathBuf),
}

/// One exclusion rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
	/// Normalized glob, relative to the source root
	pub glob: String,

	pub source: PatternSource,
}

impl Pattern {
	pub fn new(glob: &str, source: PatternSource) -> Self {
		Self { glob: Self::normalize(glob), source }
	}

	/// Patterns are root-relative: drop a leading `/` or `./` and a trailing `/`
	fn normalize(glob: &str) -> String {
		let mut g = glob.trim();
		loop {
			if let Some(rest) = g.strip_prefix("./") {
				g = rest;
			} else if let Some(rest) = g.strip_prefix('/') {
				g = rest;
			} else {
				break;
			}
		}
		g.trim_end_matches('/').to_string()
	}
}

/// Pattern matcher using globset for efficient matching
///
/// `*` and `?` also match the `/` separator, so `*.tmp` excludes
/// `a/b/x.tmp`. Built once per invocation and handed to the diff engine.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
	patterns: Vec<Pattern>,
	set: GlobSet,
	case_insensitive: bool,
}

impl PatternMatcher {
	/// Compile literal patterns plus the contents of pattern files
	pub fn compile(
		explicit: &[String],
		pattern_files: &[PathBuf],
		case_insensitive: bool,
	) -> Result<Self, ExclusionError> {
		let mut patterns: Vec<Pattern> =
			explicit.iter().map(|p| Pattern::new(p, PatternSource::Flag)).collect();

		for file in pattern_files {
			for line in super::PatternFileParser::parse_file(file)? {
				patterns.push(Pattern::new(&line, PatternSource::File(file.clone())));
			}
		}

		Self::from_patterns(patterns, case_insensitive)
	}

	pub fn from_patterns(
		patterns: Vec<Pattern>,
		case_insensitive: bool,
	) -> Result<Self, ExclusionError> {
		let mut builder = GlobSetBuilder::new();

		for pattern in &patterns {
			if pattern.glob.is_empty() {
				return Err(ExclusionError::InvalidPattern("empty pattern".to_string()));
			}
			let glob = GlobBuilder::new(&pattern.glob)
				.literal_separator(false)
				.case_insensitive(case_insensitive)
				.backslash_escape(true)
				.build()
				.map_err(|e| ExclusionError::InvalidPattern(format!("{}: {}", pattern.glob, e)))?;
			builder.add(glob);
		}

		let set = builder.build().map_err(|e| {
			ExclusionError::InvalidPattern(format!("Failed to build pattern set: {}", e))
		})?;

		Ok(Self { patterns, set, case_insensitive })
	}

	/// Matcher that excludes nothing
	pub fn empty() -> Self {
		Self { patterns: Vec::new(), set: GlobSet::empty(), case_insensitive: false }
	}

	pub fn patterns(&self) -> &[Pattern] {
		&self.patterns
	}

	pub fn is_empty(&self) -> bool {
		self.patterns.is_empty()
	}

	pub fn is_case_insensitive(&self) -> bool {
		self.case_insensitive
	}

	/// Does the path itself match a pattern? The root never matches.
	pub fn matches(&self, path: &RelPath) -> bool {
		!path.is_root() && self.set.is_match(path.to_slash_string())
	}

	/// First pattern matching the path itself
	pub fn matching_pattern(&self, path: &RelPath) -> Option<&Pattern> {
		if path.is_root() {
			return None;
		}
		self.set.matches(path.to_slash_string()).into_iter().min().map(|i| &self.patterns[i])
	}

	/// Is the path excluded, directly or through an excluded ancestor?
	pub fn is_excluded(&self, path: &RelPath) -> bool {
		self.matches(path) || path.ancestors().any(|a| self.matches(&a))
	}
}

impl Default for PatternMatcher {
	fn default() -> Self {
		Self::empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rp(s: &str) -> RelPath {
		RelPath::parse(s).unwrap()
	}

	fn matcher(patterns: &[&str]) -> PatternMatcher {
		let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
		PatternMatcher::compile(&patterns, &[], false).unwrap()
	}

	#[test]
	fn test_star_crosses_separators() {
		let m = matcher(&["*.tmp"]);

		assert!(m.matches(&rp("x.tmp")));
		assert!(m.matches(&rp("a/b/x.tmp")));
		assert!(!m.matches(&rp("a/x.txt")));
	}

	#[test]
	fn test_question_mark_single_char() {
		let m = matcher(&["log?.txt"]);

		assert!(m.matches(&rp("log1.txt")));
		assert!(!m.matches(&rp("log12.txt")));
	}

	#[test]
	fn test_full_path_anchoring() {
		let m = matcher(&["Android/data"]);

		assert!(m.matches(&rp("Android/data")));
		assert!(!m.matches(&rp("backup/Android/data")));
		assert!(!m.matches(&rp("Android/data/com.app")));
	}

	#[test]
	fn test_exclusion_inherited_from_ancestor() {
		let m = matcher(&["cache"]);

		assert!(m.is_excluded(&rp("cache")));
		assert!(m.is_excluded(&rp("cache/a/b.bin")));
		assert!(!m.matches(&rp("cache/a/b.bin")));
		assert!(!m.is_excluded(&rp("cached")));
	}

	#[test]
	fn test_root_never_excluded() {
		let m = matcher(&["*"]);

		assert!(!m.matches(&RelPath::root()));
		assert!(!m.is_excluded(&RelPath::root()));
		assert!(m.is_excluded(&rp("anything")));
	}

	#[test]
	fn test_leading_and_trailing_slashes_normalized() {
		let m = matcher(&["/DCIM/.thumbnails/", "./Music"]);

		assert!(m.matches(&rp("DCIM/.thumbnails")));
		assert!(m.matches(&rp("Music")));
	}

	#[test]
	fn test_case_sensitivity_option() {
		let sensitive = matcher(&["*.JPG"]);
		assert!(!sensitive.matches(&rp("a.jpg")));

		let insensitive =
			PatternMatcher::compile(&["*.JPG".to_string()], &[], true).unwrap();
		assert!(insensitive.matches(&rp("a.jpg")));
		assert!(insensitive.is_case_insensitive());
	}

	#[test]
	fn test_invalid_pattern() {
		let result = PatternMatcher::compile(&["a[".to_string()], &[], false);
		assert!(matches!(result, Err(ExclusionError::InvalidPattern(_))));

		let result = PatternMatcher::compile(&["/".to_string()], &[], false);
		assert!(matches!(result, Err(ExclusionError::InvalidPattern(_))));
	}

	#[test]
	fn test_matching_pattern_reports_first() {
		let m = matcher(&["*.tmp", "a/*"]);
		let p = m.matching_pattern(&rp("a/x.tmp")).unwrap();
		assert_eq!(p.glob, "*.tmp");
		assert_eq!(p.source, PatternSource::Flag);
		assert!(m.matching_pattern(&rp("b/y.txt")).is_none());
	}

	#[test]
	fn test_empty_matcher() {
		let m = PatternMatcher::empty();
		assert!(m.is_empty());
		assert!(!m.is_excluded(&rp("a/b")));
	}
}

// vim: ts=4
