//! Parsing of `ls -la` output from the device shell
//!
//! Handles both toybox (`drwxrwx--x 4 root sdcard_rw 4096 2024-03-01 12:34 DCIM`)
//! and the older toolbox layout without link counts and directory sizes.
//! Times are expected in UTC; the device adapter runs `ls` with `TZ=UTC`.

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::EndpointError;

/// File type column of an `ls -l` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsKind {
	File,
	Directory,
	Symlink,
	/// Block/char devices, fifos, sockets
	Special,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LsEntry {
	pub kind: LsKind,
	pub name: String,
	pub size: u64,
	pub modified: i64,
}

/// One classified output line
#[derive(Debug, Clone, PartialEq)]
pub enum LsLine {
	/// `total N` header
	Total,
	Entry(LsEntry),
}

fn entry_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(
			r"(?x)^
			(?P<type>[-bcdlps])[-rwxsStT]{9}\S*   # mode string, optional ACL marker
			\s+(?:\d+\s+)?                        # link count (toybox only)
			\S+\s+\S+\s+                          # user, group
			(?:(?P<size>\d+,\s*\d+|\d+)\s+)?      # size or device numbers
			(?P<date>\d{4}-\d{2}-\d{2}\ \d{2}:\d{2})(?::\d{2}(?:\.\d+)?)?
			\ (?P<name>.*)$",
		)
		.expect("ls entry regex is valid")
	})
}

fn total_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r"^total \d+$").expect("ls total regex is valid"))
}

/// Map a shell error line to an endpoint error, if it is one
pub fn error_line(line: &str) -> Option<EndpointError> {
	let path = line
		.splitn(3, ": ")
		.nth(1)
		.unwrap_or(line)
		.to_string();
	if line.ends_with("No such file or directory") {
		Some(EndpointError::NotFound { path })
	} else if line.ends_with("Not a directory") {
		Some(EndpointError::NotADirectory { path })
	} else if line.ends_with("Permission denied") {
		Some(EndpointError::PermissionDenied { path })
	} else {
		None
	}
}

/// Parse one line of `ls -la` output
pub fn parse_line(line: &str) -> Result<LsLine, EndpointError> {
	if total_regex().is_match(line) {
		return Ok(LsLine::Total);
	}
	let caps = match entry_regex().captures(line) {
		Some(caps) => caps,
		None => {
			return Err(error_line(line)
				.unwrap_or_else(|| EndpointError::Unexpected { line: line.to_string() }))
		}
	};

	let kind = match &caps["type"] {
		"-" => LsKind::File,
		"d" => LsKind::Directory,
		"l" => LsKind::Symlink,
		_ => LsKind::Special,
	};

	let size = match caps.name("size") {
		Some(m) if kind == LsKind::File => m
			.as_str()
			.parse()
			.map_err(|_| EndpointError::Unexpected { line: line.to_string() })?,
		None if kind == LsKind::File => {
			return Err(EndpointError::Unexpected { line: line.to_string() })
		}
		_ => 0,
	};

	let modified = NaiveDateTime::parse_from_str(&caps["date"], "%Y-%m-%d %H:%M")
		.map_err(|_| EndpointError::Unexpected { line: line.to_string() })?
		.and_utc()
		.timestamp();

	let mut name = caps["name"].to_string();
	if kind == LsKind::Symlink {
		// "name -> target"; ambiguous if the name itself contains " -> "
		if let Some(pos) = name.find(" -> ") {
			name.truncate(pos);
		}
	}

	Ok(LsLine::Entry(LsEntry { kind, name, size, modified }))
}


// vim: ts=4
