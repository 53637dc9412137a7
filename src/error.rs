//! Error types for adbsync operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::plan::Operation;
use crate::types::RelPath;

/// Main error type for a sync invocation
#[derive(Debug)]
pub enum SyncError {
	/// The root of an endpoint could not be read; nothing was planned
	EndpointUnreachable { endpoint: String, path: String, source: EndpointError },

	/// Exclusion patterns could not be compiled
	Exclusion(ExclusionError),

	/// Invalid configuration
	InvalidConfig { message: String },

	/// The plan replaces files with directories (or the reverse) and --force was not given
	KindConflictRefused { paths: Vec<RelPath> },

	/// Connection error (nested)
	Connection(ConnectionError),

	/// I/O error
	Io(io::Error),
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::EndpointUnreachable { endpoint, path, source } => {
				write!(f, "Cannot read {} root {}: {}", endpoint, path, source)
			}
			SyncError::Exclusion(e) => write!(f, "{}", e),
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::KindConflictRefused { paths } => {
				let listed: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
				write!(
					f,
					"Refusing to replace files with directories or directories with files ({}); use --force if you are sure",
					listed.join(", ")
				)
			}
			SyncError::Connection(e) => write!(f, "Connection error: {}", e),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::EndpointUnreachable { source, .. } => Some(source),
			SyncError::Exclusion(e) => Some(e),
			SyncError::Connection(e) => Some(e),
			SyncError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<ExclusionError> for SyncError {
	fn from(e: ExclusionError) -> Self {
		SyncError::Exclusion(e)
	}
}

impl From<ConnectionError> for SyncError {
	fn from(e: ConnectionError) -> Self {
		SyncError::Connection(e)
	}
}

/// Errors while compiling exclusion patterns
#[derive(Debug)]
pub enum ExclusionError {
	/// A pattern file named by --exclude-from could not be read
	PatternFile { path: PathBuf, source: io::Error },

	/// Failed to parse a glob pattern
	InvalidPattern(String),
}

impl fmt::Display for ExclusionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExclusionError::PatternFile { path, source } => {
				write!(f, "Cannot read pattern file {}: {}", path.display(), source)
			}
			ExclusionError::InvalidPattern(msg) => {
				write!(f, "Invalid exclusion pattern: {}", msg)
			}
		}
	}
}

impl Error for ExclusionError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ExclusionError::PatternFile { source, .. } => Some(source),
			ExclusionError::InvalidPattern(_) => None,
		}
	}
}

/// Errors reported by an endpoint adapter
#[derive(Debug)]
pub enum EndpointError {
	/// Path does not exist
	NotFound { path: String },

	/// A path component is not a directory
	NotADirectory { path: String },

	/// Permission denied on a path
	PermissionDenied { path: String },

	/// Local I/O error
	Io { path: String, source: io::Error },

	/// Device output that the adapter does not understand
	Unexpected { line: String },

	/// adb push / adb pull failed
	TransferFailed { message: String },

	/// The device bridge itself failed
	Connection(ConnectionError),
}

impl EndpointError {
	/// Classify a local I/O error for `path`
	pub fn from_io(path: &str, e: io::Error) -> Self {
		match e.kind() {
			io::ErrorKind::NotFound => EndpointError::NotFound { path: path.to_string() },
			io::ErrorKind::PermissionDenied => {
				EndpointError::PermissionDenied { path: path.to_string() }
			}
			_ => EndpointError::Io { path: path.to_string(), source: e },
		}
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, EndpointError::NotFound { .. })
	}
}

impl fmt::Display for EndpointError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EndpointError::NotFound { path } => write!(f, "No such file or directory: {}", path),
			EndpointError::NotADirectory { path } => write!(f, "Not a directory: {}", path),
			EndpointError::PermissionDenied { path } => write!(f, "Permission denied: {}", path),
			EndpointError::Io { path, source } => write!(f, "{}: {}", path, source),
			EndpointError::Unexpected { line } => write!(f, "Unexpected adb output: {}", line),
			EndpointError::TransferFailed { message } => write!(f, "Transfer failed: {}", message),
			EndpointError::Connection(e) => write!(f, "{}", e),
		}
	}
}

impl Error for EndpointError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			EndpointError::Io { source, .. } => Some(source),
			EndpointError::Connection(e) => Some(e),
			_ => None,
		}
	}
}

impl From<ConnectionError> for EndpointError {
	fn from(e: ConnectionError) -> Self {
		EndpointError::Connection(e)
	}
}

/// Errors of the adb shell session
#[derive(Debug)]
pub enum ConnectionError {
	/// Subprocess spawn failed
	SpawnFailed { cmd: String, source: io::Error },

	/// adb reports no device or emulator
	NoDevice,

	/// Stdio unavailable
	StdioUnavailable { what: String },

	/// The shell exited unexpectedly
	Disconnected,

	/// Unexpected output while testing the connection
	ProtocolError { message: String },
}

impl fmt::Display for ConnectionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConnectionError::SpawnFailed { cmd, source } => {
				write!(f, "Failed to spawn '{}': {}", cmd, source)
			}
			ConnectionError::NoDevice => write!(f, "No devices/emulators found"),
			ConnectionError::StdioUnavailable { what } => {
				write!(f, "Stdio unavailable: {}", what)
			}
			ConnectionError::Disconnected => write!(f, "adb shell disconnected"),
			ConnectionError::ProtocolError { message } => {
				write!(f, "Protocol error: {}", message)
			}
		}
	}
}

impl Error for ConnectionError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ConnectionError::SpawnFailed { source, .. } => Some(source),
			_ => None,
		}
	}
}

/// A subtree that could not be enumerated; recorded as a warning, never fatal
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeUnreadable {
	/// "source" or "destination"
	pub endpoint: String,
	pub path: RelPath,
	pub reason: String,
}

impl fmt::Display for SubtreeUnreadable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Skipping unreadable {} directory {}: {}", self.endpoint, self.path, self.reason)
	}
}

/// Which half of a delete-then-create pair last succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStep {
	/// Nothing changed, the old entry is still in place
	NothingApplied,
	/// The old entry was removed but the new one was not created
	Deleted,
}

impl fmt::Display for ConflictStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConflictStep::NothingApplied => write!(f, "old entry left in place"),
			ConflictStep::Deleted => write!(f, "old entry removed, new entry missing"),
		}
	}
}

/// Failure of a single planned operation during execution
#[derive(Debug)]
pub enum ExecutionError {
	/// The operation itself failed
	Transfer { operation: Operation, source: EndpointError },

	/// Not attempted because an operation it depends on failed
	Skipped { operation: Operation, blocked_by: RelPath },

	/// One half of a kind-conflict replacement failed
	KindConflictResolution { path: RelPath, completed: ConflictStep, source: EndpointError },
}

impl ExecutionError {
	pub fn path(&self) -> &RelPath {
		match self {
			ExecutionError::Transfer { operation, .. } => &operation.path,
			ExecutionError::Skipped { operation, .. } => &operation.path,
			ExecutionError::KindConflictResolution { path, .. } => path,
		}
	}
}

impl fmt::Display for ExecutionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExecutionError::Transfer { operation, source } => {
				write!(f, "{} {} failed: {}", operation.kind, operation.path, source)
			}
			ExecutionError::Skipped { operation, blocked_by } => {
				write!(f, "{} {} skipped: {} failed", operation.kind, operation.path, blocked_by)
			}
			ExecutionError::KindConflictResolution { path, completed, source } => {
				write!(f, "Replacing {} failed ({}): {}", path, completed, source)
			}
		}
	}
}

impl Error for ExecutionError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ExecutionError::Transfer { source, .. } => Some(source),
			ExecutionError::KindConflictResolution { source, .. } => Some(source),
			ExecutionError::Skipped { .. } => None,
		}
	}
}


// vim: ts=4
