//! Logging prelude module for convenient access to tracing macros.
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("This is an info message");
//! warn!("This is a warning");
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Map `-v`/`-q` counts to a filter directive
///
/// `verbose` wins when both are given; the CLI makes them mutually exclusive anyway.
pub fn level_for(verbose: u8, quiet: u8) -> &'static str {
	match (verbose, quiet) {
		(0, 0) => "info",
		(1, _) => "debug",
		(v, _) if v >= 2 => "trace",
		(_, 1) => "warn",
		(_, 2) => "error",
		_ => "off",
	}
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the level derived from the CLI flags:
///
/// ```bash
/// RUST_LOG=adbsync::endpoint=trace adbsync push ./photos /sdcard/DCIM
/// ```
pub fn init_tracing(verbose: u8, quiet: u8) {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level_for(verbose, quiet))),
		)
		.with_target(false)
		.with_writer(std::io::stderr)
		.try_init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_level_for() {
		assert_eq!(level_for(0, 0), "info");
		assert_eq!(level_for(1, 0), "debug");
		assert_eq!(level_for(3, 0), "trace");
		assert_eq!(level_for(0, 1), "warn");
		assert_eq!(level_for(0, 2), "error");
		assert_eq!(level_for(0, 4), "off");
	}
}

// vim: ts=4
