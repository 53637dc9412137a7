//! Signal handlers for graceful termination
//!
//! The first SIGINT/SIGTERM only raises a flag that the executor checks
//! between operations, so a transfer in flight is never cut in half. A
//! second signal exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::logging::*;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// True once a termination signal was received
pub fn shutdown_requested() -> bool {
	SHUTDOWN.load(Ordering::SeqCst)
}

/// Raise the shutdown flag; returns whether it was already raised
pub fn request_shutdown() -> bool {
	SHUTDOWN.swap(true, Ordering::SeqCst)
}

/// Setup signal handlers for graceful cleanup on termination
pub fn setup_signal_handlers() {
	tokio::spawn(async {
		loop {
			let code = match wait_for_signal().await {
				Some(code) => code,
				None => return,
			};
			if request_shutdown() {
				debug!("Second signal, exiting");
				std::process::exit(code);
			}
			warn!("Interrupted, stopping after the current operation (repeat to abort)");
		}
	});
}

/// Wait for SIGINT or SIGTERM; returns the conventional exit code
#[cfg(unix)]
async fn wait_for_signal() -> Option<i32> {
	use tokio::signal::unix::{signal, SignalKind};

	let mut sigterm = match signal(SignalKind::terminate()) {
		Ok(stream) => stream,
		Err(e) => {
			warn!("Failed to setup SIGTERM handler: {}. Process will not handle SIGTERM gracefully.", e);
			return None;
		}
	};

	let mut sigint = match signal(SignalKind::interrupt()) {
		Ok(stream) => stream,
		Err(e) => {
			warn!("Failed to setup SIGINT handler: {}. Process will not handle SIGINT gracefully.", e);
			return None;
		}
	};

	tokio::select! {
		_ = sigterm.recv() => {
			debug!("Received SIGTERM");
			Some(143) // 128 + SIGTERM(15)
		}
		_ = sigint.recv() => {
			debug!("Received SIGINT");
			Some(130) // 128 + SIGINT(2)
		}
	}
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Option<i32> {
	match tokio::signal::ctrl_c().await {
		Ok(()) => Some(130),
		Err(e) => {
			warn!("Failed to setup Ctrl-C handler: {}", e);
			None
		}
	}
}

// vim: ts=4
