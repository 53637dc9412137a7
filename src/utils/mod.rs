//! Utility modules for common functionality

pub mod signal;

pub use signal::{request_shutdown, setup_signal_handlers, shutdown_requested};

// vim: ts=4
