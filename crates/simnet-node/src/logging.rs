//! Tracing subscriber configuration for simnet hosts.
//!
//! Log levels follow these conventions:
//! - ERROR: Unrecoverable failures, bad configuration
//! - WARN: Datagrams dropped because of malformed input
//! - INFO: Host lifecycle and scenario progress
//! - DEBUG: Routing decisions, queueing, reassembly state
//! - TRACE: Per-hook verdicts and fragment boundaries

use tracing_subscriber::EnvFilter;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the tracing subscriber with plain text output.
///
/// `RUST_LOG` overrides `default_level` when set.
pub fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .init();
}

/// Initialize the tracing subscriber with JSON output.
///
/// Activated by setting `RUST_LOG_FORMAT=json`.
pub fn init_json(default_level: &str) {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_level))
        .init();
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}
