// system-tests/src/logging.rs
// ============================================================================
// Module: Test Logging
// Description: Tracing subscriber setup for verification runs.
// Purpose: Emit case phases and check failures as pretty or JSON lines.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! Installs a global subscriber once per test binary. `RUST_LOG` overrides
//! the default `info` filter. Output goes through the test writer so cargo's
//! capture keeps passing cases quiet.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogFormat;

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info";

/// Outcome of the first initialization.
static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Installs the global subscriber; later calls return the first outcome.
///
/// # Errors
///
/// Returns an error when another subscriber was already installed.
pub fn init_test_logging(format: LogFormat) -> Result<(), String> {
    INIT.get_or_init(|| install(format)).clone()
}

/// Builds and installs the subscriber.
fn install(format: LogFormat) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_test_writer())
            .try_init()
            .map_err(|err| format!("failed to initialize JSON tracing subscriber: {err}")),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_test_writer())
            .try_init()
            .map_err(|err| format!("failed to initialize pretty tracing subscriber: {err}")),
    }
}
