//! Structured telemetry initialisation for the server.
//!
//! Server logs are written into the [`CaptureSink`] rather than a terminal,
//! so they land in the per-request log file alongside handler output. Panic
//! messages are routed the same way instead of going to the real stderr.

use std::panic::{self, PanicHookInfo};
use std::sync::Once;

use once_cell::sync::OnceCell;
use tracing::{Subscriber, error, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use dispatchd_config::{Config, LogFormat};

use crate::capture::CaptureSink;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

const PANIC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::panic");

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: only the first invocation installs a
/// subscriber, writing into that call's `sink`. Later calls succeed without
/// touching global state.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another global
/// subscriber is already installed.
pub fn initialise(config: &Config, sink: &CaptureSink) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config, sink.clone()))
        .copied()
}

fn install_subscriber(config: &Config, sink: CaptureSink) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |filter: EnvFilter, writer: CaptureSink| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(writer)
            // The log file is read by tooling, never a terminal.
            .with_ansi(false)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter, sink).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter, sink).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    install_panic_hook();
    Ok(())
}

/// Replaces the default panic hook with one that logs through `tracing`.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| panic::set_hook(Box::new(log_panic)));
}

fn log_panic(info: &PanicHookInfo<'_>) {
    error!(target: PANIC_TARGET, panic = %info, "panic");
}
