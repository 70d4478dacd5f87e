//! Process lifecycle: one-time bootstrap, optional fork into the background,
//! and signal-driven shutdown.

use std::time::Duration;

pub(crate) mod daemonizer;
mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use daemonizer::{DaemonizeError, Daemonizer, Detached, ForkDaemonizer};
pub use errors::LaunchError;
pub use launch::{Launch, LaunchMode, run_server};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
/// Pause between the shutdown notice and process exit.
pub(crate) const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);
