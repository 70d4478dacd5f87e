//! Signal-driven shutdown notification.

use std::fmt;
use std::io;
use std::sync::{Mutex, PoisonError};

use nix::errno::Errno;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use once_cell::sync::OnceCell;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{debug, info};

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Registers interest in shutdown notifications. Called once, after
    /// bootstrap and before any fork.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when registration fails.
    fn install(&self) -> Result<(), ShutdownError> {
        Ok(())
    }

    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the notification source fails.
    fn wait(&self) -> Result<(), ShutdownError>;

    /// Drops the registration made by [`ShutdownSignal::install`] so the
    /// calling process reacts to signals as it did before. Called on the
    /// launching side of a fork, which never waits.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the previous disposition cannot be
    /// restored.
    fn release(&self) -> Result<(), ShutdownError> {
        Ok(())
    }
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Restoring the default disposition of a signal failed.
    #[error("failed to restore default handling of {signal}: {source}")]
    Release {
        /// Signal whose disposition could not be restored.
        signal: Signal,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

const SHUTDOWN_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

/// Shutdown listener that waits for `SIGINT` or `SIGTERM`.
///
/// Handlers registered by [`ShutdownSignal::install`] survive a fork, so a
/// background child observes signals sent to it directly.
#[derive(Default)]
pub struct SystemShutdownSignal {
    signals: OnceCell<Mutex<Signals>>,
}

impl SystemShutdownSignal {
    /// Builds a listener; handlers are registered on first use.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            signals: OnceCell::new(),
        }
    }

    fn signals(&self) -> Result<&Mutex<Signals>, ShutdownError> {
        self.signals.get_or_try_init(|| {
            Signals::new([SIGINT, SIGTERM])
                .map(Mutex::new)
                .map_err(|source| ShutdownError::Install { source })
        })
    }
}

impl fmt::Debug for SystemShutdownSignal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SystemShutdownSignal")
            .field("installed", &self.signals.get().is_some())
            .finish()
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn install(&self) -> Result<(), ShutdownError> {
        self.signals().map(|_| ())
    }

    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = self.signals()?.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(signal) = signals.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal,
                "shutdown signal received"
            );
        }
        Ok(())
    }

    fn release(&self) -> Result<(), ShutdownError> {
        let Some(signals) = self.signals.get() else {
            return Ok(());
        };
        signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle()
            .close();
        let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        for signal in SHUTDOWN_SIGNALS {
            // SAFETY: installing the default disposition runs no user code in
            // signal context.
            unsafe { sigaction(signal, &default) }
                .map_err(|source| ShutdownError::Release { signal, source })?;
        }
        debug!(target: PROCESS_TARGET, "shutdown signal handlers released");
        Ok(())
    }
}
