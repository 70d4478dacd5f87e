//! Background launch by forking the bootstrapped process.

use std::thread;

use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, fork};
use thiserror::Error;
use tracing::{debug, info};

use super::PROCESS_TARGET;

/// Which side of the fork the caller is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detached {
    /// The launching process; the server runs in `child`.
    Parent {
        /// Process id of the serving child.
        child: u32,
    },
    /// The detached child, which goes on to serve.
    Child,
}

/// Abstraction over daemonisation strategies.
pub trait Daemonizer: Send + Sync {
    /// Detaches the server into a background process.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonizeError`] when the background process cannot be
    /// created.
    fn daemonize(&self) -> Result<Detached, DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// `fork(2)` failed.
    #[error("fork failed: {source}")]
    Fork {
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Daemoniser that forks the current process.
///
/// The child inherits everything loaded during bootstrap, including the
/// bound listener. The parent never blocks on the child: a detached thread
/// reaps it so it does not linger as a zombie while the parent is alive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForkDaemonizer;

impl ForkDaemonizer {
    /// Builds a new fork daemoniser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Daemonizer for ForkDaemonizer {
    fn daemonize(&self) -> Result<Detached, DaemonizeError> {
        // SAFETY: called from the launching thread before the listener or any
        // other thread is started, so the child starts with consistent state.
        let forked = unsafe { fork() }.map_err(|source| DaemonizeError::Fork { source })?;
        match forked {
            ForkResult::Parent { child } => {
                reap_in_background(child);
                Ok(Detached::Parent {
                    child: child.as_raw().unsigned_abs(),
                })
            }
            ForkResult::Child => {
                info!(
                    target: PROCESS_TARGET,
                    pid = std::process::id(),
                    "server process detached; continuing in child"
                );
                Ok(Detached::Child)
            }
        }
    }
}

fn reap_in_background(child: Pid) {
    let spawned = thread::Builder::new()
        .name("dispatchd-reaper".to_owned())
        .spawn(move || match waitpid(child, None) {
            Ok(status) => debug!(target: PROCESS_TARGET, ?status, "background server exited"),
            Err(error) => {
                debug!(target: PROCESS_TARGET, %error, "failed to reap background server");
            }
        });
    if let Err(error) = spawned {
        debug!(target: PROCESS_TARGET, %error, "failed to spawn reaper thread");
    }
}
