//! Supervises server launch sequencing and runtime orchestration.

use std::env;
use std::sync::Arc;
use std::thread;

use tracing::info;

use dispatchd_config::{Config, FOREGROUND_ENV_VAR};

use crate::application::Application;
use crate::bootstrap::{ConfigLoader, Server, SystemConfigLoader, bootstrap_with};
use crate::dispatch::{Dispatcher, RequestCycle};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::SocketListener;

use super::daemonizer::{Daemonizer, Detached, ForkDaemonizer};
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{PROCESS_TARGET, SHUTDOWN_GRACE};

/// Launch mode for the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background; the launching process returns immediately.
    Background,
    /// Serve from the launching process.
    Foreground,
}

impl LaunchMode {
    /// Foreground when the configuration asks for it or the bare
    /// `FOREGROUND` variable is present; background otherwise.
    #[must_use]
    pub fn detect(config: &Config) -> Self {
        Self::select(config.foreground, env::var_os(FOREGROUND_ENV_VAR).is_some())
    }

    /// Picks the mode from the parsed `foreground` setting and whether the
    /// bare override variable is set.
    #[must_use]
    pub const fn select(foreground: bool, override_present: bool) -> Self {
        if foreground || override_present {
            Self::Foreground
        } else {
            Self::Background
        }
    }
}

/// How a launch ended, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// The server was detached into a background process.
    Detached {
        /// Process id of the serving child.
        child: u32,
    },
    /// The server ran in this process and stopped after a shutdown signal.
    Stopped,
}

/// Process-level collaborators needed to control the server lifecycle.
pub(crate) struct ProcessControl<D, S> {
    /// Forced launch mode; detected from configuration when `None`.
    pub(crate) mode: Option<LaunchMode>,
    pub(crate) daemonizer: D,
    pub(crate) shutdown: S,
}

/// Service dependencies required to construct the server runtime.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) application: Arc<dyn Application>,
}

/// Collaborators required to launch the server runtime.
pub(crate) struct LaunchPlan<L, D, S> {
    pub(crate) process: ProcessControl<D, S>,
    pub(crate) services: ServiceDeps<L>,
}

/// Runs `application` behind the dispatch server using the production
/// collaborators.
///
/// In background mode this returns [`Launch::Detached`] in the launching
/// process as soon as the child is forked. In the serving process it returns
/// [`Launch::Stopped`] once `SIGINT` or `SIGTERM` arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, binding the port, forking or
/// signal registration fails.
pub fn run_server(application: Arc<dyn Application>) -> Result<Launch, LaunchError> {
    let plan = LaunchPlan {
        process: ProcessControl {
            mode: None,
            daemonizer: ForkDaemonizer::new(),
            shutdown: SystemShutdownSignal::new(),
        },
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            application,
        },
    };
    run_server_with(plan)
}

/// Runs the server with injected collaborators.
pub(crate) fn run_server_with<L, D, S>(plan: LaunchPlan<L, D, S>) -> Result<Launch, LaunchError>
where
    L: ConfigLoader,
    D: Daemonizer,
    S: ShutdownSignal,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl {
        mode: forced_mode,
        daemonizer,
        shutdown,
    } = process;
    let ServiceDeps {
        loader,
        reporter,
        application,
    } = services;

    let server = bootstrap_with(&loader, reporter, application)?;
    shutdown.install()?;

    let config = server.config();
    let (host, port) = config.listen_address();
    let listener = SocketListener::bind(host, port)?.with_read_timeout(config.read_timeout());
    let mode = forced_mode.unwrap_or_else(|| LaunchMode::detect(config));
    info!(
        target: PROCESS_TARGET,
        ?mode,
        address = %listener.local_addr(),
        "starting server runtime"
    );

    let side = match mode {
        LaunchMode::Background => daemonizer.daemonize()?,
        LaunchMode::Foreground => Detached::Child,
    };
    if let Detached::Parent { child } = side {
        shutdown.release()?;
        info!(target: PROCESS_TARGET, child, "server running in background");
        return Ok(Launch::Detached { child });
    }

    serve(&server, listener, &shutdown)
}

fn serve<S>(server: &Server, listener: SocketListener, shutdown: &S) -> Result<Launch, LaunchError>
where
    S: ShutdownSignal,
{
    let config = server.config();
    let address = listener.local_addr();
    let dispatcher = Dispatcher::new(server.application(), server.reporter());
    let cycle = RequestCycle::new(
        Arc::new(dispatcher),
        server.sink().clone(),
        config.log_path().to_owned(),
        config.read_policy(),
    );

    let listener_handle = listener.start(Arc::new(cycle))?;
    server.reporter().listener_ready(address);

    shutdown.wait()?;
    info!(target: PROCESS_TARGET, "shutting down server");
    thread::sleep(SHUTDOWN_GRACE);
    // An in-flight request is abandoned rather than awaited.
    listener_handle.shutdown();
    Ok(Launch::Stopped)
}
