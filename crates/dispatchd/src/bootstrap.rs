//! Server bootstrap orchestration.
//!
//! Everything that must happen exactly once, before the listener serves and
//! before any fork, lives here: configuration loading, installing the
//! capture sink and telemetry, then the application's boot and eager load.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use dispatchd_config::Config;

use crate::application::{Application, ApplicationError};
use crate::capture::CaptureSink;
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no valid configuration can be built.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The application's one-time boot failed.
    #[error("application boot failed: {source}")]
    Boot {
        /// Error reported by the application.
        #[source]
        source: ApplicationError,
    },
    /// The application's eager load failed.
    #[error("application eager load failed: {source}")]
    EagerLoad {
        /// Error reported by the application.
        #[source]
        source: ApplicationError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Server {
    config: Config,
    application: Arc<dyn Application>,
    sink: CaptureSink,
    reporter: Arc<dyn HealthReporter>,
}

impl Server {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The booted application.
    #[must_use]
    pub fn application(&self) -> Arc<dyn Application> {
        Arc::clone(&self.application)
    }

    /// Sink capturing diagnostic output for the current request cycle.
    #[must_use]
    pub const fn sink(&self) -> &CaptureSink {
        &self.sink
    }

    /// Reporter receiving lifecycle events.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }
}

/// Bootstraps the server using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or either
/// application initialisation step fails. The failure is reported to
/// `reporter` before returning.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    application: Arc<dyn Application>,
) -> Result<Server, BootstrapError> {
    reporter.bootstrap_starting();
    match initialise(loader, &*application) {
        Ok((config, sink)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Server {
                config,
                application,
                sink,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn initialise(
    loader: &dyn ConfigLoader,
    application: &dyn Application,
) -> Result<(Config, CaptureSink), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;

    let sink = CaptureSink::new(config.debug);
    sink.install();

    telemetry::initialise(&config, &sink)
        .map_err(|source| BootstrapError::Telemetry { source })?;

    application
        .boot()
        .map_err(|source| BootstrapError::Boot { source })?;
    application
        .eager_load()
        .map_err(|source| BootstrapError::EagerLoad { source })?;

    Ok((config, sink))
}
