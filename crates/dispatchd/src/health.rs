//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use dispatchd_config::Config;

use crate::bootstrap::BootstrapError;
use crate::dispatch::DispatchError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap, including application boot and eager load,
    /// completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener is bound and about to serve.
    fn listener_ready(&self, address: SocketAddr);

    /// Invoked when a request ends in a failure response.
    fn handler_failed(&self, handler: &str, error: &DispatchError);

    /// Invoked after a prewarm ping is answered, with the running total.
    fn prewarm_served(&self, total: u64);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, address: SocketAddr) {
        (**self).listener_ready(address);
    }

    fn handler_failed(&self, handler: &str, error: &DispatchError) {
        (**self).handler_failed(handler, error);
    }

    fn prewarm_served(&self, total: u64) {
        (**self).prewarm_served(total);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        let (host, port) = config.listen_address();
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            host,
            port,
            log_path = %config.log_path(),
            read_policy = %config.read_policy(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn listener_ready(&self, address: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            %address,
            "server started on {address}"
        );
    }

    fn handler_failed(&self, handler: &str, error: &DispatchError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "handler_failed",
            handler,
            error = %error,
            "request handler failed"
        );
    }

    fn prewarm_served(&self, total: u64) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "prewarm_served",
            total,
            "prewarm ping answered"
        );
    }
}
