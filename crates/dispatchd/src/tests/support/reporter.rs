//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use dispatchd_config::Config;

use crate::bootstrap::BootstrapError;
use crate::dispatch::DispatchError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The listener is serving on the address.
    ListenerReady(SocketAddr),
    /// A request failed in the named handler.
    HandlerFailed { handler: String, message: String },
    /// A prewarm ping was answered; carries the running total.
    PrewarmServed(u64),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Address reported by the most recent `listener_ready` event.
    #[must_use]
    pub fn listener_address(&self) -> Option<SocketAddr> {
        self.events().into_iter().rev().find_map(|event| match event {
            HealthEvent::ListenerReady(address) => Some(address),
            _ => None,
        })
    }

    /// Running total reported by the most recent prewarm event.
    #[must_use]
    pub fn prewarm_total(&self) -> Option<u64> {
        self.events().into_iter().rev().find_map(|event| match event {
            HealthEvent::PrewarmServed(total) => Some(total),
            _ => None,
        })
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, address: SocketAddr) {
        self.record(HealthEvent::ListenerReady(address));
    }

    fn handler_failed(&self, handler: &str, error: &DispatchError) {
        self.record(HealthEvent::HandlerFailed {
            handler: handler.to_owned(),
            message: error.to_string(),
        });
    }

    fn prewarm_served(&self, total: u64) {
        self.record(HealthEvent::PrewarmServed(total));
    }
}
