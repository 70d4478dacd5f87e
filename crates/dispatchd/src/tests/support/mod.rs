//! Test harness utilities for the server behavioural suites.

mod application;
mod config_loader;
mod reporter;
mod server;

pub use application::TestApplication;
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use server::{
    POLL_INTERVAL, ServerHarness, StepResult, TestShutdownSignal, WAIT_TIMEOUT, exchange,
};
