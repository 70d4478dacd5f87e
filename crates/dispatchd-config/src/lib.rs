//! Shared configuration for the dispatch server.
//!
//! [`Config`] is assembled by `ortho_config` from command-line flags,
//! `DISPATCHD_*` environment variables, and configuration files, with the
//! defaults in [`defaults`] filling any gaps. The resolved value is immutable
//! once the server starts.

mod defaults;
mod logging;
mod protocol;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_LOG_PATH, DEFAULT_PORT, FOREGROUND_ENV_VAR,
    default_host, default_log_filter_string, default_log_format,
    default_log_path,
};
pub use logging::LogFormat;
pub use protocol::ReadPolicy;

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DISPATCHD")]
pub struct Config {
    /// Interface the listener binds to. Loopback unless overridden.
    #[ortho_config(default = defaults::default_host())]
    pub host: String,
    /// TCP port the listener binds to.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Serve from the launching process instead of forking a background child.
    #[ortho_config(default = false)]
    pub foreground: bool,
    /// Mirror captured diagnostic output to the real stderr stream.
    #[ortho_config(default = false)]
    pub debug: bool,
    /// File overwritten with each request's captured output.
    #[ortho_config(default = defaults::default_log_path())]
    pub log_path: Utf8PathBuf,
    /// `tracing` filter expression applied to server telemetry.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for server telemetry.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// How the connection loop treats connections that omit request lines.
    #[ortho_config(default = ReadPolicy::Fresh)]
    pub read_policy: ReadPolicy,
    /// Optional per-connection read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            foreground: false,
            debug: false,
            log_path: default_log_path(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            read_policy: ReadPolicy::Fresh,
            read_timeout_ms: None,
        }
    }
}

impl Config {
    /// Host and port pair suitable for address resolution.
    #[must_use]
    pub fn listen_address(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }

    /// Path receiving the captured output of each request.
    #[must_use]
    pub fn log_path(&self) -> &Utf8Path {
        self.log_path.as_path()
    }

    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Policy applied when a connection does not supply both request lines.
    #[must_use]
    pub const fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    /// Read timeout applied to accepted connections, if any.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
    }
}
