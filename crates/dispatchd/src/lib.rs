//! Local request-dispatch server.
//!
//! `dispatchd` sits between an external process invoker and an application's
//! request handlers. It binds a local TCP port and serves one connection at
//! a time: the client writes an event line and a handler line, the server
//! invokes the matching [`RequestHandler`] and answers with a single response
//! line before closing the connection.
//!
//! Everything written while serving a request, including the server's own
//! structured logs, is collected by a [`CaptureSink`] and written atomically
//! to the configured log path after every request, so the log file always
//! holds exactly one request's output.
//!
//! The one-time application bootstrap ([`Application::boot`] and
//! [`Application::eager_load`]) runs before the server forks into the
//! background, letting the serving child inherit the loaded state. Events
//! carrying the `_prewarm` key are answered without invoking any handler.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dispatchd::{HandlerError, HandlerRegistry, run_server};
//! use serde_json::{Value, json};
//!
//! fn hello(_event: &Value, _context: &Value, _output: &mut dyn std::io::Write)
//!     -> Result<Value, HandlerError> {
//!     Ok(json!({"hello": "world"}))
//! }
//!
//! let application = HandlerRegistry::new().with_handler("hello", hello);
//! let launch = run_server(Arc::new(application));
//! ```

mod application;
mod bootstrap;
mod capture;
pub mod dispatch;
mod health;
mod process;
mod telemetry;
mod transport;

pub use application::{
    Application, ApplicationError, HandlerError, HandlerRegistry, RequestHandler,
};
pub use bootstrap::{
    BootstrapError, ConfigLoader, Server, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use capture::{CaptureSink, CaptureWriter};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    DaemonizeError, Daemonizer, Detached, ForkDaemonizer, Launch, LaunchError, LaunchMode,
    ShutdownError, ShutdownSignal, SystemShutdownSignal, run_server,
};
pub use telemetry::TelemetryError;
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
