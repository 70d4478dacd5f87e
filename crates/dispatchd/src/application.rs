//! Application collaborators driven by the server.
//!
//! The server knows nothing about the application beyond two contracts:
//! one-time initialisation ([`Application::boot`] and
//! [`Application::eager_load`]), run before the listener serves and before
//! any fork, and handler resolution by identifier ([`Application::resolve`]).
//! [`HandlerRegistry`] provides both for applications assembled from plain
//! functions or closures.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Failure returned by a request handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Application-defined function producing the response to a request.
pub trait RequestHandler: Send + Sync {
    /// Handles `event` with `context`. Diagnostic output written to `output`
    /// is captured into the request's log.
    ///
    /// # Errors
    ///
    /// Any error is converted into a structured error response by the
    /// dispatcher; it never terminates the server.
    fn invoke(
        &self,
        event: &Value,
        context: &Value,
        output: &mut dyn Write,
    ) -> Result<Value, HandlerError>;
}

impl<F> RequestHandler for F
where
    F: Fn(&Value, &Value, &mut dyn Write) -> Result<Value, HandlerError> + Send + Sync,
{
    fn invoke(
        &self,
        event: &Value,
        context: &Value,
        output: &mut dyn Write,
    ) -> Result<Value, HandlerError> {
        self(event, context, output)
    }
}

/// Errors raised while booting or eager-loading the application.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApplicationError {
    message: String,
    #[source]
    source: Option<HandlerError>,
}

impl ApplicationError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<HandlerError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// The application served by the dispatch server.
pub trait Application: Send + Sync {
    /// One-time environment bootstrap.
    ///
    /// # Errors
    ///
    /// A failure is fatal: the server exits before serving any request.
    fn boot(&self) -> Result<(), ApplicationError> {
        Ok(())
    }

    /// One-time eager loading of application code, run after [`boot`].
    ///
    /// [`boot`]: Application::boot
    ///
    /// # Errors
    ///
    /// A failure is fatal: the server exits before serving any request.
    fn eager_load(&self) -> Result<(), ApplicationError> {
        Ok(())
    }

    /// Resolves a handler identifier to its implementation.
    fn resolve(&self, handler: &str) -> Option<Arc<dyn RequestHandler>>;
}

/// Application assembled from named handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn RequestHandler>>,
}

impl HandlerRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous entry.
    #[must_use]
    pub fn with_handler<H>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: RequestHandler + 'static,
    {
        self.register(name, handler);
        self
    }

    /// Registers `handler` under `name`, replacing any previous entry.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: RequestHandler + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Registered handler identifiers in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Application for HandlerRegistry {
    fn eager_load(&self) -> Result<(), ApplicationError> {
        debug!(
            target: concat!(env!("CARGO_PKG_NAME"), "::application"),
            handlers = self.handlers.len(),
            "handler registry loaded"
        );
        Ok(())
    }

    fn resolve(&self, handler: &str) -> Option<Arc<dyn RequestHandler>> {
        self.handlers.get(handler).cloned()
    }
}
