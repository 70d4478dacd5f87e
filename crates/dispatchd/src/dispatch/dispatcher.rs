//! Request dispatcher: prewarm fast path and the outermost failure boundary.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::application::Application;
use crate::health::HealthReporter;

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::prewarm::{self, PrewarmCounter};
use super::request::Request;
use super::response::{ErrorKind, ErrorResponse, Outcome};

/// Routes requests to application handlers.
///
/// [`Dispatcher::dispatch`] never fails and never unwinds: every error
/// returned by a handler, and every panic raised by one, is converted into an
/// [`Outcome::Failure`].
pub struct Dispatcher {
    application: Arc<dyn Application>,
    prewarm: PrewarmCounter,
    reporter: Arc<dyn HealthReporter>,
}

impl Dispatcher {
    /// Builds a dispatcher for `application`.
    #[must_use]
    pub fn new(application: Arc<dyn Application>, reporter: Arc<dyn HealthReporter>) -> Self {
        Self {
            application,
            prewarm: PrewarmCounter::new(),
            reporter,
        }
    }

    /// Number of prewarm pings answered by this dispatcher.
    #[must_use]
    pub fn prewarm_count(&self) -> u64 {
        self.prewarm.count()
    }

    /// Dispatches `request`, handing `output` to the handler for its
    /// diagnostic output.
    pub fn dispatch(&self, request: &Request, output: &mut dyn Write) -> Outcome {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| self.serve(request, output)));
        let result = attempt.unwrap_or_else(|payload| {
            Err(DispatchError::Panicked {
                message: panic_message(&*payload),
            })
        });

        match result {
            Ok(payload) => Outcome::Success(payload),
            Err(error) => {
                self.reporter.handler_failed(request.handler(), &error);
                Outcome::Failure(error_response(&error, request.handler()))
            }
        }
    }

    fn serve(&self, request: &Request, output: &mut dyn Write) -> Result<String, DispatchError> {
        let event: Value = serde_json::from_str(request.event())
            .map_err(|source| DispatchError::InvalidEvent { source })?;

        if prewarm::is_prewarm(&event) {
            let served = self.prewarm.increment();
            self.reporter.prewarm_served(served);
            return Ok(prewarm::acknowledgement());
        }

        let handler = self
            .application
            .resolve(request.handler())
            .ok_or_else(|| DispatchError::UnknownHandler {
                handler: request.handler().to_owned(),
            })?;

        debug!(
            target: DISPATCH_TARGET,
            handler = request.handler(),
            "invoking handler"
        );
        let result = handler
            .invoke(&event, request.context(), output)
            .map_err(|source| DispatchError::Handler { source })?;
        serde_json::to_string(&result).map_err(|source| DispatchError::Encode { source })
    }
}

fn error_response(error: &DispatchError, handler: &str) -> ErrorResponse {
    let frame = format!("handler `{handler}`");
    match error {
        DispatchError::Handler { source } => {
            ErrorResponse::from_error(ErrorKind::HandlerError, &**source, frame)
        }
        other => ErrorResponse::from_error(ErrorKind::HandlerError, other, frame),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
