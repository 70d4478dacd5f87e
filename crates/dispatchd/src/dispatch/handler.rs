//! Connection handler driving one request cycle per accepted connection.
//!
//! A cycle reads the two request lines, dispatches, flushes captured output
//! to the log file, writes the response line and closes the connection. The
//! log file is always written before the response so the invoker can read it
//! as soon as the response arrives.

use std::io::BufReader;
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};

use camino::Utf8PathBuf;
use dispatchd_config::ReadPolicy;
use tracing::{debug, warn};

use crate::capture::CaptureSink;
use crate::transport::ConnectionHandler;

use super::DISPATCH_TARGET;
use super::dispatcher::Dispatcher;
use super::errors::ProtocolError;
use super::request::Request;
use super::response::{ErrorKind, ErrorResponse, Outcome, ResponseWriter};

/// Serves each connection with exactly one response line.
pub(crate) struct RequestCycle {
    dispatcher: Arc<Dispatcher>,
    sink: CaptureSink,
    log_path: Utf8PathBuf,
    policy: ReadPolicy,
    previous: Mutex<Option<Request>>,
}

impl RequestCycle {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        sink: CaptureSink,
        log_path: Utf8PathBuf,
        policy: ReadPolicy,
    ) -> Self {
        Self {
            dispatcher,
            sink,
            log_path,
            policy,
            previous: Mutex::new(None),
        }
    }

    fn serve(&self, stream: &TcpStream) {
        let outcome = match self.read_request(stream) {
            Ok(request) => {
                let mut output = self.sink.writer();
                self.dispatcher.dispatch(&request, &mut output)
            }
            Err(error) => Outcome::Failure(error),
        };

        if let Err(error) = self.sink.flush(self.log_path.as_std_path()) {
            warn!(
                target: DISPATCH_TARGET,
                path = %self.log_path,
                %error,
                "failed to write captured output"
            );
        }

        let mut writer = ResponseWriter::new(stream);
        if let Err(error) = writer.write_outcome(&outcome) {
            warn!(target: DISPATCH_TARGET, %error, "failed to write response");
        }
        if let Err(error) = stream.shutdown(Shutdown::Both) {
            debug!(target: DISPATCH_TARGET, %error, "connection already closed");
        }
    }

    fn read_request(&self, stream: &TcpStream) -> Result<Request, ErrorResponse> {
        let mut reader = BufReader::new(stream);
        match Request::read_from(&mut reader) {
            Ok(request) => {
                self.remember(&request);
                Ok(request)
            }
            Err(error) => self.recover(&error),
        }
    }

    fn remember(&self, request: &Request) {
        if matches!(self.policy, ReadPolicy::ReusePrevious) {
            *self.previous_request() = Some(request.clone());
        }
    }

    fn recover(&self, error: &ProtocolError) -> Result<Request, ErrorResponse> {
        warn!(target: DISPATCH_TARGET, %error, "incomplete request");

        let replay = match self.policy {
            ReadPolicy::ReusePrevious => self.previous_request().clone(),
            ReadPolicy::Fresh => None,
        };
        replay
            .inspect(|request| {
                warn!(
                    target: DISPATCH_TARGET,
                    handler = request.handler(),
                    "replaying previous request"
                );
            })
            .ok_or_else(|| {
                ErrorResponse::from_error(ErrorKind::ProtocolError, error, "connection".to_owned())
            })
    }

    fn previous_request(&self) -> std::sync::MutexGuard<'_, Option<Request>> {
        self.previous.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConnectionHandler for RequestCycle {
    fn handle(&self, stream: TcpStream) {
        self.serve(&stream);
    }
}
