//! Response encoding for the dispatch loop.
//!
//! Every request produces exactly one [`Outcome`]. Successful payloads are
//! already serialized and pass through untouched; failures are encoded as an
//! [`ErrorResponse`] object. [`ResponseWriter`] frames either as one line.

use std::error::Error;
use std::io::{self, Write};
use std::iter;

use serde::{Deserialize, Serialize};

/// Fixed tag identifying the kind of failure in an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The handler could not be resolved, failed or panicked.
    HandlerError,
    /// The request could not be read from the connection.
    ProtocolError,
}

/// Structured error object returned in place of a handler result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ErrorResponse {
    stack_trace: Vec<String>,
    error_message: String,
    error_type: ErrorKind,
}

const ENCODING_FALLBACK: &str = concat!(
    r#"{"stackTrace":[],"#,
    r#""errorMessage":"failed to encode error response","#,
    r#""errorType":"HandlerError"}"#,
);

impl ErrorResponse {
    /// Builds an error response from its parts.
    #[must_use]
    pub const fn new(kind: ErrorKind, message: String, stack_trace: Vec<String>) -> Self {
        Self {
            stack_trace,
            error_message: message,
            error_type: kind,
        }
    }

    /// Builds an error response from `error`.
    ///
    /// The message is the error's display text. Each underlying cause becomes
    /// a frame, innermost last, followed by `frame` naming where the failure
    /// surfaced.
    #[must_use]
    pub fn from_error(kind: ErrorKind, error: &dyn Error, frame: String) -> Self {
        let causes = iter::successors(error.source(), |&cause| cause.source())
            .map(|cause| format!("caused by: {cause}"));
        let stack_trace = causes.chain(iter::once(frame)).collect();
        Self::new(kind, error.to_string(), stack_trace)
    }

    /// Ordered frame descriptions.
    #[must_use]
    pub fn stack_trace(&self) -> &[String] {
        &self.stack_trace
    }

    /// Failure message.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error_message.as_str()
    }

    /// Failure tag.
    #[must_use]
    pub const fn error_type(&self) -> ErrorKind {
        self.error_type
    }

    /// Serializes the error object as a single JSON line.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| ENCODING_FALLBACK.to_owned())
    }
}

/// Result of dispatching one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Serialized success payload.
    Success(String),
    /// Structured failure.
    Failure(ErrorResponse),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Encodes the outcome as wire text, without the trailing newline.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Success(payload) => payload.clone(),
            Self::Failure(error) => error.encode(),
        }
    }
}

/// Writes encoded outcomes as newline-terminated lines.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wraps the given output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes `outcome` followed by a single newline, then flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn write_outcome(&mut self, outcome: &Outcome) -> io::Result<()> {
        let mut line = outcome.encode();
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()
    }
}
