//! Error types for request reading and dispatch failures.

use std::fmt;
use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::application::HandlerError;

/// Identifies which protocol line a read failure concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLine {
    /// The first line, carrying the JSON event.
    Event,
    /// The second line, carrying the handler identifier.
    Handler,
}

impl fmt::Display for RequestLine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => formatter.write_str("event"),
            Self::Handler => formatter.write_str("handler"),
        }
    }
}

/// Errors raised while reading the two request lines from a connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The client closed the connection before sending the line.
    #[error("connection closed before the {line} line was received")]
    MissingLine {
        /// Line that was never received.
        line: RequestLine,
    },
    /// The line exceeded the maximum accepted size.
    #[error("{line} line exceeds the {limit} byte limit")]
    LineTooLong {
        /// Line that overflowed.
        line: RequestLine,
        /// Maximum accepted size in bytes.
        limit: usize,
    },
    /// The line was not valid UTF-8.
    #[error("{line} line is not valid UTF-8")]
    InvalidUtf8 {
        /// Line that failed to decode.
        line: RequestLine,
        /// Underlying decoding error.
        #[source]
        source: FromUtf8Error,
    },
    /// Reading from the socket failed, including read timeouts.
    #[error("failed to read the {line} line")]
    Read {
        /// Line being read when the failure occurred.
        line: RequestLine,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Failures converted into structured error responses by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The event line was not valid JSON.
    #[error("event is not valid JSON")]
    InvalidEvent {
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// No handler is registered under the requested identifier.
    #[error("no handler registered for `{handler}`")]
    UnknownHandler {
        /// Identifier supplied by the client.
        handler: String,
    },
    /// The handler returned an error. Displays as the handler's own message.
    #[error("{source}")]
    Handler {
        /// Error returned by the handler.
        #[source]
        source: HandlerError,
    },
    /// The handler panicked.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
    /// The handler's result could not be serialized.
    #[error("failed to serialize handler result")]
    Encode {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}
