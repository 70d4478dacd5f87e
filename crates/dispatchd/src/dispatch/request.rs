//! Reading the two protocol lines into a [`Request`].

use std::io::{BufRead, Read};

use serde_json::{Map, Value};

use super::errors::{ProtocolError, RequestLine};

/// Maximum size of a single protocol line in bytes, newline included.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A request read from one connection.
///
/// The event is kept as the raw text the client sent; the dispatcher decodes
/// it. Both lines are trimmed of surrounding whitespace, including the
/// newline delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    event: String,
    handler: String,
    context: Value,
}

impl Request {
    /// Builds a request with an empty JSON object as its context.
    #[must_use]
    pub fn new(event: &str, handler: &str) -> Self {
        Self {
            event: event.trim().to_owned(),
            handler: handler.trim().to_owned(),
            context: Value::Object(Map::new()),
        }
    }

    /// Replaces the context passed to the handler.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Reads the event line followed by the handler line.
    ///
    /// A final line without a trailing newline is accepted when the client
    /// closes its write side right after sending it.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when either line is missing, oversized, not
    /// UTF-8, or the underlying read fails or times out.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self, ProtocolError> {
        let event = read_line(reader, RequestLine::Event)?;
        let handler = read_line(reader, RequestLine::Handler)?;
        Ok(Self::new(&event, &handler))
    }

    /// Raw event text.
    #[must_use]
    pub fn event(&self) -> &str {
        self.event.as_str()
    }

    /// Handler identifier.
    #[must_use]
    pub fn handler(&self) -> &str {
        self.handler.as_str()
    }

    /// Context value handed to the handler.
    #[must_use]
    pub const fn context(&self) -> &Value {
        &self.context
    }
}

fn read_line<R: BufRead>(reader: &mut R, line: RequestLine) -> Result<String, ProtocolError> {
    let limit = u64::try_from(MAX_LINE_BYTES)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut buffer = Vec::new();
    let mut bounded = reader.by_ref().take(limit);
    let read = bounded
        .read_until(b'\n', &mut buffer)
        .map_err(|source| ProtocolError::Read { line, source })?;

    if read == 0 {
        return Err(ProtocolError::MissingLine { line });
    }
    if buffer.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::LineTooLong {
            line,
            limit: MAX_LINE_BYTES,
        });
    }
    String::from_utf8(buffer).map_err(|source| ProtocolError::InvalidUtf8 { line, source })
}
