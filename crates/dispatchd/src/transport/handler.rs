//! Connection handling abstraction for the listener.

use std::net::TcpStream;

/// Handles accepted socket connections.
///
/// The listener calls [`ConnectionHandler::handle`] inline on its accept
/// thread, so the next connection is not accepted until the call returns.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection and closes it. Implementations should
    /// avoid panicking.
    fn handle(&self, stream: TcpStream);
}
