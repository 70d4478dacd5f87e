//! TCP listener for the dispatch server.
//!
//! The transport binds the configured local port once and serves accepted
//! connections strictly one at a time on a dedicated accept thread.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::ConnectionHandler;
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{CANNED_RESPONSE, CannedResponder};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
