//! Two-line request dispatch.
//!
//! Each accepted connection carries exactly one request:
//!
//! ```text
//! {"name":"x"}
//! echo
//! ```
//!
//! The first line is the event payload, the second the handler identifier.
//! The server answers with a single line and closes the connection. Success
//! payloads are the handler's serialized result; failures are encoded as
//!
//! ```json
//! {"stackTrace":["handler `boom`"],"errorMessage":"boom","errorType":"HandlerError"}
//! ```
//!
//! Events that are JSON objects containing the `_prewarm` key bypass handler
//! resolution entirely and are answered with a `prewarmed_at` timestamp.

mod dispatcher;
mod errors;
mod handler;
mod prewarm;
mod request;
mod response;

pub use self::dispatcher::Dispatcher;
pub use self::errors::{DispatchError, ProtocolError, RequestLine};
pub(crate) use self::handler::RequestCycle;
pub use self::prewarm::{PREWARM_KEY, PrewarmCounter};
pub use self::request::{MAX_LINE_BYTES, Request};
pub use self::response::{ErrorKind, ErrorResponse, Outcome, ResponseWriter};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
