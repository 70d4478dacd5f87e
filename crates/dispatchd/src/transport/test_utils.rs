//! Connection handler doubles for listener tests.

use std::io::Write;
use std::net::TcpStream;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::ConnectionHandler;

/// Line written back to every connection by [`CannedResponder`].
pub(crate) const CANNED_RESPONSE: &[u8] = b"{\"ok\":true}\n";

/// Answers each connection with [`CANNED_RESPONSE`] and counts the
/// connections it served.
pub(crate) struct CannedResponder {
    served: Arc<AtomicUsize>,
}

impl CannedResponder {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let served = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            served: Arc::clone(&served),
        });
        (served, handler)
    }
}

impl ConnectionHandler for CannedResponder {
    fn handle(&self, mut stream: TcpStream) {
        if stream.write_all(CANNED_RESPONSE).is_ok() {
            self.served.fetch_add(1, Ordering::SeqCst);
        }
    }
}
