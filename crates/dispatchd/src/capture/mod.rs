//! In-memory capture of diagnostic output.
//!
//! The server never swaps the process-wide stdout or stderr handles. Instead a
//! [`CaptureSink`] is created at startup and handed to everything that
//! produces diagnostics during a request: the telemetry subscriber writes
//! into it through [`MakeWriter`], and each handler invocation receives a
//! [`CaptureWriter`] as its output stream. After every request cycle the
//! buffer is persisted to the configured log path and reset, so the log
//! always reflects exactly one request.
//!
//! In debug mode every write is mirrored to the real stderr stream for live
//! inspection. The mirror is best-effort and never alters the captured bytes.

mod files;

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

/// Shared buffer collecting everything written during one request cycle.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    buffer: Arc<Mutex<Vec<u8>>>,
    mirror: bool,
}

impl CaptureSink {
    /// Builds an empty sink. When `mirror` is set, writes are also echoed to
    /// the process's stderr stream.
    #[must_use]
    pub fn new(mirror: bool) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            mirror,
        }
    }

    /// Starts a fresh, empty buffer, discarding anything captured so far.
    pub fn install(&self) {
        let mut buffer = self.lock();
        buffer.clear();
        buffer.shrink_to(INITIAL_CAPACITY);
    }

    /// Persists the buffered output to `path`, replacing its contents, then
    /// reinstalls an empty buffer.
    ///
    /// The buffer is reset even when persisting fails so output never leaks
    /// into the next request cycle.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while writing the log file.
    pub fn flush(&self, path: &Path) -> io::Result<()> {
        let contents = self.contents();
        let written = files::atomic_write(path, &contents);
        self.install();
        written
    }

    /// Returns a copy of everything captured since the last reset.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Returns `true` when writes are echoed to stderr.
    #[must_use]
    pub const fn is_mirrored(&self) -> bool {
        self.mirror
    }

    /// Builds a writer appending to this sink.
    #[must_use]
    pub fn writer(&self) -> CaptureWriter {
        CaptureWriter { sink: self.clone() }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // A panicking writer cannot leave the byte buffer in an invalid state.
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const INITIAL_CAPACITY: usize = 8 * 1024;

/// [`Write`] handle appending to a [`CaptureSink`].
#[derive(Debug)]
pub struct CaptureWriter {
    sink: CaptureSink,
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.lock().extend_from_slice(buf);
        if self.sink.mirror {
            let _mirrored = io::stderr().write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.sink.mirror {
            let _mirrored = io::stderr().flush();
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureSink {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer()
    }
}
