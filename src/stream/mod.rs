//! Byte stream primitives shared by every backend.
//!
//! - [`pipe`]: bounded in-memory FIFO with timeouts, peek and a latched
//!   failure. Used as the cooked-input buffer.
//! - [`ThreadedReader`]: turns any blocking [`Read`](std::io::Read) into a
//!   timeout-capable [`ByteSource`].
//! - [`AsyncPipeFeeder`] / [`AsyncPipeReader`]: bridge tokio channels to
//!   the blocking pipes.

mod async_adapter;
mod pipe;
mod threaded;

pub use async_adapter::{AsyncPipeFeeder, AsyncPipeReader};
pub use pipe::{pipe, PipeReader, PipeWriter, DEFAULT_CAPACITY};
pub use threaded::ThreadedReader;

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Result, TtyError};

/// Outcome of a single-byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// A byte was read.
    Byte(u8),
    /// The timeout expired with no input.
    Timeout,
    /// The stream has ended.
    Eof,
}

impl ReadStatus {
    /// The byte, if one was read.
    pub fn byte(self) -> Option<u8> {
        match self {
            ReadStatus::Byte(b) => Some(b),
            _ => None,
        }
    }
}

/// A chunked byte source that can be read with a timeout.
///
/// Pumps read from a `ByteSource` so that a stop request is observed
/// within one timeout even when no input arrives.
pub trait ByteSource: Send {
    /// Read up to `buf.len()` bytes.
    ///
    /// Returns `Ok(None)` when the timeout expired and `Ok(Some(0))` at end
    /// of stream.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;
}

/// The application-facing input side of a terminal.
pub trait InputStream: Send + Sync {
    /// Read one byte. `None` blocks, a zero timeout polls.
    fn read(&self, timeout: Option<Duration>) -> Result<ReadStatus>;

    /// Look at the next byte without consuming it.
    fn peek(&self, timeout: Option<Duration>) -> Result<ReadStatus>;

    /// Read whatever is available into `buf`, waiting for the first byte.
    ///
    /// Returns `Ok(None)` on timeout and `Ok(Some(0))` at end of stream.
    fn read_bytes(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<Option<usize>> {
        if buf.is_empty() {
            return Ok(Some(0));
        }
        match self.read(timeout)? {
            ReadStatus::Byte(b) => {
                buf[0] = b;
                let mut n = 1;
                while n < buf.len() {
                    match self.read(Some(Duration::ZERO))? {
                        ReadStatus::Byte(b) => {
                            buf[n] = b;
                            n += 1;
                        }
                        _ => break,
                    }
                }
                Ok(Some(n))
            }
            ReadStatus::Timeout => Ok(None),
            ReadStatus::Eof => Ok(Some(0)),
        }
    }
}

/// The application-facing output side of a terminal.
pub trait OutputStream: Send + Sync {
    /// Write all of `bytes`.
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Flush buffered output.
    fn flush(&self) -> Result<()>;
}

impl InputStream for PipeReader {
    fn read(&self, timeout: Option<Duration>) -> Result<ReadStatus> {
        Ok(PipeReader::read(self, timeout)?)
    }

    fn peek(&self, timeout: Option<Duration>) -> Result<ReadStatus> {
        Ok(PipeReader::peek(self, timeout)?)
    }

    fn read_bytes(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<Option<usize>> {
        Ok(self.read_available(buf, timeout)?)
    }
}

impl OutputStream for PipeWriter {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        PipeWriter::write(self, bytes).map_err(|e| match e.kind() {
            io::ErrorKind::BrokenPipe => TtyError::Closed,
            _ => TtyError::Io(e),
        })
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// A `Write` sink shared between threads.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SharedWriter {
    /// Wrap a writer.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }
}

impl fmt::Debug for SharedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedWriter").finish_non_exhaustive()
    }
}

impl OutputStream for SharedWriter {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| TtyError::LockPoisoned)?;
        inner.write_all(bytes)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| TtyError::LockPoisoned)?;
        inner.flush()?;
        Ok(())
    }
}
