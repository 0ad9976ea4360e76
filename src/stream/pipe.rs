//! Bounded in-memory byte pipe.
//!
//! The pipe is the cooked-input buffer of software terminals and the glue
//! between pump threads. Readers can wait with a timeout, peek without
//! consuming, and observe a failure latched by the writer.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::{ByteSource, ReadStatus};

/// Default pipe capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct Failure {
    kind: io::ErrorKind,
    message: String,
}

impl Failure {
    fn to_error(&self) -> io::Error {
        io::Error::new(self.kind, self.message.clone())
    }
}

#[derive(Debug, Default)]
struct State {
    buffer: VecDeque<u8>,
    closed: bool,
    reader_closed: bool,
    failure: Option<Failure>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a pipe holding at most `capacity` unread bytes.
pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::default()),
        readable: Condvar::new(),
        writable: Condvar::new(),
        capacity: capacity.max(1),
    });
    (
        PipeWriter {
            shared: Arc::clone(&shared),
        },
        PipeReader { shared },
    )
}

/// Writing end of a [`pipe`].
#[derive(Debug, Clone)]
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Append all of `data`, blocking while the pipe is full.
    ///
    /// Fails with `BrokenPipe` once either end has been closed or failed.
    pub fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut state = self.shared.lock();
        let mut rest = data;
        while !rest.is_empty() {
            if state.reader_closed || state.closed || state.failure.is_some() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
            }
            let space = self.shared.capacity - state.buffer.len();
            if space == 0 {
                state = self
                    .shared
                    .writable
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            let n = space.min(rest.len());
            state.buffer.extend(&rest[..n]);
            rest = &rest[n..];
            self.shared.readable.notify_all();
        }
        Ok(())
    }

    /// Close the pipe; readers see EOF once buffered bytes are drained.
    pub fn close(&self) {
        let mut state = self.shared.lock();
        state.closed = true;
        self.shared.readable.notify_all();
        self.shared.writable.notify_all();
    }

    /// Latch `err`; every read after the buffer drains reports it.
    ///
    /// The first failure wins.
    pub fn fail(&self, err: &io::Error) {
        let mut state = self.shared.lock();
        if state.failure.is_none() {
            state.failure = Some(Failure {
                kind: err.kind(),
                message: err.to_string(),
            });
        }
        self.shared.readable.notify_all();
        self.shared.writable.notify_all();
    }

    /// Whether the pipe was closed or failed.
    pub fn is_closed(&self) -> bool {
        let state = self.shared.lock();
        state.closed || state.reader_closed || state.failure.is_some()
    }
}

/// Reading end of a [`pipe`].
#[derive(Debug, Clone)]
pub struct PipeReader {
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Wait until a byte, EOF or a failure is available.
    ///
    /// `None` waits forever, a zero timeout polls.
    fn wait_ready(
        &self,
        timeout: Option<Duration>,
    ) -> io::Result<Option<MutexGuard<'_, State>>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.shared.lock();
        loop {
            if !state.buffer.is_empty() {
                return Ok(Some(state));
            }
            // A latched failure outlives a later close.
            if let Some(failure) = &state.failure {
                return Err(failure.to_error());
            }
            if state.closed || state.reader_closed {
                return Ok(Some(state));
            }
            match deadline {
                None => {
                    state = self
                        .shared
                        .readable
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    state = self
                        .shared
                        .readable
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }

    fn next(&self, timeout: Option<Duration>, consume: bool) -> io::Result<ReadStatus> {
        let Some(mut state) = self.wait_ready(timeout)? else {
            return Ok(ReadStatus::Timeout);
        };
        let byte = if consume {
            state.buffer.pop_front()
        } else {
            state.buffer.front().copied()
        };
        match byte {
            Some(b) => {
                if consume {
                    self.shared.writable.notify_all();
                }
                Ok(ReadStatus::Byte(b))
            }
            None => Ok(ReadStatus::Eof),
        }
    }

    /// Read one byte.
    pub fn read(&self, timeout: Option<Duration>) -> io::Result<ReadStatus> {
        self.next(timeout, true)
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&self, timeout: Option<Duration>) -> io::Result<ReadStatus> {
        self.next(timeout, false)
    }

    /// Read as many buffered bytes as fit into `buf`, waiting for the first.
    ///
    /// Returns `Ok(None)` on timeout and `Ok(Some(0))` at end of stream.
    pub fn read_available(
        &self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> io::Result<Option<usize>> {
        if buf.is_empty() {
            return Ok(Some(0));
        }
        let Some(mut state) = self.wait_ready(timeout)? else {
            return Ok(None);
        };
        let n = buf.len().min(state.buffer.len());
        for (slot, byte) in buf.iter_mut().zip(state.buffer.drain(..n)) {
            *slot = byte;
        }
        if n > 0 {
            self.shared.writable.notify_all();
        }
        Ok(Some(n))
    }

    /// Number of buffered bytes.
    pub fn available(&self) -> usize {
        self.shared.lock().buffer.len()
    }

    /// Close the reading end; writers fail with `BrokenPipe`.
    pub fn close(&self) {
        let mut state = self.shared.lock();
        state.reader_closed = true;
        self.shared.readable.notify_all();
        self.shared.writable.notify_all();
    }
}

impl ByteSource for PipeReader {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        self.read_available(buf, Some(timeout))
    }
}
