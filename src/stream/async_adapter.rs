//! Async adapters for the blocking pipes.
//!
//! Network code usually lives on a tokio runtime while terminal pumps are
//! plain threads. These adapters move bytes between tokio channels and
//! [`pipe`](super::pipe) ends on blocking tasks, so the runtime is never
//! blocked.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use super::pipe::{PipeReader, PipeWriter};

/// Feeds chunks received from a channel into a pipe.
///
/// Typical use: the receiving half of a network connection feeds the pipe
/// that a line-discipline terminal reads as its external source.
pub struct AsyncPipeFeeder {
    writer: PipeWriter,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl AsyncPipeFeeder {
    /// Create a new feeder.
    pub fn new(writer: PipeWriter, rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { writer, rx }
    }

    /// Run until the channel closes or the pipe stops accepting data.
    ///
    /// The pipe is closed when the channel ends, so its reader sees EOF.
    pub async fn run(self) {
        let writer = self.writer;
        let mut rx = self.rx;

        let result = tokio::task::spawn_blocking(move || {
            while let Some(data) = rx.blocking_recv() {
                trace!("pipe feeder: writing {} bytes", data.len());
                if let Err(e) = writer.write(&data) {
                    debug!("pipe feeder: {}", e);
                    return;
                }
            }
            debug!("pipe feeder: channel closed");
            writer.close();
        })
        .await;

        if let Err(e) = result {
            error!("pipe feeder task panicked: {}", e);
        }
    }
}

/// Forwards everything read from a pipe into a channel.
pub struct AsyncPipeReader {
    reader: PipeReader,
    tx: mpsc::Sender<Vec<u8>>,
    buffer_size: usize,
    poll_interval: Duration,
}

impl AsyncPipeReader {
    /// Create a new reader.
    pub fn new(reader: PipeReader, tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            reader,
            tx,
            buffer_size: 4096,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Create with custom buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Run until the pipe ends or the receiver is dropped.
    pub async fn run(self) {
        let reader = self.reader;
        let tx = self.tx;
        let buffer_size = self.buffer_size;
        let poll = self.poll_interval;

        let result = tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; buffer_size];
            loop {
                match reader.read_available(&mut buf, Some(poll)) {
                    Ok(Some(0)) => {
                        debug!("pipe reader: EOF");
                        break;
                    }
                    Ok(Some(n)) => {
                        trace!("pipe reader: read {} bytes", n);
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            debug!("pipe reader: channel closed");
                            break;
                        }
                    }
                    Ok(None) => {
                        if tx.is_closed() {
                            debug!("pipe reader: channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("pipe reader error: {}", e);
                        break;
                    }
                }
            }
        })
        .await;

        if let Err(e) = result {
            error!("pipe reader task panicked: {}", e);
        }
    }
}
