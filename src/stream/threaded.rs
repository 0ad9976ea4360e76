//! Timeout-capable reads over a blocking [`Read`].

use std::io::{self, Read};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use super::pipe::{pipe, PipeReader, PipeWriter};
use super::ByteSource;

/// Reads a blocking source on a dedicated thread into a bounded pipe.
///
/// The thread ends at EOF, on a read error (latched onto the pipe) or once
/// the `ThreadedReader` is dropped and the next chunk cannot be delivered.
#[derive(Debug)]
pub struct ThreadedReader {
    reader: PipeReader,
}

impl ThreadedReader {
    /// Spawn a reader thread named `name` over `source`.
    pub fn spawn<R>(name: &str, source: R, capacity: usize) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (writer, reader) = pipe(capacity);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || copy_into(source, writer))?;
        Ok(Self { reader })
    }

    /// The pipe the thread writes into.
    pub fn reader(&self) -> &PipeReader {
        &self.reader
    }
}

impl ByteSource for ThreadedReader {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        self.reader.read_available(buf, Some(timeout))
    }
}

impl Drop for ThreadedReader {
    fn drop(&mut self) {
        self.reader.close();
    }
}

fn copy_into<R: Read>(mut source: R, writer: PipeWriter) {
    let mut buf = [0u8; 4096];
    loop {
        match source.read(&mut buf) {
            Ok(0) => {
                debug!("threaded reader: EOF");
                writer.close();
                break;
            }
            Ok(n) => {
                trace!("threaded reader: read {} bytes", n);
                if writer.write(&buf[..n]).is_err() {
                    debug!("threaded reader: pipe closed");
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // EIO on a pty master means the slave side went away.
                #[cfg(unix)]
                if e.raw_os_error() == Some(libc::EIO) {
                    debug!("threaded reader: EIO, treating as EOF");
                    writer.close();
                    break;
                }
                debug!("threaded reader: {}", e);
                writer.fail(&e);
                break;
            }
        }
    }
}
