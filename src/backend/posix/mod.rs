//! POSIX tty backend.
//!
//! The kernel enforces the line discipline; this backend only reads and
//! writes the device's settings through `stty` and never caches them.

mod reader;
pub mod stty;

pub use reader::{InterruptHandle, PtyReader};
pub use stty::{ExecStty, SttyRunner};

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::sync::Arc;

use tracing::debug;

use crate::attributes::{Attributes, Size};
use crate::error::Result;
use crate::stream::{InputStream, OutputStream, SharedWriter};
use crate::terminal::Backend;

/// Backend over a real tty device.
pub struct PosixBackend {
    runner: Arc<dyn SttyRunner>,
    reader: PtyReader,
    writer: SharedWriter,
}

impl PosixBackend {
    /// Open `device` for reading and writing, configured through the `stty`
    /// program at `stty`.
    pub fn open(device: &str, stty: &str) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(device)?;
        let input = file.try_clone()?;
        debug!(device, "opened tty");
        Ok(Self::with_streams(
            Arc::new(ExecStty::new(stty, device)),
            input,
            file,
        ))
    }

    /// Backend over explicit streams and `stty` runner.
    pub fn with_streams<R, W>(runner: Arc<dyn SttyRunner>, input: R, output: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            reader: PtyReader::new(Box::new(input), Arc::clone(&runner)),
            runner,
            writer: SharedWriter::new(output),
        }
    }

    /// Handle for interrupting timed reads.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.reader.interrupt_handle()
    }
}

impl Backend for PosixBackend {
    fn attributes(&self) -> Result<Attributes> {
        stty::query(self.runner.as_ref())
    }

    fn set_attributes(&self, attrs: &Attributes) -> Result<()> {
        stty::apply(self.runner.as_ref(), attrs)?;
        self.reader.reset_mode()
    }

    fn size(&self) -> Result<Size> {
        stty::parse_size(&self.runner.run(&["-a".to_string()])?)
    }

    fn set_size(&self, size: Size) -> Result<()> {
        let args = [
            "columns".to_string(),
            size.columns.to_string(),
            "rows".to_string(),
            size.rows.to_string(),
        ];
        self.runner.run(&args)?;
        Ok(())
    }

    fn input(&self) -> &dyn InputStream {
        &self.reader
    }

    fn output(&self) -> &dyn OutputStream {
        &self.writer
    }

    fn close(&self, original: &Attributes) -> Result<()> {
        debug!("restoring tty attributes");
        self.set_attributes(original)
    }
}
