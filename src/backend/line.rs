//! Line-discipline backend.
//!
//! Attributes live in memory and are enforced by [`LineDiscipline`]. Two
//! flavours exist:
//!
//! - *external*: one input pump reads a caller-supplied [`ByteSource`];
//!   output goes straight to a caller-supplied sink.
//! - *local pty*: a pty pair is opened with portable-pty. The input pump
//!   reads the master and feeds the engine, an output pump drains the
//!   engine's output queue into the master. EOF in either direction closes
//!   the whole terminal.

use std::io::Write;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, SlavePty};
use tracing::{debug, trace, warn};

use super::{latched_error, BackendSettings};
use crate::attributes::{Attributes, Size};
use crate::discipline::{LineDiscipline, ProcessedOutput};
use crate::error::{Result, TtyError};
use crate::pump::{Pump, PumpState, PumpWork, Step};
use crate::signal::SignalRegistry;
use crate::stream::{
    pipe, ByteSource, InputStream, OutputStream, PipeReader, PipeWriter, ThreadedReader,
};
use crate::terminal::Backend;

const CHUNK_SIZE: usize = 4096;

/// Reads raw input and feeds it through the engine.
struct InputPump {
    source: Box<dyn ByteSource>,
    engine: Arc<LineDiscipline>,
    output_queue: Option<PipeWriter>,
    buf: Vec<u8>,
    poll: Duration,
}

impl PumpWork for InputPump {
    fn step(&mut self) -> Result<Step> {
        if self.engine.is_closed() {
            return Ok(Step::Done);
        }
        match self.source.read_timeout(&mut self.buf, self.poll)? {
            None => Ok(Step::Continue),
            Some(0) => Ok(Step::Done),
            Some(n) => {
                trace!("input pump: {} bytes", n);
                self.engine.process_input(&self.buf[..n])?;
                Ok(Step::Continue)
            }
        }
    }

    fn finished(&mut self, error: Option<&TtyError>) {
        match error {
            Some(e) => self.engine.fail(&latched_error(e)),
            None => self.engine.close(),
        }
        if let Some(queue) = &self.output_queue {
            queue.close();
        }
    }
}

/// Drains queued output into the pty master.
struct OutputPump {
    queue: PipeReader,
    sink: Box<dyn Write + Send>,
    engine: Arc<LineDiscipline>,
    buf: Vec<u8>,
    poll: Duration,
}

impl PumpWork for OutputPump {
    fn step(&mut self) -> Result<Step> {
        match self.queue.read_available(&mut self.buf, Some(self.poll))? {
            None => Ok(Step::Continue),
            Some(0) => Ok(Step::Done),
            Some(n) => {
                self.sink.write_all(&self.buf[..n])?;
                self.sink.flush()?;
                Ok(Step::Continue)
            }
        }
    }

    fn finished(&mut self, error: Option<&TtyError>) {
        match error {
            Some(e) => self.engine.fail(&latched_error(e)),
            None => self.engine.close(),
        }
        self.queue.close();
    }
}

struct LocalPty {
    master: Mutex<Box<dyn MasterPty + Send>>,
    slave: Mutex<Box<dyn SlavePty + Send>>,
    output_queue: PipeWriter,
    output_pump: Pump<OutputPump>,
}

/// Terminal backend enforcing attributes in user space.
pub struct LineBackend {
    attributes: Arc<RwLock<Attributes>>,
    size: RwLock<Size>,
    cooked: PipeReader,
    engine: Arc<LineDiscipline>,
    output: ProcessedOutput,
    input_pump: Pump<InputPump>,
    pty: Option<LocalPty>,
    join_timeout: Duration,
}

impl LineBackend {
    /// Backend over an external byte source and sink.
    ///
    /// The input pump is started before returning.
    pub fn external(
        signals: Arc<SignalRegistry>,
        source: Box<dyn ByteSource>,
        sink: Arc<dyn OutputStream>,
        settings: &BackendSettings,
    ) -> Result<Self> {
        let backend = Self::assemble(signals, source, sink, None, settings);
        backend.input_pump.resume()?;
        debug!("external line-discipline backend started");
        Ok(backend)
    }

    /// Backend over a freshly opened local pty pair.
    ///
    /// Spawn a program on the slave side with
    /// [`spawn_command`](Self::spawn_command).
    pub fn local_pty(signals: Arc<SignalRegistry>, settings: &BackendSettings) -> Result<Self> {
        let size = Size::default();
        let pair = native_pty_system()
            .openpty(size.into())
            .map_err(|e| TtyError::Pty(e.to_string()))?;
        #[cfg(unix)]
        make_pair_raw(pair.master.as_ref())?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TtyError::Pty(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TtyError::Pty(e.to_string()))?;

        let source = ThreadedReader::spawn("ttyline-pty-reader", reader, settings.pipe_capacity)?;
        let (queue_tx, queue_rx) = pipe(settings.pipe_capacity);

        let mut backend = Self::assemble(
            signals,
            Box::new(source),
            Arc::new(queue_tx.clone()),
            Some(queue_tx.clone()),
            settings,
        );
        let output_pump = Pump::new(
            "output",
            OutputPump {
                queue: queue_rx,
                sink: writer,
                engine: Arc::clone(&backend.engine),
                buf: vec![0; CHUNK_SIZE],
                poll: settings.poll_interval,
            },
            settings.join_timeout,
        );
        backend.pty = Some(LocalPty {
            master: Mutex::new(pair.master),
            slave: Mutex::new(pair.slave),
            output_queue: queue_tx,
            output_pump,
        });
        if let Some(pty) = &backend.pty {
            pty.output_pump.resume()?;
        }
        backend.input_pump.resume()?;
        debug!("local pty backend started");
        Ok(backend)
    }

    fn assemble(
        signals: Arc<SignalRegistry>,
        source: Box<dyn ByteSource>,
        sink: Arc<dyn OutputStream>,
        output_queue: Option<PipeWriter>,
        settings: &BackendSettings,
    ) -> Self {
        let attributes = Arc::new(RwLock::new(Attributes::cooked()));
        let (cooked_tx, cooked_rx) = pipe(settings.pipe_capacity);
        let engine = Arc::new(LineDiscipline::new(
            Arc::clone(&attributes),
            signals,
            cooked_tx,
            Arc::clone(&sink),
        ));
        let input_pump = Pump::new(
            "input",
            InputPump {
                source,
                engine: Arc::clone(&engine),
                output_queue,
                buf: vec![0; CHUNK_SIZE],
                poll: settings.poll_interval,
            },
            settings.join_timeout,
        );
        Self {
            output: ProcessedOutput::new(Arc::clone(&attributes), sink),
            attributes,
            size: RwLock::new(Size::default()),
            cooked: cooked_rx,
            engine,
            input_pump,
            pty: None,
            join_timeout: settings.join_timeout,
        }
    }

    /// Run `command` on the slave side of the local pty.
    pub fn spawn_command(&self, command: CommandBuilder) -> Result<Box<dyn Child + Send + Sync>> {
        let pty = self
            .pty
            .as_ref()
            .ok_or(TtyError::Unsupported("spawn_command"))?;
        let slave = pty.slave.lock().map_err(|_| TtyError::LockPoisoned)?;
        slave
            .spawn_command(command)
            .map_err(|e| TtyError::Pty(e.to_string()))
    }

    /// Whether this backend owns a local pty.
    pub fn is_local_pty(&self) -> bool {
        self.pty.is_some()
    }

    /// Stop draining output into the pty.
    pub fn pause_output(&self, wait: bool) -> Result<()> {
        match &self.pty {
            Some(pty) => pty.output_pump.pause(wait),
            None => Err(TtyError::Unsupported("pause_output")),
        }
    }

    /// Restart draining output into the pty.
    pub fn resume_output(&self) -> Result<()> {
        match &self.pty {
            Some(pty) => pty.output_pump.resume(),
            None => Err(TtyError::Unsupported("resume_output")),
        }
    }

    /// State of the input pump.
    pub fn input_state(&self) -> Result<PumpState> {
        self.input_pump.state()
    }
}

/// Put the pty pair into raw mode so the engine is its only line discipline.
///
/// Termios set through the master applies to the slave. A cooked slave would
/// echo and translate what the engine writes, and the master would read
/// that echo back as fresh input.
#[cfg(unix)]
fn make_pair_raw(master: &(dyn MasterPty + Send)) -> Result<()> {
    let fd = master
        .as_raw_fd()
        .ok_or_else(|| TtyError::Pty("pty master has no file descriptor".to_string()))?;
    // SAFETY: `fd` is the open master of the pair and `termios` is fully
    // initialised by tcgetattr before it is read.
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut termios) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        libc::cfmakeraw(&mut termios);
        if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    debug!(fd, "pty pair switched to raw mode");
    Ok(())
}

impl Backend for LineBackend {
    fn attributes(&self) -> Result<Attributes> {
        let attrs = self.attributes.read().map_err(|_| TtyError::LockPoisoned)?;
        Ok(attrs.clone())
    }

    fn set_attributes(&self, attrs: &Attributes) -> Result<()> {
        let mut current = self.attributes.write().map_err(|_| TtyError::LockPoisoned)?;
        *current = attrs.clone();
        Ok(())
    }

    fn size(&self) -> Result<Size> {
        let size = self.size.read().map_err(|_| TtyError::LockPoisoned)?;
        Ok(*size)
    }

    fn set_size(&self, size: Size) -> Result<()> {
        if let Some(pty) = &self.pty {
            let master = pty.master.lock().map_err(|_| TtyError::LockPoisoned)?;
            master
                .resize(size.into())
                .map_err(|e| TtyError::Pty(e.to_string()))?;
        }
        let mut current = self.size.write().map_err(|_| TtyError::LockPoisoned)?;
        *current = size;
        Ok(())
    }

    fn input(&self) -> &dyn InputStream {
        &self.cooked
    }

    fn output(&self) -> &dyn OutputStream {
        &self.output
    }

    fn can_pause(&self) -> bool {
        true
    }

    fn pause(&self, wait: bool) -> Result<()> {
        self.input_pump.pause(wait)
    }

    fn resume(&self) -> Result<()> {
        if self.engine.is_closed() {
            return Err(TtyError::Closed);
        }
        self.input_pump.resume()
    }

    fn paused(&self) -> Result<bool> {
        self.input_pump.paused()
    }

    fn failed(&self) -> bool {
        self.engine.is_failed()
    }

    fn close(&self, _original: &Attributes) -> Result<()> {
        if let Some(pty) = &self.pty {
            // Let queued output reach the pty before the pump is stopped.
            pty.output_queue.close();
            if pty.output_pump.join(self.join_timeout)? != PumpState::Finished {
                warn!("output pump still draining after {:?}", self.join_timeout);
            }
            pty.output_pump.close()?;
        }
        self.input_pump.close()?;
        self.engine.close();
        debug!("line-discipline backend closed");
        Ok(())
    }
}
