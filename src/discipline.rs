//! User-space line discipline.
//!
//! Turns raw input bytes into signals, echo and cooked input, and shapes
//! application output line endings. Used when there is no kernel line
//! discipline: network-attached byte streams, locally owned ptys whose
//! discipline is bypassed, and (without echo) native consoles.
//!
//! The engine keeps no mode of its own. Every byte is processed against the
//! attributes as they are at that moment, so a change made by a signal
//! handler affects the rest of the same chunk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::attributes::{Attributes, ControlChar, InputFlags, LocalFlags, OutputFlags};
use crate::error::{Result, TtyError};
use crate::signal::{Signal, SignalRegistry};
use crate::stream::{OutputStream, PipeWriter};

/// What a single input byte turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputAction {
    /// Signal to raise, if any.
    pub signal: Option<Signal>,
    /// Byte to append to cooked input, if any.
    pub cooked: Option<u8>,
}

/// Process one raw input byte.
///
/// Echoed output (already output-processed) is appended to `echo`.
pub fn process_input_byte(attrs: &Attributes, byte: u8, echo: &mut Vec<u8>) -> InputAction {
    let echoing = attrs.local_flag(LocalFlags::ECHO);
    let mut signal = None;

    if attrs.local_flag(LocalFlags::ISIG) {
        let consumed = if attrs.is_control_char(ControlChar::VIntr, byte) {
            Some(Signal::Int)
        } else if attrs.is_control_char(ControlChar::VQuit, byte) {
            Some(Signal::Quit)
        } else if attrs.is_control_char(ControlChar::VSusp, byte) {
            Some(Signal::Tstp)
        } else {
            None
        };
        if let Some(sig) = consumed {
            return InputAction {
                signal: Some(sig),
                cooked: None,
            };
        }
        if attrs.is_control_char(ControlChar::VStatus, byte) {
            signal = Some(Signal::Info);
        }
    }

    let byte = match byte {
        b'\r' if attrs.input_flag(InputFlags::IGNCR) => {
            return InputAction {
                signal,
                cooked: None,
            }
        }
        b'\r' if attrs.input_flag(InputFlags::ICRNL) => b'\n',
        b'\n' if attrs.input_flag(InputFlags::INLCR) => b'\r',
        b => b,
    };

    if echoing {
        process_output(attrs, byte, echo);
    }
    InputAction {
        signal,
        cooked: Some(byte),
    }
}

/// Apply output processing to one byte.
pub fn process_output(attrs: &Attributes, byte: u8, out: &mut Vec<u8>) {
    if byte == b'\n'
        && attrs.output_flag(OutputFlags::OPOST)
        && attrs.output_flag(OutputFlags::ONLCR)
    {
        out.extend_from_slice(b"\r\n");
    } else {
        out.push(byte);
    }
}

/// Apply output processing to a whole buffer.
pub fn process_output_bytes(attrs: &Attributes, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 8);
    for &b in bytes {
        process_output(attrs, b, &mut out);
    }
    out
}

/// Stateful wrapper feeding processed input into a cooked pipe.
pub struct LineDiscipline {
    attributes: Arc<RwLock<Attributes>>,
    signals: Arc<SignalRegistry>,
    cooked: PipeWriter,
    output: Arc<dyn OutputStream>,
    local_echo: bool,
    failed: AtomicBool,
}

impl LineDiscipline {
    /// Create an engine writing cooked input to `cooked` and echo to `output`.
    pub fn new(
        attributes: Arc<RwLock<Attributes>>,
        signals: Arc<SignalRegistry>,
        cooked: PipeWriter,
        output: Arc<dyn OutputStream>,
    ) -> Self {
        Self {
            attributes,
            signals,
            cooked,
            output,
            local_echo: true,
            failed: AtomicBool::new(false),
        }
    }

    /// Disable echo regardless of the ECHO flag, for hosts that echo themselves.
    pub fn without_echo(mut self) -> Self {
        self.local_echo = false;
        self
    }

    /// Process a chunk of raw input.
    ///
    /// Cooked bytes are written once per chunk; output is flushed once, and
    /// only when something was echoed.
    pub fn process_input(&self, chunk: &[u8]) -> Result<()> {
        let mut cooked = Vec::with_capacity(chunk.len());
        let mut echo = Vec::new();

        for &byte in chunk {
            let action = {
                let attrs = self
                    .attributes
                    .read()
                    .map_err(|_| TtyError::LockPoisoned)?;
                process_input_byte(&attrs, byte, &mut echo)
            };
            if !self.local_echo {
                echo.clear();
            }
            if let Some(signal) = action.signal {
                self.signals.raise(signal);
            }
            if let Some(b) = action.cooked {
                cooked.push(b);
            }
        }

        if !echo.is_empty() {
            trace!("echoing {} bytes", echo.len());
            self.output.write(&echo)?;
            self.output.flush()?;
        }
        if !cooked.is_empty() {
            self.cooked.write(&cooked)?;
        }
        Ok(())
    }

    /// Latch an upstream failure onto the cooked input.
    pub fn fail(&self, err: &std::io::Error) {
        self.failed.store(true, Ordering::SeqCst);
        self.cooked.fail(err);
    }

    /// Whether an upstream failure has been latched.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Close the cooked input; readers see EOF after draining.
    pub fn close(&self) {
        self.cooked.close();
    }

    /// Whether the cooked input has been closed or failed.
    pub fn is_closed(&self) -> bool {
        self.cooked.is_closed()
    }
}

/// Output stream that applies output processing before writing.
pub struct ProcessedOutput {
    attributes: Arc<RwLock<Attributes>>,
    sink: Arc<dyn OutputStream>,
}

impl ProcessedOutput {
    /// Wrap `sink`.
    pub fn new(attributes: Arc<RwLock<Attributes>>, sink: Arc<dyn OutputStream>) -> Self {
        Self { attributes, sink }
    }
}

impl OutputStream for ProcessedOutput {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        let processed = {
            let attrs = self
                .attributes
                .read()
                .map_err(|_| TtyError::LockPoisoned)?;
            process_output_bytes(&attrs, bytes)
        };
        self.sink.write(&processed)
    }

    fn flush(&self) -> Result<()> {
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalHandler;
    use crate::stream::{pipe, PipeReader, ReadStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        written: Mutex<Vec<u8>>,
        flushes: AtomicUsize,
    }

    impl OutputStream for Recorder {
        fn write(&self, bytes: &[u8]) -> Result<()> {
            self.written.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        attrs: Arc<RwLock<Attributes>>,
        signals: Arc<SignalRegistry>,
        output: Arc<Recorder>,
        cooked: PipeReader,
        engine: LineDiscipline,
    }

    fn fixture(attrs: Attributes) -> Fixture {
        let attrs = Arc::new(RwLock::new(attrs));
        let signals = Arc::new(SignalRegistry::default());
        let output = Arc::new(Recorder::default());
        let (writer, cooked) = pipe(256);
        let engine = LineDiscipline::new(
            Arc::clone(&attrs),
            Arc::clone(&signals),
            writer,
            Arc::clone(&output) as Arc<dyn OutputStream>,
        );
        Fixture {
            attrs,
            signals,
            output,
            cooked,
            engine,
        }
    }

    fn drain(reader: &PipeReader) -> Vec<u8> {
        let mut out = Vec::new();
        while let ReadStatus::Byte(b) = reader.read(Some(Duration::ZERO)).unwrap() {
            out.push(b);
        }
        out
    }

    fn count(fx: &Fixture, signal: Signal) -> Arc<AtomicUsize> {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        fx.signals.handle(
            signal,
            SignalHandler::custom(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        counter
    }

    #[test]
    fn test_interrupt_is_consumed() {
        let fx = fixture(Attributes::cooked());
        let ints = count(&fx, Signal::Int);

        fx.engine.process_input(&[0x03]).unwrap();

        assert_eq!(ints.load(Ordering::SeqCst), 1);
        assert!(drain(&fx.cooked).is_empty());
        assert!(fx.output.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_interrupt_passes_without_isig() {
        let mut attrs = Attributes::cooked();
        attrs.set_local_flag(LocalFlags::ISIG, false);
        let fx = fixture(attrs);
        let ints = count(&fx, Signal::Int);

        fx.engine.process_input(&[0x03]).unwrap();

        assert_eq!(ints.load(Ordering::SeqCst), 0);
        assert_eq!(drain(&fx.cooked), vec![0x03]);
    }

    #[test]
    fn test_newline_echo_ordering() {
        let fx = fixture(Attributes::cooked());

        fx.engine.process_input(b"\n").unwrap();

        assert_eq!(&*fx.output.written.lock().unwrap(), b"\r\n");
        assert_eq!(drain(&fx.cooked), b"\n");
    }

    #[test]
    fn test_carriage_return_translation() {
        let fx = fixture(Attributes::cooked());
        fx.engine.process_input(b"a\rb").unwrap();
        assert_eq!(drain(&fx.cooked), b"a\nb");

        fx.attrs
            .write()
            .unwrap()
            .set_input_flag(InputFlags::IGNCR, true);
        fx.engine.process_input(b"c\rd").unwrap();
        assert_eq!(drain(&fx.cooked), b"cd");
    }

    #[test]
    fn test_inlcr_maps_newline() {
        let mut attrs = Attributes::cooked();
        attrs.set_input_flag(InputFlags::INLCR, true);
        attrs.set_local_flag(LocalFlags::ECHO, false);
        let fx = fixture(attrs);

        fx.engine.process_input(b"\n").unwrap();

        assert_eq!(drain(&fx.cooked), b"\r");
        assert!(fx.output.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_status_signal_falls_through() {
        let mut attrs = Attributes::cooked();
        attrs.set_control_char(ControlChar::VStatus, 0x14);
        attrs.set_local_flag(LocalFlags::ECHO, false);
        let fx = fixture(attrs);
        let infos = count(&fx, Signal::Info);

        fx.engine.process_input(&[0x14]).unwrap();

        assert_eq!(infos.load(Ordering::SeqCst), 1);
        assert_eq!(drain(&fx.cooked), vec![0x14]);
    }

    #[test]
    fn test_flush_only_when_echoed() {
        let mut attrs = Attributes::cooked();
        attrs.set_local_flag(LocalFlags::ECHO, false);
        let fx = fixture(attrs);

        fx.engine.process_input(b"abc").unwrap();
        assert_eq!(fx.output.flushes.load(Ordering::SeqCst), 0);

        fx.attrs
            .write()
            .unwrap()
            .set_local_flag(LocalFlags::ECHO, true);
        fx.engine.process_input(b"abc").unwrap();
        assert_eq!(fx.output.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(&*fx.output.written.lock().unwrap(), b"abc");
    }

    #[test]
    fn test_handler_change_applies_to_rest_of_chunk() {
        let fx = fixture(Attributes::cooked());
        let attrs = Arc::clone(&fx.attrs);
        fx.signals.handle(
            Signal::Int,
            SignalHandler::custom(move |_| {
                attrs.write().unwrap().set_local_flag(LocalFlags::ISIG, false);
            }),
        );

        fx.engine.process_input(&[0x03, 0x03]).unwrap();

        assert_eq!(drain(&fx.cooked), vec![0x03]);
    }

    #[test]
    fn test_without_echo_suppresses_output() {
        let fx = fixture(Attributes::cooked());
        let engine = LineDiscipline::new(
            Arc::clone(&fx.attrs),
            Arc::clone(&fx.signals),
            pipe(16).0,
            Arc::clone(&fx.output) as Arc<dyn OutputStream>,
        )
        .without_echo();

        engine.process_input(b"hi\n").unwrap();
        assert!(fx.output.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failure_latches() {
        let fx = fixture(Attributes::cooked());
        fx.engine.process_input(b"x").unwrap();
        fx.engine
            .fail(&std::io::Error::new(std::io::ErrorKind::Other, "boom"));

        assert_eq!(fx.cooked.read(None).unwrap(), ReadStatus::Byte(b'x'));
        assert!(fx.cooked.read(None).is_err());
        assert!(fx.cooked.read(None).is_err());
        assert!(fx.engine.is_closed());
        assert!(fx.engine.is_failed());
    }

    #[test]
    fn test_processed_output() {
        let attrs = Arc::new(RwLock::new(Attributes::cooked()));
        let sink = Arc::new(Recorder::default());
        let out = ProcessedOutput::new(
            Arc::clone(&attrs),
            Arc::clone(&sink) as Arc<dyn OutputStream>,
        );

        out.write(b"a\nb").unwrap();
        attrs
            .write()
            .unwrap()
            .set_output_flag(OutputFlags::OPOST, false);
        out.write(b"\n").unwrap();

        assert_eq!(&*sink.written.lock().unwrap(), b"a\r\nb\n");
    }
}
