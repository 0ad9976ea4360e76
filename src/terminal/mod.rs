//! Terminal facade.
//!
//! [`Terminal`] is the one type applications use. It owns the parts every
//! terminal has (capabilities, signal registry, mouse decoder, the
//! attributes captured at construction) and delegates device work to a
//! [`Backend`].

mod builder;

pub use builder::{TerminalBuilder, TerminalOptions};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use crate::attributes::{Attributes, ControlChar, InputFlags, LocalFlags, Size};
use crate::capability::{BoolCap, Capabilities, NumCap, Param, StrCap};
use crate::error::{Result, TtyError};
use crate::protocol::{
    read_cursor_report, Cursor, CursorPattern, MouseDecoder, MouseEvent, MouseTracking, FOCUS_OFF,
    FOCUS_ON,
};
use crate::signal::{Signal, SignalHandler, SignalRegistry};
use crate::stream::{InputStream, OutputStream, ReadStatus};

/// Device-specific half of a terminal.
///
/// Attribute and size operations go straight to the device; failures are
/// reported unchanged.
pub trait Backend: Send + Sync + 'static {
    /// Current attributes.
    fn attributes(&self) -> Result<Attributes>;

    /// Commit `attrs` to the device.
    fn set_attributes(&self, attrs: &Attributes) -> Result<()>;

    /// Current size.
    fn size(&self) -> Result<Size>;

    /// Resize the terminal.
    fn set_size(&self, size: Size) -> Result<()>;

    /// Application-facing input.
    fn input(&self) -> &dyn InputStream;

    /// Application-facing output.
    fn output(&self) -> &dyn OutputStream;

    /// Whether [`pause`](Self::pause) is supported.
    fn can_pause(&self) -> bool {
        false
    }

    /// Stop background input processing.
    fn pause(&self, _wait: bool) -> Result<()> {
        Err(TtyError::Unsupported("pause"))
    }

    /// Restart background input processing.
    fn resume(&self) -> Result<()> {
        Err(TtyError::Unsupported("resume"))
    }

    /// Whether background input processing is stopped.
    fn paused(&self) -> Result<bool> {
        Ok(false)
    }

    /// Mouse tracking mode changed.
    fn mouse_tracking_changed(&self, _tracking: MouseTracking) -> Result<()> {
        Ok(())
    }

    /// Whether background input processing stopped on an error.
    ///
    /// A failed backend is closed by the terminal at its next operation.
    fn failed(&self) -> bool {
        false
    }

    /// Focus tracking switched on or off.
    fn focus_tracking_changed(&self, _enabled: bool) -> Result<()> {
        Ok(())
    }

    /// Release the device, restoring `original` where that applies.
    fn close(&self, original: &Attributes) -> Result<()>;
}

/// A terminal driven through backend `B`.
pub struct Terminal<B: Backend> {
    name: String,
    term_type: String,
    encoding: String,
    capabilities: Capabilities,
    signals: Arc<SignalRegistry>,
    mouse: Mutex<MouseDecoder>,
    tracking: Mutex<MouseTracking>,
    original: Attributes,
    closed: AtomicBool,
    backend: B,
}

impl<B: Backend> Terminal<B> {
    /// Wrap `backend`, capturing its current attributes for [`close`](Self::close).
    pub fn new(
        options: TerminalOptions,
        capabilities: Capabilities,
        signals: Arc<SignalRegistry>,
        backend: B,
    ) -> Result<Self> {
        let original = backend.attributes()?;
        debug!(
            name = %options.name,
            term_type = %options.term_type,
            "terminal opened"
        );
        Ok(Self {
            name: options.name,
            term_type: options.term_type,
            encoding: options.encoding,
            capabilities,
            signals,
            mouse: Mutex::new(MouseDecoder::new()),
            tracking: Mutex::new(MouseTracking::Off),
            original,
            closed: AtomicBool::new(false),
            backend,
        })
    }

    /// Terminal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Terminal type used for capability lookup.
    pub fn term_type(&self) -> &str {
        &self.term_type
    }

    /// Character encoding name.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The capability tables.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Attributes captured when the terminal was opened.
    pub fn original_attributes(&self) -> &Attributes {
        &self.original
    }

    // --- attributes and size -------------------------------------------

    /// Current attributes.
    pub fn attributes(&self) -> Result<Attributes> {
        self.ensure_open()?;
        self.backend.attributes()
    }

    /// Commit new attributes.
    pub fn set_attributes(&self, attrs: &Attributes) -> Result<()> {
        self.ensure_open()?;
        self.backend.set_attributes(attrs)
    }

    /// Current size.
    pub fn size(&self) -> Result<Size> {
        self.ensure_open()?;
        self.backend.size()
    }

    /// Resize the terminal.
    pub fn set_size(&self, size: Size) -> Result<()> {
        self.ensure_open()?;
        self.backend.set_size(size)
    }

    /// Number of columns.
    pub fn width(&self) -> Result<u16> {
        Ok(self.size()?.columns)
    }

    /// Number of rows.
    pub fn height(&self) -> Result<u16> {
        Ok(self.size()?.rows)
    }

    /// Switch to raw mode and return the attributes in effect before.
    pub fn enter_raw_mode(&self) -> Result<Attributes> {
        let previous = self.attributes()?;
        let mut raw = previous.clone();
        raw.set_local_flag(LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::IEXTEN, false);
        raw.set_input_flag(InputFlags::IXON | InputFlags::ICRNL | InputFlags::INLCR, false);
        raw.set_control_char(ControlChar::VMin, 0);
        raw.set_control_char(ControlChar::VTime, 1);
        self.set_attributes(&raw)?;
        Ok(previous)
    }

    /// Whether input is echoed.
    pub fn echo(&self) -> Result<bool> {
        Ok(self.attributes()?.local_flag(LocalFlags::ECHO))
    }

    /// Turn echo on or off and return the previous setting.
    ///
    /// Nothing is committed when the setting does not change.
    pub fn set_echo(&self, on: bool) -> Result<bool> {
        let mut attrs = self.attributes()?;
        let previous = attrs.local_flag(LocalFlags::ECHO);
        if previous != on {
            attrs.set_local_flag(LocalFlags::ECHO, on);
            self.set_attributes(&attrs)?;
        }
        Ok(previous)
    }

    // --- signals -------------------------------------------------------

    /// Install `handler` for `signal`, returning the previous handler.
    pub fn handle(&self, signal: Signal, handler: SignalHandler) -> SignalHandler {
        self.signals.handle(signal, handler)
    }

    /// Deliver `signal` to its handler.
    pub fn raise(&self, signal: Signal) {
        self.signals.raise(signal);
    }

    // --- capabilities --------------------------------------------------

    /// Whether a boolean capability is present.
    pub fn bool_capability(&self, cap: BoolCap) -> bool {
        self.capabilities.bool(cap)
    }

    /// Value of a numeric capability.
    pub fn num_capability(&self, cap: NumCap) -> Option<i32> {
        self.capabilities.number(cap)
    }

    /// Unexpanded value of a string capability.
    pub fn string_capability(&self, cap: StrCap) -> Option<&str> {
        self.capabilities.string(cap)
    }

    /// Expand `cap` with `params` and write it.
    ///
    /// Returns `false` when the terminal does not have the capability.
    pub fn puts(&self, cap: StrCap, params: &[Param]) -> Result<bool> {
        match self.capabilities.format(cap, params)? {
            Some(bytes) => {
                self.write(&bytes)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- I/O -----------------------------------------------------------

    /// Read one byte. `None` blocks, a zero timeout polls.
    ///
    /// Bytes cooked before a backend failure are still delivered; the
    /// failure itself is reported after them.
    pub fn read(&self, timeout: Option<Duration>) -> Result<ReadStatus> {
        self.close_if_failed();
        self.backend.input().read(timeout)
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&self, timeout: Option<Duration>) -> Result<ReadStatus> {
        self.close_if_failed();
        self.backend.input().peek(timeout)
    }

    /// Read what is available into `buf`, waiting up to `timeout` for the
    /// first byte.
    pub fn read_bytes(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<Option<usize>> {
        self.close_if_failed();
        self.backend.input().read_bytes(buf, timeout)
    }

    /// Write raw bytes.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.backend.output().write(bytes)
    }

    /// Write a string.
    pub fn write_str(&self, text: &str) -> Result<()> {
        self.write(text.as_bytes())
    }

    /// Flush pending output.
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        self.backend.output().flush()
    }

    // --- protocols -----------------------------------------------------

    /// Query the cursor position.
    ///
    /// Input that arrives before the report is passed to `discard`.
    /// Returns `Ok(None)` when the terminal cannot report its position.
    pub fn cursor_position(&self, discard: Option<&mut dyn FnMut(u8)>) -> Result<Option<Cursor>> {
        let (Some(report), Some(_)) = (
            self.capabilities.string(StrCap::User6),
            self.capabilities.string(StrCap::User7),
        ) else {
            return Ok(None);
        };
        let pattern = CursorPattern::compile(report)?;
        self.puts(StrCap::User7, &[])?;
        self.flush()?;
        read_cursor_report(self.backend.input(), &pattern, discard).map(Some)
    }

    /// Whether the terminal reports mouse events.
    pub fn has_mouse_support(&self) -> bool {
        self.capabilities.string(StrCap::KeyMouse).is_some()
    }

    /// Current mouse tracking mode.
    pub fn mouse_tracking(&self) -> Result<MouseTracking> {
        let tracking = self.tracking.lock().map_err(|_| TtyError::LockPoisoned)?;
        Ok(*tracking)
    }

    /// Switch mouse tracking mode.
    ///
    /// Returns `false` without writing anything when mouse events are not
    /// supported.
    pub fn track_mouse(&self, tracking: MouseTracking) -> Result<bool> {
        if !self.has_mouse_support() {
            return Ok(false);
        }
        let mut current = self.tracking.lock().map_err(|_| TtyError::LockPoisoned)?;
        self.write_str(tracking.escape())?;
        self.flush()?;
        *current = tracking;
        self.backend.mouse_tracking_changed(tracking)?;
        Ok(true)
    }

    /// Read one mouse report from the input, after its `\E[M` prefix.
    pub fn read_mouse_event(&self) -> Result<MouseEvent> {
        let input = self.backend.input();
        self.read_mouse_event_with(|| loop {
            match input.read(None)? {
                ReadStatus::Byte(b) => return Ok(Some(b)),
                ReadStatus::Eof => return Ok(None),
                ReadStatus::Timeout => continue,
            }
        })
    }

    /// Decode one mouse report from bytes supplied by `next_byte`.
    pub fn read_mouse_event_with<F>(&self, next_byte: F) -> Result<MouseEvent>
    where
        F: FnMut() -> Result<Option<u8>>,
    {
        let mut decoder = self.mouse.lock().map_err(|_| TtyError::LockPoisoned)?;
        decoder.read(next_byte)
    }

    /// Whether the terminal reports focus changes.
    pub fn has_focus_support(&self) -> bool {
        self.term_type.starts_with("xterm")
    }

    /// Switch focus tracking on or off.
    ///
    /// Returns `false` when focus reports are not supported.
    pub fn track_focus(&self, enabled: bool) -> Result<bool> {
        if !self.has_focus_support() {
            return Ok(false);
        }
        self.write_str(if enabled { FOCUS_ON } else { FOCUS_OFF })?;
        self.flush()?;
        self.backend.focus_tracking_changed(enabled)?;
        Ok(true)
    }

    // --- lifecycle -----------------------------------------------------

    /// Whether background input processing can be paused.
    pub fn can_pause(&self) -> bool {
        self.backend.can_pause()
    }

    /// Stop background input processing.
    pub fn pause(&self, wait: bool) -> Result<()> {
        self.backend.pause(wait)
    }

    /// Restart background input processing.
    pub fn resume(&self) -> Result<()> {
        self.ensure_open()?;
        self.backend.resume()
    }

    /// Whether background input processing is stopped.
    pub fn paused(&self) -> Result<bool> {
        self.backend.paused()
    }

    /// Whether the terminal is closed, either by [`close`](Self::close) or
    /// because its backend failed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.backend.failed()
    }

    /// Close a terminal whose backend failed.
    fn close_if_failed(&self) {
        if self.closed.load(Ordering::SeqCst) || !self.backend.failed() {
            return;
        }
        warn!(name = %self.name, "backend failed, closing terminal");
        if let Err(e) = self.close() {
            warn!(name = %self.name, "error closing failed terminal: {}", e);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        self.close_if_failed();
        if self.closed.load(Ordering::SeqCst) {
            return Err(TtyError::Closed);
        }
        Ok(())
    }

    /// Close the terminal.
    ///
    /// Only the first call does anything: it flushes output and lets the
    /// backend stop its pumps and restore the original attributes.
    pub fn close(&self) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }
        if let Err(e) = self.backend.output().flush() {
            debug!(name = %self.name, "flush on close failed: {}", e);
        }
        self.backend.close(&self.original)?;
        debug!(name = %self.name, "terminal closed");
        Ok(())
    }
}

impl<B: Backend> Drop for Terminal<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(name = %self.name, "error closing terminal: {}", e);
        }
    }
}

impl<B: Backend> std::fmt::Debug for Terminal<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("name", &self.name)
            .field("term_type", &self.term_type)
            .field("encoding", &self.encoding)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{BuiltinLookup, CapabilityLookup};
    use crate::stream::{pipe, PipeReader, PipeWriter};
    use std::sync::atomic::AtomicUsize;
    use std::sync::RwLock;

    /// In-memory backend counting commits.
    struct MemoryBackend {
        attrs: RwLock<Attributes>,
        sets: AtomicUsize,
        closes: AtomicUsize,
        failed: AtomicBool,
        input: PipeReader,
        output: PipeWriter,
        tracking: Mutex<Vec<MouseTracking>>,
    }

    struct Harness {
        terminal: Terminal<MemoryBackend>,
        input: PipeWriter,
        output: PipeReader,
    }

    fn harness(term_type: &str) -> Harness {
        let (input_tx, input_rx) = pipe(256);
        let (output_tx, output_rx) = pipe(256);
        let backend = MemoryBackend {
            attrs: RwLock::new(Attributes::cooked()),
            sets: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            input: input_rx,
            output: output_tx,
            tracking: Mutex::new(Vec::new()),
        };
        let options = TerminalOptions {
            name: "test".into(),
            term_type: term_type.into(),
            encoding: "UTF-8".into(),
        };
        let terminal = Terminal::new(
            options,
            BuiltinLookup.lookup(term_type),
            Arc::new(SignalRegistry::default()),
            backend,
        )
        .unwrap();
        Harness {
            terminal,
            input: input_tx,
            output: output_rx,
        }
    }

    impl Backend for MemoryBackend {
        fn attributes(&self) -> Result<Attributes> {
            Ok(self.attrs.read().unwrap().clone())
        }

        fn set_attributes(&self, attrs: &Attributes) -> Result<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            *self.attrs.write().unwrap() = attrs.clone();
            Ok(())
        }

        fn size(&self) -> Result<Size> {
            Ok(Size::new(100, 40))
        }

        fn set_size(&self, _size: Size) -> Result<()> {
            Err(TtyError::Unsupported("set_size"))
        }

        fn input(&self) -> &dyn InputStream {
            &self.input
        }

        fn output(&self) -> &dyn OutputStream {
            &self.output
        }

        fn mouse_tracking_changed(&self, tracking: MouseTracking) -> Result<()> {
            self.tracking.lock().unwrap().push(tracking);
            Ok(())
        }

        fn failed(&self) -> bool {
            self.failed.load(Ordering::SeqCst)
        }

        fn close(&self, original: &Attributes) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            *self.attrs.write().unwrap() = original.clone();
            Ok(())
        }
    }

    fn drain(reader: &PipeReader) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 256];
        while let Ok(Some(n)) = reader.read_available(&mut buf, Some(Duration::ZERO)) {
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn test_set_echo_is_idempotent() {
        let h = harness("xterm");
        assert!(h.terminal.echo().unwrap());

        assert!(h.terminal.set_echo(true).unwrap());
        assert_eq!(h.terminal.backend().sets.load(Ordering::SeqCst), 0);

        assert!(h.terminal.set_echo(false).unwrap());
        assert!(!h.terminal.set_echo(false).unwrap());
        assert_eq!(h.terminal.backend().sets.load(Ordering::SeqCst), 1);
        assert!(!h.terminal.echo().unwrap());
    }

    #[test]
    fn test_enter_raw_mode() {
        let h = harness("xterm");
        let previous = h.terminal.enter_raw_mode().unwrap();
        assert_eq!(previous, Attributes::cooked());

        let raw = h.terminal.attributes().unwrap();
        assert!(!raw.local_flag(LocalFlags::ICANON));
        assert!(!raw.local_flag(LocalFlags::ECHO));
        assert!(!raw.input_flag(InputFlags::ICRNL));
        assert!(raw.local_flag(LocalFlags::ISIG));
        assert_eq!(raw.control_char(ControlChar::VMin), 0);
        assert_eq!(raw.control_char(ControlChar::VTime), 1);
    }

    #[test]
    fn test_close_is_idempotent_and_restores() {
        let h = harness("xterm");
        h.terminal.enter_raw_mode().unwrap();
        h.terminal.close().unwrap();
        h.terminal.close().unwrap();

        assert!(h.terminal.is_closed());
        assert_eq!(h.terminal.backend().closes.load(Ordering::SeqCst), 1);
        assert_eq!(*h.terminal.backend().attrs.read().unwrap(), Attributes::cooked());
        assert!(matches!(h.terminal.write(b"x"), Err(TtyError::Closed)));
        assert!(matches!(h.terminal.attributes(), Err(TtyError::Closed)));
    }

    #[test]
    fn test_backend_failure_forces_close() {
        let h = harness("xterm");
        h.terminal.enter_raw_mode().unwrap();
        h.terminal.backend().failed.store(true, Ordering::SeqCst);
        assert!(h.terminal.is_closed());

        assert!(matches!(h.terminal.write(b"x"), Err(TtyError::Closed)));
        assert!(matches!(h.terminal.set_echo(true), Err(TtyError::Closed)));
        assert!(matches!(h.terminal.size(), Err(TtyError::Closed)));
        assert!(matches!(h.terminal.resume(), Err(TtyError::Closed)));
        assert_eq!(h.terminal.backend().closes.load(Ordering::SeqCst), 1);
        assert_eq!(*h.terminal.backend().attrs.read().unwrap(), Attributes::cooked());
    }

    #[test]
    fn test_puts_and_missing_capability() {
        let h = harness("xterm");
        let params = [Param::from(2), Param::from(4)];
        assert!(h.terminal.puts(StrCap::CursorAddress, &params).unwrap());
        assert_eq!(drain(&h.output), b"\x1b[3;5H");

        let dumb = harness("dumb");
        assert!(!dumb.terminal.puts(StrCap::CursorAddress, &params).unwrap());
        assert!(drain(&dumb.output).is_empty());
    }

    #[test]
    fn test_cursor_position() {
        let h = harness("xterm");
        h.input.write(b"q\x1b[5;12R").unwrap();

        let mut junk = Vec::new();
        let mut discard = |b: u8| junk.push(b);
        let cursor = h.terminal.cursor_position(Some(&mut discard)).unwrap();

        assert_eq!(cursor, Some(Cursor::new(11, 4)));
        assert_eq!(junk, b"q");
        assert_eq!(drain(&h.output), b"\x1b[6n");
    }

    #[test]
    fn test_cursor_position_unsupported() {
        let h = harness("dumb");
        assert_eq!(h.terminal.cursor_position(None).unwrap(), None);
    }

    #[test]
    fn test_track_mouse() {
        let h = harness("xterm");
        assert!(h.terminal.has_mouse_support());
        assert!(h.terminal.track_mouse(MouseTracking::Button).unwrap());
        assert_eq!(drain(&h.output), b"\x1b[?1002h");
        assert_eq!(h.terminal.mouse_tracking().unwrap(), MouseTracking::Button);
        assert_eq!(
            *h.terminal.backend().tracking.lock().unwrap(),
            vec![MouseTracking::Button]
        );

        let dumb = harness("dumb");
        assert!(!dumb.terminal.track_mouse(MouseTracking::Any).unwrap());
    }

    #[test]
    fn test_read_mouse_event() {
        let h = harness("xterm");
        h.input.write(&[32, 33 + 3, 33 + 7]).unwrap();
        let event = h.terminal.read_mouse_event().unwrap();
        assert_eq!((event.column, event.row), (3, 7));
    }

    #[test]
    fn test_focus_support_by_type() {
        let h = harness("xterm-256color");
        assert!(h.terminal.track_focus(true).unwrap());
        assert_eq!(drain(&h.output), FOCUS_ON.as_bytes());

        let screen = harness("screen");
        assert!(!screen.terminal.has_focus_support());
        assert!(!screen.terminal.track_focus(true).unwrap());
    }

    #[test]
    fn test_size_and_pause_defaults() {
        let h = harness("xterm");
        assert_eq!(h.terminal.width().unwrap(), 100);
        assert_eq!(h.terminal.height().unwrap(), 40);
        assert!(!h.terminal.can_pause());
        assert!(matches!(h.terminal.pause(true), Err(TtyError::Unsupported(_))));
        assert!(!h.terminal.paused().unwrap());
    }

    #[test]
    fn test_handle_returns_previous() {
        let h = harness("xterm");
        let previous = h.terminal.handle(Signal::Int, SignalHandler::Ignore);
        assert!(previous.is_default());
        assert!(h.terminal.handle(Signal::Int, SignalHandler::Default).is_ignore());
    }
}
