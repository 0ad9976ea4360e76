//! Native console backend.
//!
//! Consoles have no termios. Attributes are kept in memory and mapped onto
//! the host's console mode bits on every change, and key events are turned
//! into the bytes a tty would have delivered. Those bytes then go through
//! the same signal and CR/NL handling as every other backend; the console
//! echoes by itself, so the engine never does.

#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use self::windows::WindowsConsole;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use bitflags::bitflags;
use tracing::{debug, trace, warn};

use super::{latched_error, BackendSettings};
use crate::attributes::{Attributes, LocalFlags, Size};
use crate::capability::Capabilities;
use crate::discipline::LineDiscipline;
use crate::error::{Result, TtyError};
use crate::keymap::{translate_key, ControlKeys, KeyEvent};
use crate::protocol::{MouseTracking, FOCUS_IN, FOCUS_OUT};
use crate::pump::{Pump, PumpWork, Step};
use crate::signal::{Signal, SignalRegistry};
use crate::stream::{pipe, InputStream, OutputStream, PipeReader, PipeWriter};
use crate::terminal::Backend;

/// Terminal type assumed for consoles when none is configured.
pub const DEFAULT_TYPE: &str = "windows-vtp";

bitflags! {
    /// Console input mode bits (`SetConsoleMode` on the input handle).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConsoleMode: u32 {
        /// System handles Ctrl-C.
        const PROCESSED_INPUT = 0x0001;
        /// Reads return whole lines.
        const LINE_INPUT      = 0x0002;
        /// Typed characters are echoed.
        const ECHO_INPUT      = 0x0004;
        /// Buffer size changes are reported.
        const WINDOW_INPUT    = 0x0008;
        /// Mouse events are reported.
        const MOUSE_INPUT     = 0x0010;
        /// Required to change quick-edit and insert modes.
        const EXTENDED_FLAGS  = 0x0080;
    }
}

/// Console mode matching `attrs` and the mouse tracking state.
pub fn console_mode(attrs: &Attributes, tracking: MouseTracking) -> ConsoleMode {
    let mut mode = ConsoleMode::WINDOW_INPUT;
    mode.set(ConsoleMode::ECHO_INPUT, attrs.local_flag(LocalFlags::ECHO));
    mode.set(ConsoleMode::LINE_INPUT, attrs.local_flag(LocalFlags::ICANON));
    if tracking != MouseTracking::Off {
        // Quick-edit swallows mouse events; EXTENDED_FLAGS alone clears it.
        mode |= ConsoleMode::MOUSE_INPUT | ConsoleMode::EXTENDED_FLAGS;
    }
    mode
}

/// Mouse `flags` bits.
pub mod mouse_flags {
    /// Pointer moved.
    pub const MOVED: u32 = 0x0001;
    /// Second click of a double click.
    pub const DOUBLE_CLICK: u32 = 0x0002;
    /// Vertical wheel turned.
    pub const WHEELED: u32 = 0x0004;
    /// Horizontal wheel turned.
    pub const HWHEELED: u32 = 0x0008;
}

/// Mouse `buttons` bits.
pub mod mouse_buttons {
    /// Left button.
    pub const LEFT: u32 = 0x0001;
    /// Right button.
    pub const RIGHT: u32 = 0x0002;
    /// Middle button.
    pub const MIDDLE: u32 = 0x0004;
}

/// A native mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleMouseEvent {
    /// Zero-based column.
    pub column: u16,
    /// Zero-based row.
    pub row: u16,
    /// Held buttons; the high word carries the wheel delta.
    pub buttons: u32,
    /// Modifier keys.
    pub control_keys: ControlKeys,
    /// Event kind bits.
    pub flags: u32,
}

/// An event read from a console host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// Key press or release.
    Key(KeyEvent),
    /// Console buffer resized.
    Resize,
    /// Mouse activity.
    Mouse(ConsoleMouseEvent),
    /// Focus gained (`true`) or lost.
    Focus(bool),
}

/// The native surface of a console.
pub trait ConsoleHost: Send + Sync + 'static {
    /// Current input mode.
    fn mode(&self) -> Result<ConsoleMode>;

    /// Replace the input mode.
    fn set_mode(&self, mode: ConsoleMode) -> Result<()>;

    /// Visible window size.
    fn size(&self) -> Result<Size>;

    /// Wait up to `timeout` for the next input event.
    fn read_event(&self, timeout: Duration) -> Result<Option<ConsoleEvent>>;

    /// Write text to the console.
    fn write_text(&self, text: &str) -> Result<()>;
}

/// X10 mouse report for a native mouse event, if `tracking` wants it.
pub fn mouse_report(event: &ConsoleMouseEvent, tracking: MouseTracking) -> Option<Vec<u8>> {
    let moved = event.flags & mouse_flags::MOVED != 0;
    let held = event.buttons & 0xffff;
    match tracking {
        MouseTracking::Off => return None,
        MouseTracking::Normal if moved => return None,
        MouseTracking::Button if moved && held == 0 => return None,
        _ => {}
    }
    if event.flags & mouse_flags::HWHEELED != 0 {
        return None;
    }

    let mut cb: u32 = if event.flags & mouse_flags::WHEELED != 0 {
        // A negative delta in the high word scrolls down.
        64 | u32::from(event.buttons & 0x8000_0000 != 0)
    } else {
        let code = if held & mouse_buttons::LEFT != 0 {
            0
        } else if held & mouse_buttons::MIDDLE != 0 {
            1
        } else if held & mouse_buttons::RIGHT != 0 {
            2
        } else {
            3
        };
        if moved {
            code | 32
        } else {
            code
        }
    };
    let keys = event.control_keys;
    if keys.shift() {
        cb |= 4;
    }
    if keys.alt() {
        cb |= 8;
    }
    if keys.ctrl() {
        cb |= 16;
    }

    let mut report = String::from("\x1b[M");
    for value in [32 + cb, 33 + u32::from(event.column), 33 + u32::from(event.row)] {
        report.push(char::from_u32(value)?);
    }
    Some(report.into_bytes())
}

#[derive(Debug)]
struct ConsoleState {
    size: RwLock<Size>,
    tracking: Mutex<MouseTracking>,
    focus: AtomicBool,
}

/// Writes to the host, holding back an incomplete UTF-8 sequence until its
/// remaining bytes arrive.
struct HostOutput<H: ConsoleHost> {
    host: Arc<H>,
    pending: Mutex<Vec<u8>>,
}

impl<H: ConsoleHost> OutputStream for HostOutput<H> {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut pending = self.pending.lock().map_err(|_| TtyError::LockPoisoned)?;
        pending.extend_from_slice(bytes);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&pending) {
                Ok(s) => {
                    text.push_str(s);
                    pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            pending.drain(..valid + bad);
                        }
                        None => {
                            pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        if !text.is_empty() {
            self.host.write_text(&text)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Polls host events into the cooked pipe.
struct ConsolePoller<H: ConsoleHost> {
    host: Arc<H>,
    engine: Arc<LineDiscipline>,
    cooked: PipeWriter,
    capabilities: Capabilities,
    signals: Arc<SignalRegistry>,
    state: Arc<ConsoleState>,
    original_mode: ConsoleMode,
    poll: Duration,
}

impl<H: ConsoleHost> ConsolePoller<H> {
    fn dispatch(&self, event: ConsoleEvent) -> Result<()> {
        match event {
            ConsoleEvent::Key(key) => {
                let bytes = translate_key(&key, &self.capabilities);
                if !bytes.is_empty() {
                    trace!(virtual_key = key.virtual_key, "key -> {} bytes", bytes.len());
                    self.engine.process_input(&bytes)?;
                }
            }
            ConsoleEvent::Resize => {
                let size = self.host.size()?;
                *self.state.size.write().map_err(|_| TtyError::LockPoisoned)? = size;
                debug!(columns = size.columns, rows = size.rows, "console resized");
                self.signals.raise(Signal::Winch);
            }
            ConsoleEvent::Mouse(mouse) => {
                let tracking = *self.state.tracking.lock().map_err(|_| TtyError::LockPoisoned)?;
                if let Some(report) = mouse_report(&mouse, tracking) {
                    self.cooked.write(&report)?;
                }
            }
            ConsoleEvent::Focus(gained) => {
                if self.state.focus.load(Ordering::SeqCst) {
                    self.cooked.write(if gained { FOCUS_IN } else { FOCUS_OUT })?;
                }
            }
        }
        Ok(())
    }
}

impl<H: ConsoleHost> PumpWork for ConsolePoller<H> {
    fn step(&mut self) -> Result<Step> {
        if self.engine.is_closed() {
            return Ok(Step::Done);
        }
        if let Some(event) = self.host.read_event(self.poll)? {
            self.dispatch(event)?;
        }
        Ok(Step::Continue)
    }

    fn finished(&mut self, error: Option<&TtyError>) {
        match error {
            Some(e) => {
                if let Err(err) = self.host.set_mode(self.original_mode) {
                    warn!("restoring console mode after failure: {}", err);
                }
                self.engine.fail(&latched_error(e));
            }
            None => self.engine.close(),
        }
    }
}

/// Backend over a [`ConsoleHost`].
pub struct ConsoleBackend<H: ConsoleHost> {
    host: Arc<H>,
    attributes: Arc<RwLock<Attributes>>,
    state: Arc<ConsoleState>,
    original_mode: ConsoleMode,
    cooked: PipeReader,
    engine: Arc<LineDiscipline>,
    output: Arc<HostOutput<H>>,
    poller: Pump<ConsolePoller<H>>,
}

impl<H: ConsoleHost> ConsoleBackend<H> {
    /// Take over `host`, remembering its mode for [`close`](Backend::close).
    ///
    /// The event poller is started before returning.
    pub fn new(
        host: H,
        signals: Arc<SignalRegistry>,
        capabilities: Capabilities,
        settings: &BackendSettings,
    ) -> Result<Self> {
        let host = Arc::new(host);
        let original_mode = host.mode()?;
        let attributes = Arc::new(RwLock::new(Attributes::cooked()));
        let state = Arc::new(ConsoleState {
            size: RwLock::new(host.size()?),
            tracking: Mutex::new(MouseTracking::Off),
            focus: AtomicBool::new(false),
        });
        let output = Arc::new(HostOutput {
            host: Arc::clone(&host),
            pending: Mutex::new(Vec::new()),
        });
        let (cooked_tx, cooked_rx) = pipe(settings.pipe_capacity);
        let engine = Arc::new(
            LineDiscipline::new(
                Arc::clone(&attributes),
                Arc::clone(&signals),
                cooked_tx.clone(),
                output.clone(),
            )
            .without_echo(),
        );
        let poller = Pump::new(
            "console",
            ConsolePoller {
                host: Arc::clone(&host),
                engine: Arc::clone(&engine),
                cooked: cooked_tx,
                capabilities,
                signals,
                state: Arc::clone(&state),
                original_mode,
                poll: settings.poll_interval,
            },
            settings.join_timeout,
        );

        let backend = Self {
            host,
            attributes,
            state,
            original_mode,
            cooked: cooked_rx,
            engine,
            output,
            poller,
        };
        backend.update_mode()?;
        backend.poller.resume()?;
        debug!(?original_mode, "console backend started");
        Ok(backend)
    }

    /// The console host.
    pub fn host(&self) -> &H {
        &self.host
    }

    fn update_mode(&self) -> Result<()> {
        let attrs = self.attributes.read().map_err(|_| TtyError::LockPoisoned)?;
        let tracking = *self.state.tracking.lock().map_err(|_| TtyError::LockPoisoned)?;
        let mode = console_mode(&attrs, tracking);
        trace!(?mode, "updating console mode");
        self.host.set_mode(mode)
    }
}

impl<H: ConsoleHost> Backend for ConsoleBackend<H> {
    fn attributes(&self) -> Result<Attributes> {
        let attrs = self.attributes.read().map_err(|_| TtyError::LockPoisoned)?;
        Ok(attrs.clone())
    }

    fn set_attributes(&self, attrs: &Attributes) -> Result<()> {
        {
            let mut current = self.attributes.write().map_err(|_| TtyError::LockPoisoned)?;
            *current = attrs.clone();
        }
        self.update_mode()
    }

    fn size(&self) -> Result<Size> {
        let size = self.state.size.read().map_err(|_| TtyError::LockPoisoned)?;
        Ok(*size)
    }

    fn set_size(&self, _size: Size) -> Result<()> {
        Err(TtyError::Unsupported("set_size on a console"))
    }

    fn input(&self) -> &dyn InputStream {
        &self.cooked
    }

    fn output(&self) -> &dyn OutputStream {
        self.output.as_ref()
    }

    fn can_pause(&self) -> bool {
        true
    }

    fn pause(&self, wait: bool) -> Result<()> {
        self.poller.pause(wait)
    }

    fn resume(&self) -> Result<()> {
        if self.engine.is_closed() {
            return Err(TtyError::Closed);
        }
        self.poller.resume()
    }

    fn paused(&self) -> Result<bool> {
        self.poller.paused()
    }

    fn mouse_tracking_changed(&self, tracking: MouseTracking) -> Result<()> {
        *self.state.tracking.lock().map_err(|_| TtyError::LockPoisoned)? = tracking;
        self.update_mode()
    }

    fn focus_tracking_changed(&self, enabled: bool) -> Result<()> {
        self.state.focus.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn failed(&self) -> bool {
        self.engine.is_failed()
    }

    fn close(&self, _original: &Attributes) -> Result<()> {
        self.poller.close()?;
        self.engine.close();
        self.host.set_mode(self.original_mode)?;
        debug!("console backend closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::InputFlags;
    use crate::capability::{BuiltinLookup, CapabilityLookup};
    use crate::signal::SignalHandler;
    use crate::stream::ReadStatus;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Condvar;

    const WAIT: Option<Duration> = Some(Duration::from_secs(2));

    #[derive(Default)]
    struct FakeConsole {
        mode: Mutex<ConsoleMode>,
        modes: Mutex<Vec<ConsoleMode>>,
        events: Mutex<VecDeque<ConsoleEvent>>,
        ready: Condvar,
        size: Mutex<Size>,
        written: Mutex<String>,
        broken: AtomicBool,
    }

    impl FakeConsole {
        fn push(&self, event: ConsoleEvent) {
            self.events.lock().unwrap().push_back(event);
            self.ready.notify_all();
        }
    }

    impl ConsoleHost for Arc<FakeConsole> {
        fn mode(&self) -> Result<ConsoleMode> {
            Ok(*self.mode.lock().unwrap())
        }

        fn set_mode(&self, mode: ConsoleMode) -> Result<()> {
            *self.mode.lock().unwrap() = mode;
            self.modes.lock().unwrap().push(mode);
            Ok(())
        }

        fn size(&self) -> Result<Size> {
            Ok(*self.size.lock().unwrap())
        }

        fn read_event(&self, timeout: Duration) -> Result<Option<ConsoleEvent>> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
            }
            let events = self.events.lock().unwrap();
            let (mut events, _) = self
                .ready
                .wait_timeout_while(events, timeout, |e| e.is_empty())
                .unwrap();
            Ok(events.pop_front())
        }

        fn write_text(&self, text: &str) -> Result<()> {
            self.written.lock().unwrap().push_str(text);
            Ok(())
        }
    }

    fn settings() -> BackendSettings {
        BackendSettings {
            pipe_capacity: 256,
            poll_interval: Duration::from_millis(5),
            join_timeout: Duration::from_secs(2),
        }
    }

    fn backend() -> (ConsoleBackend<Arc<FakeConsole>>, Arc<FakeConsole>, Arc<SignalRegistry>) {
        let console = Arc::new(FakeConsole::default());
        *console.mode.lock().unwrap() = ConsoleMode::PROCESSED_INPUT | ConsoleMode::LINE_INPUT;
        *console.size.lock().unwrap() = Size::new(120, 30);
        let signals = Arc::new(SignalRegistry::default());
        let backend = ConsoleBackend::new(
            Arc::clone(&console),
            Arc::clone(&signals),
            BuiltinLookup.lookup(DEFAULT_TYPE),
            &settings(),
        )
        .unwrap();
        (backend, console, signals)
    }

    fn key(vk: u16, ch: char) -> ConsoleEvent {
        ConsoleEvent::Key(KeyEvent::down(vk, ch, ControlKeys::empty()))
    }

    fn read_n(backend: &ConsoleBackend<Arc<FakeConsole>>, n: usize) -> Vec<u8> {
        (0..n)
            .map(|_| match backend.input().read(WAIT).unwrap() {
                ReadStatus::Byte(b) => b,
                other => panic!("expected a byte, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_console_mode_derivation() {
        let mut attrs = Attributes::cooked();
        assert_eq!(
            console_mode(&attrs, MouseTracking::Off),
            ConsoleMode::WINDOW_INPUT | ConsoleMode::ECHO_INPUT | ConsoleMode::LINE_INPUT
        );

        attrs.set_local_flag(LocalFlags::ECHO | LocalFlags::ICANON, false);
        assert_eq!(console_mode(&attrs, MouseTracking::Off), ConsoleMode::WINDOW_INPUT);
        assert_eq!(
            console_mode(&attrs, MouseTracking::Normal),
            ConsoleMode::WINDOW_INPUT | ConsoleMode::MOUSE_INPUT | ConsoleMode::EXTENDED_FLAGS
        );
    }

    #[test]
    fn test_mode_follows_attributes_and_is_restored() {
        let (backend, console, _) = backend();
        assert_eq!(
            *console.mode.lock().unwrap(),
            ConsoleMode::WINDOW_INPUT | ConsoleMode::ECHO_INPUT | ConsoleMode::LINE_INPUT
        );

        let mut attrs = backend.attributes().unwrap();
        attrs.set_local_flag(LocalFlags::ICANON, false);
        backend.set_attributes(&attrs).unwrap();
        assert!(!console.mode.lock().unwrap().contains(ConsoleMode::LINE_INPUT));

        backend.mouse_tracking_changed(MouseTracking::Any).unwrap();
        assert!(console.mode.lock().unwrap().contains(ConsoleMode::MOUSE_INPUT));

        backend.close(&Attributes::cooked()).unwrap();
        assert_eq!(
            *console.mode.lock().unwrap(),
            ConsoleMode::PROCESSED_INPUT | ConsoleMode::LINE_INPUT
        );
    }

    #[test]
    fn test_read_failure_restores_mode() {
        let (backend, console, _) = backend();
        console.broken.store(true, Ordering::SeqCst);

        match backend.input().read(WAIT).unwrap_err() {
            TtyError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other}"),
        }
        assert!(backend.failed());
        assert_eq!(
            *console.mode.lock().unwrap(),
            ConsoleMode::PROCESSED_INPUT | ConsoleMode::LINE_INPUT
        );
    }

    #[test]
    fn test_keys_become_cooked_bytes() {
        let (backend, console, _) = backend();
        console.push(key(0x41, 'a'));
        console.push(key(0x26, '\0'));
        console.push(key(0x0D, '\r'));
        assert_eq!(read_n(&backend, 5), b"a\x1b[A\n");
        assert!(console.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ctrl_c_raises_interrupt() {
        let (backend, console, signals) = backend();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        signals.handle(
            Signal::Int,
            SignalHandler::custom(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        console.push(ConsoleEvent::Key(KeyEvent::down(0x43, '\x03', ControlKeys::LEFT_CTRL)));
        console.push(key(0x42, 'b'));
        assert_eq!(read_n(&backend, 1), b"b");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cr_follows_input_flags() {
        let (backend, console, _) = backend();
        let mut attrs = backend.attributes().unwrap();
        attrs.set_input_flag(InputFlags::ICRNL, false);
        backend.set_attributes(&attrs).unwrap();

        console.push(key(0x0D, '\r'));
        assert_eq!(read_n(&backend, 1), b"\r");
    }

    #[test]
    fn test_resize_updates_size_and_raises_winch() {
        let (backend, console, signals) = backend();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        signals.handle(
            Signal::Winch,
            SignalHandler::custom(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        *console.size.lock().unwrap() = Size::new(90, 20);
        console.push(ConsoleEvent::Resize);
        console.push(key(0x41, 'a'));
        read_n(&backend, 1);

        assert_eq!(backend.size().unwrap(), Size::new(90, 20));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(backend.set_size(Size::new(1, 1)).is_err());
    }

    #[test]
    fn test_mouse_reports_follow_tracking() {
        let (backend, console, _) = backend();
        let press = ConsoleMouseEvent {
            column: 4,
            row: 9,
            buttons: mouse_buttons::LEFT,
            control_keys: ControlKeys::empty(),
            flags: 0,
        };

        console.push(ConsoleEvent::Mouse(press));
        console.push(key(0x41, 'a'));
        assert_eq!(read_n(&backend, 1), b"a");

        backend.mouse_tracking_changed(MouseTracking::Normal).unwrap();
        console.push(ConsoleEvent::Mouse(press));
        assert_eq!(read_n(&backend, 6), b"\x1b[M %*");
    }

    #[test]
    fn test_focus_reports_when_enabled() {
        let (backend, console, _) = backend();
        console.push(ConsoleEvent::Focus(true));
        console.push(key(0x41, 'a'));
        assert_eq!(read_n(&backend, 1), b"a");

        backend.focus_tracking_changed(true).unwrap();
        console.push(ConsoleEvent::Focus(false));
        assert_eq!(read_n(&backend, 3), FOCUS_OUT);
    }

    #[test]
    fn test_mouse_report_filtering() {
        let moved = ConsoleMouseEvent {
            column: 0,
            row: 0,
            buttons: 0,
            control_keys: ControlKeys::empty(),
            flags: mouse_flags::MOVED,
        };
        assert_eq!(mouse_report(&moved, MouseTracking::Off), None);
        assert_eq!(mouse_report(&moved, MouseTracking::Normal), None);
        assert_eq!(mouse_report(&moved, MouseTracking::Button), None);
        assert_eq!(mouse_report(&moved, MouseTracking::Any), Some(b"\x1b[MC!!".to_vec()));

        let drag = ConsoleMouseEvent {
            buttons: mouse_buttons::RIGHT,
            ..moved
        };
        assert_eq!(mouse_report(&drag, MouseTracking::Button), Some(b"\x1b[MB!!".to_vec()));

        let wheel_down = ConsoleMouseEvent {
            buttons: 0xff88_0000,
            flags: mouse_flags::WHEELED,
            control_keys: ControlKeys::LEFT_CTRL,
            ..moved
        };
        assert_eq!(
            mouse_report(&wheel_down, MouseTracking::Normal),
            Some(vec![0x1b, b'[', b'M', 32 + 64 + 1 + 16, 33, 33])
        );

        let sideways = ConsoleMouseEvent {
            flags: mouse_flags::HWHEELED,
            ..moved
        };
        assert_eq!(mouse_report(&sideways, MouseTracking::Any), None);
    }

    #[test]
    fn test_output_buffers_split_utf8() {
        let (backend, console, _) = backend();
        let bytes = "é!".as_bytes();
        backend.output().write(&bytes[..1]).unwrap();
        assert!(console.written.lock().unwrap().is_empty());
        backend.output().write(&bytes[1..]).unwrap();
        assert_eq!(*console.written.lock().unwrap(), "é!");

        backend.output().write(b"\xffok").unwrap();
        assert!(console.written.lock().unwrap().ends_with("\u{fffd}ok"));
    }
}
