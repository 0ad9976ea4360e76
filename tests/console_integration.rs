//! Console integration tests.
//!
//! A scripted in-memory console host stands in for a native console.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use ttyline::backend::console::{
    mouse_buttons, ConsoleBackend, ConsoleEvent, ConsoleHost, ConsoleMode, ConsoleMouseEvent,
};
use ttyline::keymap::{vk, ControlKeys, KeyEvent};
use ttyline::protocol::{MouseButton, MouseEventKind, MouseModifiers};
use ttyline::{
    BuiltinLookup, LocalFlags, MouseTracking, ReadStatus, Size, Terminal, TerminalBuilder,
};

const WAIT: Option<Duration> = Some(Duration::from_secs(2));

#[derive(Default)]
struct Script {
    mode: Mutex<ConsoleMode>,
    events: Mutex<VecDeque<ConsoleEvent>>,
    ready: Condvar,
    written: Mutex<String>,
}

#[derive(Clone, Default)]
struct ScriptedConsole(Arc<Script>);

impl ScriptedConsole {
    fn push(&self, event: ConsoleEvent) {
        self.0.events.lock().unwrap().push_back(event);
        self.0.ready.notify_all();
    }

    fn key(&self, virtual_key: u16, character: char, keys: ControlKeys) {
        self.push(ConsoleEvent::Key(KeyEvent::down(virtual_key, character, keys)));
        self.push(ConsoleEvent::Key(KeyEvent::up(virtual_key, character, keys)));
    }

    fn mode(&self) -> ConsoleMode {
        *self.0.mode.lock().unwrap()
    }
}

impl ConsoleHost for ScriptedConsole {
    fn mode(&self) -> ttyline::Result<ConsoleMode> {
        Ok(*self.0.mode.lock().unwrap())
    }

    fn set_mode(&self, mode: ConsoleMode) -> ttyline::Result<()> {
        *self.0.mode.lock().unwrap() = mode;
        Ok(())
    }

    fn size(&self) -> ttyline::Result<Size> {
        Ok(Size::new(100, 40))
    }

    fn read_event(&self, timeout: Duration) -> ttyline::Result<Option<ConsoleEvent>> {
        let events = self.0.events.lock().unwrap();
        let (mut events, _) = self
            .0
            .ready
            .wait_timeout_while(events, timeout, |e| e.is_empty())
            .unwrap();
        Ok(events.pop_front())
    }

    fn write_text(&self, text: &str) -> ttyline::Result<()> {
        self.0.written.lock().unwrap().push_str(text);
        Ok(())
    }
}

fn console() -> (Terminal<ConsoleBackend<ScriptedConsole>>, ScriptedConsole) {
    let host = ScriptedConsole::default();
    *host.0.mode.lock().unwrap() = ConsoleMode::PROCESSED_INPUT | ConsoleMode::ECHO_INPUT;
    let terminal = TerminalBuilder::new()
        .lookup(BuiltinLookup)
        .console(host.clone())
        .unwrap();
    (terminal, host)
}

fn read_n<B: ttyline::terminal::Backend>(terminal: &Terminal<B>, n: usize) -> Vec<u8> {
    (0..n)
        .map(|_| match terminal.read(WAIT).unwrap() {
            ReadStatus::Byte(b) => b,
            other => panic!("expected a byte, got {other:?}"),
        })
        .collect()
}

#[test]
fn test_defaults_to_windows_vtp() {
    let (terminal, _host) = console();
    assert_eq!(terminal.term_type(), "windows-vtp");
    assert_eq!(terminal.size().unwrap(), Size::new(100, 40));
    assert!(terminal.has_mouse_support());
    assert!(!terminal.has_focus_support());
}

#[test]
fn test_typed_keys_arrive_as_tty_bytes() {
    let (terminal, host) = console();
    host.key(0x48, 'h', ControlKeys::empty());
    host.key(vk::LEFT, '\0', ControlKeys::empty());
    host.key(vk::LEFT, '\0', ControlKeys::LEFT_CTRL);
    host.key(0x0D, '\r', ControlKeys::empty());

    assert_eq!(read_n(&terminal, 1 + 3 + 6 + 1), b"h\x1b[D\x1b[1;5D\n");
}

#[test]
fn test_echo_maps_to_console_mode() {
    let (terminal, host) = console();
    assert!(host.mode().contains(ConsoleMode::ECHO_INPUT | ConsoleMode::LINE_INPUT));

    terminal.set_echo(false).unwrap();
    assert!(!host.mode().contains(ConsoleMode::ECHO_INPUT));

    terminal.enter_raw_mode().unwrap();
    let attrs = terminal.attributes().unwrap();
    assert!(!attrs.local_flag(LocalFlags::ICANON));
    assert_eq!(host.mode(), ConsoleMode::WINDOW_INPUT);
}

#[test]
fn test_mouse_events_decode_through_terminal() {
    let (terminal, host) = console();
    assert!(terminal.track_mouse(MouseTracking::Normal).unwrap());
    assert!(host.mode().contains(ConsoleMode::MOUSE_INPUT));
    assert!(host.0.written.lock().unwrap().contains("\x1b[?1000h"));

    host.push(ConsoleEvent::Mouse(ConsoleMouseEvent {
        column: 7,
        row: 2,
        buttons: mouse_buttons::RIGHT,
        control_keys: ControlKeys::SHIFT,
        flags: 0,
    }));
    assert_eq!(read_n(&terminal, 3), b"\x1b[M");
    let event = terminal.read_mouse_event().unwrap();
    assert_eq!(event.kind, MouseEventKind::Pressed);
    assert_eq!(event.button, MouseButton::Button3);
    assert!(event.modifiers.contains(MouseModifiers::SHIFT));
    assert_eq!((event.column, event.row), (7, 2));
}

#[test]
fn test_close_restores_console_mode() {
    let (terminal, host) = console();
    terminal.enter_raw_mode().unwrap();
    terminal.close().unwrap();

    assert_eq!(host.mode(), ConsoleMode::PROCESSED_INPUT | ConsoleMode::ECHO_INPUT);
    assert_eq!(terminal.read(WAIT).unwrap(), ReadStatus::Eof);
}
