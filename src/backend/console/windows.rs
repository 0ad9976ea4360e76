//! [`ConsoleHost`] over the process's own Windows console.

use std::ffi::c_void;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, trace};
use windows::Win32::Foundation::{HANDLE, WAIT_OBJECT_0};
use windows::Win32::System::Console::{
    GetConsoleMode, GetConsoleScreenBufferInfo, GetStdHandle, ReadConsoleInputW, SetConsoleMode,
    WriteConsoleW, CONSOLE_MODE, CONSOLE_SCREEN_BUFFER_INFO, INPUT_RECORD, STD_INPUT_HANDLE,
    STD_OUTPUT_HANDLE,
};
use windows::Win32::System::Threading::WaitForSingleObject;

use super::{ConsoleEvent, ConsoleHost, ConsoleMode, ConsoleMouseEvent};
use crate::attributes::Size;
use crate::error::{Result, TtyError};
use crate::keymap::{ControlKeys, KeyEvent};

const KEY_EVENT: u16 = 0x0001;
const MOUSE_EVENT: u16 = 0x0002;
const WINDOW_BUFFER_SIZE_EVENT: u16 = 0x0004;
const FOCUS_EVENT: u16 = 0x0010;

fn win_error(e: windows::core::Error) -> TtyError {
    TtyError::Io(io::Error::other(e))
}

/// The console attached to this process.
pub struct WindowsConsole {
    input: isize,
    output: isize,
    high_surrogate: Mutex<Option<u16>>,
}

impl WindowsConsole {
    /// Attach to the standard input and output console handles.
    pub fn open() -> Result<Self> {
        // SAFETY: GetStdHandle has no preconditions.
        let (input, output) = unsafe {
            (
                GetStdHandle(STD_INPUT_HANDLE).map_err(win_error)?,
                GetStdHandle(STD_OUTPUT_HANDLE).map_err(win_error)?,
            )
        };
        debug!(?input, ?output, "opened console handles");
        Ok(Self {
            input: input.0 as isize,
            output: output.0 as isize,
            high_surrogate: Mutex::new(None),
        })
    }

    fn input(&self) -> HANDLE {
        HANDLE(self.input as *mut c_void)
    }

    fn output(&self) -> HANDLE {
        HANDLE(self.output as *mut c_void)
    }

    fn decode_char(&self, unit: u16) -> Result<Option<char>> {
        let mut pending = self
            .high_surrogate
            .lock()
            .map_err(|_| TtyError::LockPoisoned)?;
        if (0xD800..0xDC00).contains(&unit) {
            *pending = Some(unit);
            return Ok(None);
        }
        let units: Vec<u16> = pending.take().into_iter().chain(Some(unit)).collect();
        Ok(char::decode_utf16(units)
            .last()
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)))
    }

    fn convert(&self, record: &INPUT_RECORD) -> Result<Option<ConsoleEvent>> {
        // SAFETY: the union member read matches EventType.
        let event = unsafe {
            match record.EventType {
                KEY_EVENT => {
                    let key = record.Event.KeyEvent;
                    let character = match self.decode_char(key.uChar.UnicodeChar)? {
                        Some(c) => c,
                        None => return Ok(None),
                    };
                    let control_keys = ControlKeys::from_bits_truncate(key.dwControlKeyState);
                    let event = if key.bKeyDown.as_bool() {
                        KeyEvent::down(key.wVirtualKeyCode, character, control_keys)
                    } else {
                        KeyEvent::up(key.wVirtualKeyCode, character, control_keys)
                    };
                    ConsoleEvent::Key(event)
                }
                MOUSE_EVENT => {
                    let mouse = record.Event.MouseEvent;
                    ConsoleEvent::Mouse(ConsoleMouseEvent {
                        column: mouse.dwMousePosition.X.max(0) as u16,
                        row: mouse.dwMousePosition.Y.max(0) as u16,
                        buttons: mouse.dwButtonState,
                        control_keys: ControlKeys::from_bits_truncate(mouse.dwControlKeyState),
                        flags: mouse.dwEventFlags,
                    })
                }
                WINDOW_BUFFER_SIZE_EVENT => ConsoleEvent::Resize,
                FOCUS_EVENT => ConsoleEvent::Focus(record.Event.FocusEvent.bSetFocus.as_bool()),
                other => {
                    trace!(event_type = other, "ignoring console event");
                    return Ok(None);
                }
            }
        };
        Ok(Some(event))
    }
}

impl ConsoleHost for WindowsConsole {
    fn mode(&self) -> Result<ConsoleMode> {
        let mut mode = CONSOLE_MODE(0);
        // SAFETY: `mode` outlives the call.
        unsafe { GetConsoleMode(self.input(), &mut mode) }.map_err(win_error)?;
        Ok(ConsoleMode::from_bits_retain(mode.0))
    }

    fn set_mode(&self, mode: ConsoleMode) -> Result<()> {
        // SAFETY: plain value argument.
        unsafe { SetConsoleMode(self.input(), CONSOLE_MODE(mode.bits())) }.map_err(win_error)
    }

    fn size(&self) -> Result<Size> {
        let mut info = CONSOLE_SCREEN_BUFFER_INFO::default();
        // SAFETY: `info` outlives the call.
        unsafe { GetConsoleScreenBufferInfo(self.output(), &mut info) }.map_err(win_error)?;
        let window = info.srWindow;
        Ok(Size::new(
            (window.Right - window.Left + 1).max(1) as u16,
            (window.Bottom - window.Top + 1).max(1) as u16,
        ))
    }

    fn read_event(&self, timeout: Duration) -> Result<Option<ConsoleEvent>> {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        // SAFETY: the input handle stays valid for the life of the process.
        if unsafe { WaitForSingleObject(self.input(), millis) } != WAIT_OBJECT_0 {
            return Ok(None);
        }
        let mut records = [INPUT_RECORD::default(); 1];
        let mut read = 0u32;
        // SAFETY: `records` and `read` outlive the call.
        unsafe { ReadConsoleInputW(self.input(), &mut records, &mut read) }.map_err(win_error)?;
        if read == 0 {
            return Ok(None);
        }
        self.convert(&records[0])
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let wide: Vec<u16> = text.encode_utf16().collect();
        // SAFETY: `wide` outlives the call.
        unsafe { WriteConsoleW(self.output(), &wide, None, None) }.map_err(win_error)
    }
}
