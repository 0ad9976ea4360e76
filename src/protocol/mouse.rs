//! xterm mouse reports.

use bitflags::bitflags;

use crate::error::{Result, TtyError};

/// What happened to the mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    /// Pointer moved with no button held.
    Moved,
    /// A button went down.
    Pressed,
    /// A button went up.
    Released,
    /// Pointer moved with a button held.
    Dragged,
    /// Wheel turned.
    Wheel,
}

/// Which button an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// No button.
    None,
    /// Left button.
    Button1,
    /// Middle button.
    Button2,
    /// Right button.
    Button3,
    /// Wheel turned up.
    WheelUp,
    /// Wheel turned down.
    WheelDown,
}

bitflags! {
    /// Keyboard modifiers held during a mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseModifiers: u8 {
        /// Shift key.
        const SHIFT   = 1 << 0;
        /// Alt (meta) key.
        const ALT     = 1 << 1;
        /// Control key.
        const CONTROL = 1 << 2;
    }
}

/// A decoded mouse event, with zero-based coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    /// Event kind.
    pub kind: MouseEventKind,
    /// Button involved.
    pub button: MouseButton,
    /// Modifiers held.
    pub modifiers: MouseModifiers,
    /// Column, starting at 0.
    pub column: u16,
    /// Row, starting at 0.
    pub row: u16,
}

impl MouseEvent {
    /// Create a new event.
    pub fn new(
        kind: MouseEventKind,
        button: MouseButton,
        modifiers: MouseModifiers,
        column: u16,
        row: u16,
    ) -> Self {
        Self {
            kind,
            button,
            modifiers,
            column,
            row,
        }
    }
}

impl Default for MouseEvent {
    fn default() -> Self {
        Self::new(
            MouseEventKind::Moved,
            MouseButton::None,
            MouseModifiers::empty(),
            0,
            0,
        )
    }
}

/// Mouse tracking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseTracking {
    /// Tracking disabled.
    #[default]
    Off,
    /// Button press and release.
    Normal,
    /// Press, release and drag.
    Button,
    /// Every motion.
    Any,
}

impl MouseTracking {
    /// Escape sequence that switches the terminal to this mode.
    pub fn escape(self) -> &'static str {
        match self {
            MouseTracking::Off => "\x1b[?1000l\x1b[?1002l\x1b[?1003l",
            MouseTracking::Normal => "\x1b[?1000h",
            MouseTracking::Button => "\x1b[?1002h",
            MouseTracking::Any => "\x1b[?1003h",
        }
    }
}

/// Offset added by the terminal to every report value.
const REPORT_BASE: i32 = 32;

/// Stateful decoder for X10-style mouse reports (`\E[M` + 3 values).
///
/// The previous event disambiguates press from drag and infers which button
/// a release refers to.
#[derive(Debug, Clone, Default)]
pub struct MouseDecoder {
    last: MouseEvent,
}

impl MouseDecoder {
    /// Create a decoder with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently decoded event.
    pub fn last(&self) -> MouseEvent {
        self.last
    }

    /// Decode the three raw report values that follow `\E[M`.
    pub fn decode(&mut self, cb: i32, cx: i32, cy: i32) -> MouseEvent {
        let cb = cb - REPORT_BASE;
        let column = coordinate(cx);
        let row = coordinate(cy);

        let mut modifiers = MouseModifiers::empty();
        modifiers.set(MouseModifiers::SHIFT, cb & 4 != 0);
        modifiers.set(MouseModifiers::ALT, cb & 8 != 0);
        modifiers.set(MouseModifiers::CONTROL, cb & 16 != 0);

        let (kind, button) = if cb & 64 != 0 {
            let button = if cb & 1 != 0 {
                MouseButton::WheelDown
            } else {
                MouseButton::WheelUp
            };
            (MouseEventKind::Wheel, button)
        } else {
            let held = matches!(
                self.last.kind,
                MouseEventKind::Pressed | MouseEventKind::Dragged
            );
            match cb & 3 {
                code @ 0..=2 => {
                    let button = match code {
                        0 => MouseButton::Button1,
                        1 => MouseButton::Button2,
                        _ => MouseButton::Button3,
                    };
                    let kind = if held && self.last.button == button {
                        MouseEventKind::Dragged
                    } else {
                        MouseEventKind::Pressed
                    };
                    (kind, button)
                }
                _ if held => (MouseEventKind::Released, self.last.button),
                _ => (MouseEventKind::Moved, MouseButton::None),
            }
        };

        self.last = MouseEvent::new(kind, button, modifiers, column, row);
        self.last
    }

    /// Read and decode one report, pulling bytes from `next_byte`.
    ///
    /// Values above 127 are accepted in the UTF-8 extended encoding.
    pub fn read<F>(&mut self, mut next_byte: F) -> Result<MouseEvent>
    where
        F: FnMut() -> Result<Option<u8>>,
    {
        let cb = read_value(&mut next_byte)?;
        let cx = read_value(&mut next_byte)?;
        let cy = read_value(&mut next_byte)?;
        Ok(self.decode(cb, cx, cy))
    }
}

fn coordinate(raw: i32) -> u16 {
    u16::try_from((raw - REPORT_BASE - 1).max(0)).unwrap_or(u16::MAX)
}

fn read_value<F>(next_byte: &mut F) -> Result<i32>
where
    F: FnMut() -> Result<Option<u8>>,
{
    let first = next_byte()?.ok_or(TtyError::Eof)?;
    if first & 0xE0 == 0xC0 {
        let second = next_byte()?.ok_or(TtyError::Eof)?;
        return Ok((i32::from(first & 0x1F) << 6) | i32::from(second & 0x3F));
    }
    Ok(i32::from(first))
}
