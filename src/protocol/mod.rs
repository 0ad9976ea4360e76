//! In-band protocols layered on a terminal: cursor reports, mouse reports
//! and focus events.

mod cursor;
mod mouse;

pub use cursor::{read_cursor_report, Cursor, CursorPattern};
pub use mouse::{
    MouseButton, MouseDecoder, MouseEvent, MouseEventKind, MouseModifiers, MouseTracking,
};

/// Enables focus in/out reports.
pub const FOCUS_ON: &str = "\x1b[?1004h";
/// Disables focus in/out reports.
pub const FOCUS_OFF: &str = "\x1b[?1004l";
/// Sent by the terminal when it gains focus.
pub const FOCUS_IN: &[u8] = b"\x1b[I";
/// Sent by the terminal when it loses focus.
pub const FOCUS_OUT: &[u8] = b"\x1b[O";
