//! Control characters (`c_cc`).

use std::fmt;
use std::str::FromStr;

use crate::error::TtyError;

/// Symbolic name of a control-character slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlChar {
    /// End of file (usually ^D).
    VEof,
    /// Additional end of line.
    VEol,
    /// Second additional end of line.
    VEol2,
    /// Erase previous character (usually DEL).
    VErase,
    /// Erase previous word (usually ^W).
    VWerase,
    /// Erase the line (usually ^U).
    VKill,
    /// Reprint the line (usually ^R).
    VReprint,
    /// Alternate erase character.
    VErase2,
    /// Interrupt (usually ^C).
    VIntr,
    /// Quit (usually ^\).
    VQuit,
    /// Suspend (usually ^Z).
    VSusp,
    /// Delayed suspend (usually ^Y).
    VDsusp,
    /// Resume output (usually ^Q).
    VStart,
    /// Pause output (usually ^S).
    VStop,
    /// Quote the next character (usually ^V).
    VLnext,
    /// Toggle output discarding (usually ^O).
    VDiscard,
    /// Minimum number of bytes for a non-canonical read.
    VMin,
    /// Read timeout in deciseconds for a non-canonical read.
    VTime,
    /// Status request (usually ^T on BSD).
    VStatus,
}

impl ControlChar {
    /// Number of control-character slots.
    pub const COUNT: usize = 19;

    /// All control characters in slot order.
    pub const ALL: [ControlChar; Self::COUNT] = [
        ControlChar::VEof,
        ControlChar::VEol,
        ControlChar::VEol2,
        ControlChar::VErase,
        ControlChar::VWerase,
        ControlChar::VKill,
        ControlChar::VReprint,
        ControlChar::VErase2,
        ControlChar::VIntr,
        ControlChar::VQuit,
        ControlChar::VSusp,
        ControlChar::VDsusp,
        ControlChar::VStart,
        ControlChar::VStop,
        ControlChar::VLnext,
        ControlChar::VDiscard,
        ControlChar::VMin,
        ControlChar::VTime,
        ControlChar::VStatus,
    ];

    /// Slot index into the control-character table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The name `stty` uses for this slot.
    pub fn stty_name(self) -> &'static str {
        match self {
            ControlChar::VEof => "eof",
            ControlChar::VEol => "eol",
            ControlChar::VEol2 => "eol2",
            ControlChar::VErase => "erase",
            ControlChar::VWerase => "werase",
            ControlChar::VKill => "kill",
            ControlChar::VReprint => "rprnt",
            ControlChar::VErase2 => "erase2",
            ControlChar::VIntr => "intr",
            ControlChar::VQuit => "quit",
            ControlChar::VSusp => "susp",
            ControlChar::VDsusp => "dsusp",
            ControlChar::VStart => "start",
            ControlChar::VStop => "stop",
            ControlChar::VLnext => "lnext",
            ControlChar::VDiscard => "discard",
            ControlChar::VMin => "min",
            ControlChar::VTime => "time",
            ControlChar::VStatus => "status",
        }
    }

    /// Whether the slot holds a count rather than a character.
    pub fn is_numeric(self) -> bool {
        matches!(self, ControlChar::VMin | ControlChar::VTime)
    }
}

impl fmt::Display for ControlChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.stty_name().to_ascii_uppercase())
    }
}

impl FromStr for ControlChar {
    type Err = TtyError;

    /// Accepts `VINTR`, `intr` and the `reprint` spelling of `rprnt`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let name = lower.strip_prefix('v').unwrap_or(&lower);
        let name = if name == "reprint" { "rprnt" } else { name };
        ControlChar::ALL
            .iter()
            .copied()
            .find(|c| c.stty_name() == name)
            .ok_or_else(|| TtyError::unknown("control character", s))
    }
}

/// Build the code of a control key, e.g. `ctrl(b'C') == 3`.
pub const fn ctrl(key: u8) -> i32 {
    (key & 0x1f) as i32
}
