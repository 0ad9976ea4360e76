//! Terminal attribute model.
//!
//! [`Attributes`] is an in-memory termios-like record: four flag groups and
//! a control-character table. It is a plain value; changing it never touches
//! a device. Backends commit it explicitly through
//! [`Backend::set_attributes`](crate::terminal::Backend::set_attributes).

mod control_char;
mod flags;

pub use control_char::{ctrl, ControlChar};
pub use flags::{ControlFlags, InputFlags, LocalFlags, OutputFlags};

pub(crate) use flags::stty_names;

/// Value of a control character slot that is disabled.
pub const UNDEFINED: i32 = -1;

/// Size of a terminal in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    /// Number of columns (width).
    pub columns: u16,
    /// Number of rows (height).
    pub rows: u16,
}

impl Size {
    /// Create a new Size with the given dimensions.
    pub fn new(columns: u16, rows: u16) -> Self {
        Self { columns, rows }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self {
            columns: 80,
            rows: 24,
        }
    }
}

impl From<Size> for portable_pty::PtySize {
    fn from(size: Size) -> Self {
        portable_pty::PtySize {
            rows: size.rows,
            cols: size.columns,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

/// A complete snapshot of terminal attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributes {
    input: InputFlags,
    output: OutputFlags,
    control: ControlFlags,
    local: LocalFlags,
    control_chars: [i32; ControlChar::COUNT],
}

macro_rules! flag_group {
    (
        $field:ident,
        $ty:ty,
        $all:ident,
        $set_all:ident,
        $one:ident,
        $set_one:ident,
        $group:literal
    ) => {
        #[doc = concat!("All ", $group, " flags.")]
        pub fn $all(&self) -> $ty {
            self.$field
        }

        #[doc = concat!("Replace all ", $group, " flags.")]
        pub fn $set_all(&mut self, flags: $ty) {
            self.$field = flags;
        }

        #[doc = concat!("Whether every given ", $group, " flag is set.")]
        pub fn $one(&self, flags: $ty) -> bool {
            self.$field.contains(flags)
        }

        #[doc = concat!("Turn the given ", $group, " flag(s) on or off.")]
        pub fn $set_one(&mut self, flags: $ty, on: bool) {
            self.$field.set(flags, on);
        }
    };
}

impl Attributes {
    /// Create attributes with every flag cleared and every control
    /// character undefined.
    pub fn new() -> Self {
        Self {
            input: InputFlags::empty(),
            output: OutputFlags::empty(),
            control: ControlFlags::empty(),
            local: LocalFlags::empty(),
            control_chars: [UNDEFINED; ControlChar::COUNT],
        }
    }

    /// Attributes of a freshly opened, cooked software terminal.
    pub fn cooked() -> Self {
        let mut attrs = Self::new();
        attrs.local = LocalFlags::ISIG | LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::IEXTEN;
        attrs.input = InputFlags::ICRNL | InputFlags::IXON;
        attrs.output = OutputFlags::OPOST | OutputFlags::ONLCR;
        attrs.control = ControlFlags::CS8 | ControlFlags::CREAD;
        for (cc, value) in [
            (ControlChar::VIntr, ctrl(b'C')),
            (ControlChar::VQuit, ctrl(b'\\')),
            (ControlChar::VSusp, ctrl(b'Z')),
            (ControlChar::VEof, ctrl(b'D')),
            (ControlChar::VErase, 0x7f),
            (ControlChar::VWerase, ctrl(b'W')),
            (ControlChar::VKill, ctrl(b'U')),
            (ControlChar::VLnext, ctrl(b'V')),
            (ControlChar::VReprint, ctrl(b'R')),
            (ControlChar::VDiscard, ctrl(b'O')),
            (ControlChar::VStart, ctrl(b'Q')),
            (ControlChar::VStop, ctrl(b'S')),
            (ControlChar::VMin, 1),
            (ControlChar::VTime, 0),
        ] {
            attrs.set_control_char(cc, value);
        }
        attrs
    }

    flag_group!(
        input,
        InputFlags,
        input_flags,
        set_input_flags,
        input_flag,
        set_input_flag,
        "input"
    );
    flag_group!(
        output,
        OutputFlags,
        output_flags,
        set_output_flags,
        output_flag,
        set_output_flag,
        "output"
    );
    flag_group!(
        control,
        ControlFlags,
        control_flags,
        set_control_flags,
        control_flag,
        set_control_flag,
        "control"
    );
    flag_group!(
        local,
        LocalFlags,
        local_flags,
        set_local_flags,
        local_flag,
        set_local_flag,
        "local"
    );

    /// Value of a control character, [`UNDEFINED`] when disabled.
    pub fn control_char(&self, cc: ControlChar) -> i32 {
        self.control_chars[cc.index()]
    }

    /// Set a control character. Negative values disable the slot.
    pub fn set_control_char(&mut self, cc: ControlChar, value: i32) {
        self.control_chars[cc.index()] = if value < 0 { UNDEFINED } else { value };
    }

    /// Whether `byte` is the (defined) value of `cc`.
    pub fn is_control_char(&self, cc: ControlChar, byte: u8) -> bool {
        self.control_char(cc) == i32::from(byte)
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::new()
    }
}
