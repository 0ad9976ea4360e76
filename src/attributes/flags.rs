//! The four termios flag groups.
//!
//! Flag names match the tokens printed and accepted by `stty` once
//! lower-cased (`ICRNL` ↔ `icrnl`).

use bitflags::bitflags;

bitflags! {
    /// Input processing flags (`c_iflag`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InputFlags: u32 {
        /// Ignore BREAK condition.
        const IGNBRK  = 1 << 0;
        /// Map BREAK to SIGINT.
        const BRKINT  = 1 << 1;
        /// Ignore (discard) parity errors.
        const IGNPAR  = 1 << 2;
        /// Mark parity and framing errors.
        const PARMRK  = 1 << 3;
        /// Enable checking of parity errors.
        const INPCK   = 1 << 4;
        /// Strip the 8th bit off characters.
        const ISTRIP  = 1 << 5;
        /// Map NL into CR.
        const INLCR   = 1 << 6;
        /// Ignore CR.
        const IGNCR   = 1 << 7;
        /// Map CR to NL.
        const ICRNL   = 1 << 8;
        /// Enable output flow control.
        const IXON    = 1 << 9;
        /// Enable input flow control.
        const IXOFF   = 1 << 10;
        /// Any character will restart after stop.
        const IXANY   = 1 << 11;
        /// Ring bell on input queue full.
        const IMAXBEL = 1 << 12;
        /// Input is UTF-8.
        const IUTF8   = 1 << 13;
    }
}

bitflags! {
    /// Output processing flags (`c_oflag`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OutputFlags: u32 {
        /// Enable following output processing.
        const OPOST  = 1 << 0;
        /// Map NL to CR-NL.
        const ONLCR  = 1 << 1;
        /// Expand tabs to spaces.
        const OXTABS = 1 << 2;
        /// Discard EOT's (^D) on output.
        const ONOEOT = 1 << 3;
        /// Map CR to NL.
        const OCRNL  = 1 << 4;
        /// No CR output at column 0.
        const ONOCR  = 1 << 5;
        /// NL performs CR function.
        const ONLRET = 1 << 6;
        /// Use fill characters for delay.
        const OFILL  = 1 << 7;
        /// Fill character is DEL.
        const OFDEL  = 1 << 8;
    }
}

bitflags! {
    /// Hardware control flags (`c_cflag`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControlFlags: u32 {
        /// Ignore control flags.
        const CIGNORE = 1 << 0;
        /// 5 bits per character.
        const CS5     = 1 << 1;
        /// 6 bits per character.
        const CS6     = 1 << 2;
        /// 7 bits per character.
        const CS7     = 1 << 3;
        /// 8 bits per character.
        const CS8     = 1 << 4;
        /// Send 2 stop bits.
        const CSTOPB  = 1 << 5;
        /// Enable receiver.
        const CREAD   = 1 << 6;
        /// Parity enable.
        const PARENB  = 1 << 7;
        /// Odd parity, else even.
        const PARODD  = 1 << 8;
        /// Hang up on last close.
        const HUPCL   = 1 << 9;
        /// Ignore modem status lines.
        const CLOCAL  = 1 << 10;
        /// RTS/CTS flow control.
        const CRTSCTS = 1 << 11;
    }
}

bitflags! {
    /// Local ("line discipline") flags (`c_lflag`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LocalFlags: u32 {
        /// Visual erase for line kill.
        const ECHOKE     = 1 << 0;
        /// Visually erase chars.
        const ECHOE      = 1 << 1;
        /// Echo NL after line kill.
        const ECHOK      = 1 << 2;
        /// Enable echoing.
        const ECHO       = 1 << 3;
        /// Echo NL even if ECHO is off.
        const ECHONL     = 1 << 4;
        /// Visual erase mode for hardcopy.
        const ECHOPRT    = 1 << 5;
        /// Echo control chars as ^(Char).
        const ECHOCTL    = 1 << 6;
        /// Enable signals INTR, QUIT, [D]SUSP.
        const ISIG       = 1 << 7;
        /// Canonicalize input lines.
        const ICANON     = 1 << 8;
        /// Use alternate WERASE algorithm.
        const ALTWERASE  = 1 << 9;
        /// Enable DISCARD and LNEXT.
        const IEXTEN     = 1 << 10;
        /// External processing.
        const EXTPROC    = 1 << 11;
        /// Stop background jobs from output.
        const TOSTOP     = 1 << 12;
        /// Output being flushed (state).
        const FLUSHO     = 1 << 13;
        /// No kernel output from VSTATUS.
        const NOKERNINFO = 1 << 14;
        /// Retype pending input (state).
        const PENDIN     = 1 << 15;
        /// Don't flush after interrupt.
        const NOFLSH     = 1 << 16;
    }
}

/// Lower-cased `stty` token for every named flag of a group.
pub(crate) fn stty_names<F: bitflags::Flags + Copy>() -> impl Iterator<Item = (String, F)> {
    F::all()
        .iter_names()
        .map(|(name, flag)| (name.to_ascii_lowercase(), flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stty_names_are_lowercase() {
        let names: Vec<String> = stty_names::<LocalFlags>().map(|(n, _)| n).collect();
        assert!(names.contains(&"icanon".to_string()));
        assert!(names.contains(&"echo".to_string()));
        assert_eq!(names.len(), 17);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(InputFlags::from_name("ICRNL"), Some(InputFlags::ICRNL));
        assert_eq!(OutputFlags::from_name("BOGUS"), None);
    }
}
