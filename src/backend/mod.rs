//! Platform backends.
//!
//! - [`line`]: user-space line discipline over an external byte stream or
//!   a locally owned pty.
//! - [`posix`]: real tty devices configured through `stty` (unix only).
//! - [`console`]: native consoles delivering key events.

pub mod console;
pub mod line;
#[cfg(unix)]
pub mod posix;

use std::io;
use std::time::Duration;

use crate::config::TerminalSection;
use crate::error::TtyError;

/// Tuning shared by the backends that run pumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSettings {
    /// Capacity of the cooked-input pipe.
    pub pipe_capacity: usize,
    /// How long a pump blocks on its source per step.
    pub poll_interval: Duration,
    /// Upper bound on waiting for a pump thread to exit.
    pub join_timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self::from(&TerminalSection::default())
    }
}

impl From<&TerminalSection> for BackendSettings {
    fn from(section: &TerminalSection) -> Self {
        Self {
            pipe_capacity: section.pipe_capacity,
            poll_interval: section.poll_interval(),
            join_timeout: section.pump_join_timeout(),
        }
    }
}

/// Convert a pump error into the I/O error latched on a cooked pipe.
pub(crate) fn latched_error(err: &TtyError) -> io::Error {
    match err {
        TtyError::Io(e) => io::Error::new(e.kind(), e.to_string()),
        other => io::Error::other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_section() {
        let section = TerminalSection {
            pipe_capacity: 64,
            poll_interval_ms: 0,
            pump_join_timeout_ms: 500,
            ..TerminalSection::default()
        };
        let settings = BackendSettings::from(&section);
        assert_eq!(settings.pipe_capacity, 64);
        assert_eq!(settings.poll_interval, Duration::from_millis(1));
        assert_eq!(settings.join_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_latched_error_keeps_kind() {
        let err = TtyError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "peer gone"));
        assert_eq!(latched_error(&err).kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(latched_error(&TtyError::Eof).kind(), io::ErrorKind::Other);
    }
}
