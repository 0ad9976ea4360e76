//! Error types for ttyline.

use thiserror::Error;

use crate::pump::PumpState;

/// Main error type for terminal operations.
#[derive(Error, Debug)]
pub enum TtyError {
    /// A symbolic flag, control character or capability name was not recognised.
    #[error("unknown {kind} name: {name}")]
    UnknownName {
        /// What kind of name was looked up (e.g. "control character").
        kind: &'static str,
        /// The offending name.
        name: String,
    },

    /// The external attribute tool failed.
    #[error("`{command}` failed: {message}")]
    Stty {
        /// The command line that was executed.
        command: String,
        /// Error output of the tool.
        message: String,
    },

    /// Some attribute changes could not be applied to the device.
    #[error("could not set the following flags: {}", flags.join(", "))]
    PartialApply {
        /// Tokens that are still different after the re-check.
        flags: Vec<String>,
    },

    /// Output of an external tool could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A capability string could not be formatted.
    #[error("capability format error: {0}")]
    Format(String),

    /// A blocking operation was cancelled by an interrupt request.
    #[error("interrupted")]
    Interrupted,

    /// The input stream ended before the expected data arrived.
    #[error("end of stream")]
    Eof,

    /// The terminal has been closed.
    #[error("terminal closed")]
    Closed,

    /// PTY-related error.
    #[error("PTY error: {0}")]
    Pty(String),

    /// A pump is still shutting down and cannot be restarted yet.
    #[error("pump `{0}` is still stopping")]
    PumpBusy(&'static str),

    /// Invalid pump state transition.
    #[error("invalid pump state transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current state.
        from: PumpState,
        /// Requested state.
        to: PumpState,
    },

    /// The operation is not available on this backend.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TtyError {
    /// Build an [`UnknownName`](TtyError::UnknownName) error.
    pub fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownName {
            kind,
            name: name.into(),
        }
    }

    /// Check whether this error is an end-of-stream condition.
    pub fn is_eof(&self) -> bool {
        match self {
            TtyError::Eof => true,
            TtyError::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

/// Convenience Result type for terminal operations.
pub type Result<T> = std::result::Result<T, TtyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_display() {
        let err = TtyError::unknown("control character", "vbogus");
        assert!(err.to_string().contains("control character"));
        assert!(err.to_string().contains("vbogus"));
    }

    #[test]
    fn test_partial_apply_lists_flags() {
        let err = TtyError::PartialApply {
            flags: vec!["-icanon".into(), "min".into(), "0".into()],
        };
        assert_eq!(
            err.to_string(),
            "could not set the following flags: -icanon, min, 0"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no tty");
        let err: TtyError = io_err.into();
        assert!(matches!(err, TtyError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_is_eof() {
        assert!(TtyError::Eof.is_eof());
        let io_eof: TtyError = std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into();
        assert!(io_eof.is_eof());
        assert!(!TtyError::Interrupted.is_eof());
    }
}
