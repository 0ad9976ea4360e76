//! # ttyline
//!
//! Terminal attributes and a user-space line discipline.
//!
//! A [`Terminal`] pairs a set of termios-style [`Attributes`] with a
//! [`Backend`](terminal::Backend) that either enforces them itself or
//! forwards them to the operating system:
//!
//! - **Line discipline**: external byte streams (sockets, pipes) and locally
//!   owned ptys get signals, CR/NL translation and echo in user space
//! - **POSIX ttys**: attributes are read and written through `stty`
//! - **Native consoles**: key events are translated to the bytes a tty
//!   would have produced
//!
//! Capabilities come from `infocmp` with built-in fallbacks, and the
//! [`protocol`] module covers cursor position reports, X10/SGR mouse
//! reports and focus events.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ttyline::{SharedWriter, Signal, SignalHandler, TerminalBuilder};
//!
//! fn main() -> ttyline::Result<()> {
//!     ttyline::logging::try_init(None).ok();
//!
//!     let terminal = TerminalBuilder::new()
//!         .term_type("xterm")
//!         .external_reader(std::io::stdin(), Arc::new(SharedWriter::new(std::io::stdout())))?;
//!
//!     terminal.handle(Signal::Int, SignalHandler::custom(|_| eprintln!("interrupted")));
//!     terminal.write_str("name? ")?;
//!     terminal.flush()?;
//!     Ok(())
//! }
//! ```

pub mod attributes;
pub mod backend;
pub mod capability;
pub mod config;
pub mod discipline;
pub mod error;
pub mod keymap;
pub mod logging;
pub mod protocol;
pub mod pump;
pub mod signal;
pub mod stream;
pub mod terminal;

// Re-export commonly used types
pub use attributes::{
    Attributes, ControlChar, ControlFlags, InputFlags, LocalFlags, OutputFlags, Size,
};
pub use backend::BackendSettings;
pub use capability::{
    BoolCap, BuiltinLookup, Capabilities, CapabilityLookup, InfocmpLookup, NumCap, Param, StrCap,
};
pub use config::Config;
pub use error::{Result, TtyError};
pub use protocol::{Cursor, MouseEvent, MouseTracking};
pub use signal::{Signal, SignalHandler, SignalRegistry};
pub use stream::{InputStream, OutputStream, ReadStatus, SharedWriter};
pub use terminal::{Terminal, TerminalBuilder, TerminalOptions};
