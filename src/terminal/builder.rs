//! Terminal construction.

use std::io::Read;
use std::sync::Arc;

use tracing::debug;

use super::{Backend, Terminal};
use crate::backend::console::{ConsoleBackend, ConsoleHost};
use crate::backend::line::LineBackend;
use crate::backend::BackendSettings;
use crate::capability::{CapabilityLookup, InfocmpLookup, FALLBACK_TYPE};
use crate::config::{Config, TerminalSection};
use crate::error::Result;
use crate::signal::{SignalHandler, SignalRegistry};
use crate::stream::{ByteSource, OutputStream, ThreadedReader};

/// Identity of a terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOptions {
    /// Display name.
    pub name: String,
    /// Terminal type used for capability lookup.
    pub term_type: String,
    /// Character encoding name.
    pub encoding: String,
}

/// Builds a [`Terminal`] over one of the bundled backends.
pub struct TerminalBuilder {
    name: String,
    term_type: Option<String>,
    encoding: Option<String>,
    lookup: Arc<dyn CapabilityLookup>,
    handler: SignalHandler,
    settings: TerminalSection,
}

impl Default for TerminalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalBuilder {
    /// Builder with default settings and `infocmp`-backed capability lookup.
    pub fn new() -> Self {
        Self {
            name: "ttyline".to_string(),
            term_type: None,
            encoding: None,
            lookup: Arc::new(InfocmpLookup::new()),
            handler: SignalHandler::Default,
            settings: TerminalSection::default(),
        }
    }

    /// Builder seeded from the `terminal` section of `config`.
    pub fn from_config(config: &Config) -> Self {
        let settings = config.terminal.clone();
        Self {
            term_type: settings.term_type.clone(),
            encoding: Some(settings.encoding.clone()),
            settings,
            ..Self::new()
        }
    }

    /// Set the terminal name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the terminal type.
    pub fn term_type(mut self, term_type: impl Into<String>) -> Self {
        self.term_type = Some(term_type.into());
        self
    }

    /// Set the encoding name.
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Replace the capability lookup.
    pub fn lookup(mut self, lookup: impl CapabilityLookup + 'static) -> Self {
        self.lookup = Arc::new(lookup);
        self
    }

    /// Initial handler for every signal.
    pub fn signal_handler(mut self, handler: SignalHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Replace the terminal settings.
    pub fn settings(mut self, settings: TerminalSection) -> Self {
        self.settings = settings;
        self
    }

    /// Build over a caller-supplied backend.
    ///
    /// `make` receives the signal registry the terminal will use, so that
    /// background input processing can raise signals.
    pub fn build<B, F>(self, default_type: &str, make: F) -> Result<Terminal<B>>
    where
        B: Backend,
        F: FnOnce(Arc<SignalRegistry>, &BackendSettings) -> Result<B>,
    {
        let (options, signals) = self.prepare(default_type);
        let capabilities = self.lookup.lookup(&options.term_type);
        let backend = make(Arc::clone(&signals), &BackendSettings::from(&self.settings))?;
        Terminal::new(options, capabilities, signals, backend)
    }

    /// Terminal over a byte stream with no line discipline of its own.
    ///
    /// Input is read from `source` by a pump; output goes to `sink`.
    pub fn external<S>(
        self,
        source: S,
        sink: Arc<dyn OutputStream>,
    ) -> Result<Terminal<LineBackend>>
    where
        S: ByteSource + 'static,
    {
        self.build(FALLBACK_TYPE, move |signals, settings| {
            LineBackend::external(signals, Box::new(source), sink, settings)
        })
    }

    /// Like [`external`](Self::external), over a blocking reader.
    pub fn external_reader<R>(
        self,
        reader: R,
        sink: Arc<dyn OutputStream>,
    ) -> Result<Terminal<LineBackend>>
    where
        R: Read + Send + 'static,
    {
        let source =
            ThreadedReader::spawn("ttyline-external", reader, self.settings.pipe_capacity)?;
        self.external(source, sink)
    }

    /// Terminal over a locally opened pty pair.
    pub fn local_pty(self) -> Result<Terminal<LineBackend>> {
        self.build(FALLBACK_TYPE, LineBackend::local_pty)
    }

    /// Terminal over a real tty device, driven through `stty`.
    #[cfg(unix)]
    pub fn posix(self) -> Result<Terminal<crate::backend::posix::PosixBackend>> {
        let device = self.settings.device.clone();
        let stty = self.settings.stty.clone();
        self.build(FALLBACK_TYPE, move |_signals, _settings| {
            crate::backend::posix::PosixBackend::open(&device, &stty)
        })
    }

    /// Terminal over a native console host.
    pub fn console<H: ConsoleHost>(self, host: H) -> Result<Terminal<ConsoleBackend<H>>> {
        let (options, signals) = self.prepare(crate::backend::console::DEFAULT_TYPE);
        let capabilities = self.lookup.lookup(&options.term_type);
        let backend = ConsoleBackend::new(
            host,
            Arc::clone(&signals),
            capabilities.clone(),
            &BackendSettings::from(&self.settings),
        )?;
        Terminal::new(options, capabilities, signals, backend)
    }

    /// Terminal over the Windows console of this process.
    #[cfg(windows)]
    pub fn windows_console(
        self,
    ) -> Result<Terminal<ConsoleBackend<crate::backend::console::WindowsConsole>>> {
        let host = crate::backend::console::WindowsConsole::open()?;
        self.console(host)
    }

    fn prepare(&self, default_type: &str) -> (TerminalOptions, Arc<SignalRegistry>) {
        let term_type = self
            .term_type
            .clone()
            .unwrap_or_else(|| default_type.to_string());
        debug!(name = %self.name, %term_type, "building terminal");
        let options = TerminalOptions {
            name: self.name.clone(),
            term_type,
            encoding: self
                .encoding
                .clone()
                .unwrap_or_else(|| self.settings.encoding.clone()),
        };
        (options, Arc::new(SignalRegistry::new(self.handler.clone())))
    }
}
