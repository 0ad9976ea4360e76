//! Terminal signals and the per-terminal handler registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::trace;

/// Signals a terminal can raise.
///
/// Platform support varies: a handler can be registered for every signal,
/// but some are never raised on some backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Interrupt (VINTR).
    Int,
    /// Quit (VQUIT).
    Quit,
    /// Terminal stop (VSUSP).
    Tstp,
    /// Continue after stop.
    Cont,
    /// Status request (VSTATUS).
    Info,
    /// Window size changed.
    Winch,
    /// Hang-up.
    Hup,
}

impl Signal {
    /// All signals.
    pub const ALL: [Signal; 7] = [
        Signal::Int,
        Signal::Quit,
        Signal::Tstp,
        Signal::Cont,
        Signal::Info,
        Signal::Winch,
        Signal::Hup,
    ];
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Int => "INT",
            Signal::Quit => "QUIT",
            Signal::Tstp => "TSTP",
            Signal::Cont => "CONT",
            Signal::Info => "INFO",
            Signal::Winch => "WINCH",
            Signal::Hup => "HUP",
        };
        f.write_str(name)
    }
}

/// What happens when a signal is raised.
#[derive(Clone, Default)]
pub enum SignalHandler {
    /// Default disposition: nothing happens in-process.
    #[default]
    Default,
    /// Explicitly ignored.
    Ignore,
    /// User callback.
    Custom(Arc<dyn Fn(Signal) + Send + Sync>),
}

impl SignalHandler {
    /// Wrap a closure as a handler.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Signal) + Send + Sync + 'static,
    {
        SignalHandler::Custom(Arc::new(f))
    }

    /// Whether this is the [`Default`](SignalHandler::Default) sentinel.
    pub fn is_default(&self) -> bool {
        matches!(self, SignalHandler::Default)
    }

    /// Whether this is the [`Ignore`](SignalHandler::Ignore) sentinel.
    pub fn is_ignore(&self) -> bool {
        matches!(self, SignalHandler::Ignore)
    }
}

impl fmt::Debug for SignalHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalHandler::Default => f.write_str("Default"),
            SignalHandler::Ignore => f.write_str("Ignore"),
            SignalHandler::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Thread-safe signal → handler map.
///
/// Shared between the terminal facade and its pumps, which raise signals
/// from background threads.
pub struct SignalRegistry {
    handlers: Mutex<HashMap<Signal, SignalHandler>>,
}

impl SignalRegistry {
    /// Create a registry with every signal mapped to `initial`.
    pub fn new(initial: SignalHandler) -> Self {
        let handlers = Signal::ALL
            .iter()
            .map(|&signal| (signal, initial.clone()))
            .collect();
        Self {
            handlers: Mutex::new(handlers),
        }
    }

    /// Replace the handler for `signal`, returning the previous one.
    pub fn handle(&self, signal: Signal, handler: SignalHandler) -> SignalHandler {
        let mut handlers = self.handlers.lock().unwrap_or_else(|p| p.into_inner());
        handlers.insert(signal, handler).unwrap_or_default()
    }

    /// Current handler for `signal`.
    pub fn handler(&self, signal: Signal) -> SignalHandler {
        let handlers = self.handlers.lock().unwrap_or_else(|p| p.into_inner());
        handlers.get(&signal).cloned().unwrap_or_default()
    }

    /// Invoke the handler for `signal` unless it is a sentinel.
    ///
    /// The lock is released before the callback runs, so handlers may
    /// re-register themselves or change terminal attributes.
    pub fn raise(&self, signal: Signal) {
        trace!(%signal, "raising signal");
        if let SignalHandler::Custom(callback) = self.handler(signal) {
            callback(signal);
        }
    }
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new(SignalHandler::Default)
    }
}

impl fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.lock().unwrap_or_else(|p| p.into_inner());
        f.debug_struct("SignalRegistry").field("handlers", &*handlers).finish()
    }
}
