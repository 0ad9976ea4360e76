//! Logging initialization.
//!
//! The crate only emits `tracing` events; applications that want to see them
//! can install a subscriber through these helpers or bring their own.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "ttyline=info";

fn filter_for(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => {
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    }
}

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to [`DEFAULT_FILTER`].
///
/// # Panics
///
/// Panics if another tracing subscriber has already been set.
pub fn init() {
    tracing_subscriber::registry()
        .with(filter_for(None))
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Try to initialize the logging system.
///
/// `level` overrides the environment (e.g. the value of
/// [`LoggingSection::level`](crate::config::LoggingSection)). Returns `Err`
/// if logging has already been initialized.
pub fn try_init(level: Option<&str>) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_idempotent() {
        // Whichever test runs first wins; the rest must not panic.
        let _ = try_init(None);
        let _ = try_init(Some("ttyline=debug"));
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let filter = filter_for(Some("ttyline=loud"));
        assert!(filter.to_string().contains("ttyline"));
    }

    #[test]
    fn test_logging_works() {
        let _ = try_init(None);

        tracing::info!("test info message");
        tracing::debug!(bytes = 3, "test debug message");
        tracing::warn!("test warn message");
    }
}
