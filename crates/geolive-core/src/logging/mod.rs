//! Structured logging with `tracing`.
//!
//! The binary calls [`init_subscriber`] once at startup. Library code only
//! emits events; sessions run inside an `info_span!("session", channel, seq)`
//! so every line carries the channel name and sequence number.
//!
//! [`test_utils::capture_logs`] installs a thread-local capturing subscriber
//! for asserting on emitted events in tests.

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Levels accepted by [`init_subscriber`] and the settings file.
pub const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Whether `level` is one of [`LEVELS`] (case-insensitive).
pub fn is_valid_level(level: &str) -> bool {
    let level = level.to_ascii_lowercase();
    LEVELS.contains(&level.as_str())
}

/// Initialize the global tracing subscriber with compact stderr output.
///
/// `RUST_LOG` takes precedence over `level`. Subsequent calls are no-ops.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init fails if a global subscriber is already set
    let _ = subscriber.try_init();
}

/// Run `f` with a temporary warn-level subscriber writing to stderr.
///
/// Used while loading settings, before the configured level is known, so
/// warnings about ignored overrides still reach the user.
pub fn with_startup_logging<T>(f: impl FnOnce() -> T) -> T {
    with_startup_logging_to(std::io::stderr, f)
}

/// [`with_startup_logging`] with a custom writer.
pub fn with_startup_logging_to<W, T>(writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(writer)
        .with_ansi(false)
        .compact()
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn startup_logging_keeps_warnings_only() {
        let buffer = Buffer::default();
        let sink = buffer.clone();
        let answer = with_startup_logging_to(move || sink.clone(), || {
            tracing::warn!(key = "GEOLIVE_PORT", "invalid env var, ignoring");
            tracing::info!("not shown");
            42
        });

        assert_eq!(answer, 42);
        let out = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("invalid env var, ignoring"));
        assert!(out.contains("GEOLIVE_PORT"));
        assert!(!out.contains("not shown"));
    }

    #[test]
    fn level_validation() {
        assert!(is_valid_level("info"));
        assert!(is_valid_level("WARN"));
        assert!(!is_valid_level("verbose"));
    }

    #[test]
    fn init_subscriber_does_not_panic() {
        init_subscriber("warn");
        init_subscriber("debug");
    }
}
