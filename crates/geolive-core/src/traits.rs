//! Capabilities a dispatcher depends on but does not implement.

/// Reads the current value of the control that triggers a dispatcher.
pub trait ValueSource: Send + Sync {
    /// Value at call time.
    fn current_value(&self) -> String;
}

impl<F> ValueSource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn current_value(&self) -> String {
        self()
    }
}

/// Location whose entire content is replaced by each accepted payload.
///
/// The payload is final markup; implementations render it as-is.
pub trait OutputSink: Send + Sync {
    /// Stable identifier of the location, e.g. `countries_stream`.
    fn selector(&self) -> &str;

    /// Replace the whole content with `markup`.
    fn render(&self, markup: &str);
}
