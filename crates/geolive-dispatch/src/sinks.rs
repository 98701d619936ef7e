//! Stock output sinks.

use std::io::Write;

use geolive_core::OutputSink;
use parking_lot::Mutex;

#[derive(Default)]
struct MemoryState {
    content: String,
    history: Vec<String>,
}

/// Keeps the current content in memory, plus every render in order.
pub struct MemorySink {
    selector: String,
    state: Mutex<MemoryState>,
}

impl MemorySink {
    /// Empty sink for `selector`.
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Current content.
    pub fn content(&self) -> String {
        self.state.lock().content.clone()
    }

    /// Every payload rendered so far, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    /// Number of renders.
    pub fn render_count(&self) -> usize {
        self.state.lock().history.len()
    }
}

impl OutputSink for MemorySink {
    fn selector(&self) -> &str {
        &self.selector
    }

    fn render(&self, markup: &str) {
        let mut state = self.state.lock();
        markup.clone_into(&mut state.content);
        state.history.push(markup.to_owned());
    }
}

/// Writes each render to a byte stream, headed by the selector.
///
/// ```text
/// [countries_stream]
/// <ul><li>Switzerland</li></ul>
/// ```
pub struct WriterSink<W> {
    selector: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Sink writing to `writer`.
    pub fn new(selector: impl Into<String>, writer: W) -> Self {
        Self {
            selector: selector.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<std::io::Stdout> {
    /// Sink writing to stdout.
    pub fn stdout(selector: impl Into<String>) -> Self {
        Self::new(selector, std::io::stdout())
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn selector(&self) -> &str {
        &self.selector
    }

    fn render(&self, markup: &str) {
        let mut writer = self.writer.lock();
        let result = writeln!(writer, "[{}]", self.selector)
            .and_then(|()| writeln!(writer, "{markup}"))
            .and_then(|()| writer.flush());
        if let Err(e) = result {
            tracing::warn!(selector = %self.selector, error = %e, "failed to write sink output");
        }
    }
}
