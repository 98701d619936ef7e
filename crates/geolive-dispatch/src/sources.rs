//! Stock value sources.

use std::sync::Arc;

use geolive_core::ValueSource;
use parking_lot::RwLock;

/// Shared text value of an input control.
///
/// Clones share the same value: the host keeps one handle to write into,
/// the dispatcher reads through another.
#[derive(Clone, Debug, Default)]
pub struct InputControl {
    value: Arc<RwLock<String>>,
}

impl InputControl {
    /// Empty control.
    pub fn new() -> Self {
        Self::default()
    }

    /// Control holding `value`.
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Arc::new(RwLock::new(value.into())),
        }
    }

    /// Replace the value.
    pub fn set(&self, value: impl Into<String>) {
        *self.value.write() = value.into();
    }

    /// Current value.
    pub fn get(&self) -> String {
        self.value.read().clone()
    }
}

impl ValueSource for InputControl {
    fn current_value(&self) -> String {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_value() {
        let control = InputControl::with_value("fr");
        let reader = control.clone();
        control.set("fra");
        assert_eq!(reader.current_value(), "fra");
    }
}
