//! Per-dispatcher tuning.

use std::time::Duration;

use geolive_core::DeliveryOrder;
use geolive_settings::{GeoliveSettings, SettingsError};

/// Timing and delivery settings of one dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Idle time after the last trigger before a session opens. Zero dispatches immediately.
    pub quiet_window: Duration,
    /// How overlapping sessions share the sink.
    pub delivery: DeliveryOrder,
    /// Close a session when no message arrives for this long.
    pub reply_timeout: Duration,
    /// Close a session after this many applied replies; `None` waits for the server to close.
    pub max_replies: Option<u32>,
    /// Buffer size of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            quiet_window: Duration::from_millis(500),
            delivery: DeliveryOrder::LatestWins,
            reply_timeout: Duration::from_secs(10),
            max_replies: Some(1),
            event_capacity: 64,
        }
    }
}

impl DispatchConfig {
    /// Config for `channel`, combining shared dispatch settings with the channel's quiet window.
    pub fn from_settings(settings: &GeoliveSettings, channel: &str) -> Result<Self, SettingsError> {
        let dispatch = &settings.dispatch;
        Ok(Self {
            quiet_window: settings.quiet_window_for(channel)?,
            delivery: dispatch.delivery,
            reply_timeout: Duration::from_millis(dispatch.reply_timeout_ms),
            max_replies: (dispatch.max_replies > 0).then_some(dispatch.max_replies),
            event_capacity: dispatch.event_capacity.max(1),
        })
    }

    /// Replace the quiet window.
    #[must_use]
    pub fn with_quiet_window(mut self, quiet_window: Duration) -> Self {
        self.quiet_window = quiet_window;
        self
    }

    /// Replace the delivery order.
    #[must_use]
    pub fn with_delivery(mut self, delivery: DeliveryOrder) -> Self {
        self.delivery = delivery;
        self
    }

    /// Replace the reply timeout.
    #[must_use]
    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    /// Replace the reply limit.
    #[must_use]
    pub fn with_max_replies(mut self, max_replies: Option<u32>) -> Self {
        self.max_replies = max_replies;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings_defaults() {
        let settings = GeoliveSettings::default();
        let config = DispatchConfig::from_settings(&settings, "countries").unwrap();
        assert_eq!(config, DispatchConfig::default());
    }

    #[test]
    fn units_channel_dispatches_immediately() {
        let settings = GeoliveSettings::default();
        let config = DispatchConfig::from_settings(&settings, "units").unwrap();
        assert_eq!(config.quiet_window, Duration::ZERO);
    }

    #[test]
    fn zero_max_replies_means_unbounded() {
        let mut settings = GeoliveSettings::default();
        settings.dispatch.max_replies = 0;
        let config = DispatchConfig::from_settings(&settings, "currencies").unwrap();
        assert_eq!(config.max_replies, None);
    }

    #[test]
    fn unknown_channel_is_error() {
        let settings = GeoliveSettings::default();
        assert!(DispatchConfig::from_settings(&settings, "rates").is_err());
    }

    #[test]
    fn builder_methods_replace_fields() {
        let config = DispatchConfig::default()
            .with_quiet_window(Duration::from_millis(50))
            .with_delivery(DeliveryOrder::ReceiptOrder)
            .with_reply_timeout(Duration::from_secs(1))
            .with_max_replies(None);
        assert_eq!(config.quiet_window, Duration::from_millis(50));
        assert_eq!(config.delivery, DeliveryOrder::ReceiptOrder);
        assert_eq!(config.reply_timeout, Duration::from_secs(1));
        assert_eq!(config.max_replies, None);
    }
}
