//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial
//! JSON is accepted and missing fields keep their default value.

mod channel;
mod dispatch;
mod server;

pub use channel::*;
pub use dispatch::*;
pub use server::*;

use std::collections::BTreeMap;
use std::time::Duration;

use geolive_core::Endpoint;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "host": "10.0.0.5", "port": 9000 },
///   "dispatch": { "quietWindowMs": 300, "delivery": "receipt-order" },
///   "channels": { "rates": { "path": "/rates", "sink": "rates_stream" } }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeoliveSettings {
    /// Settings schema version.
    pub version: String,
    /// Remote server shared by all channels.
    pub server: ServerSettings,
    /// Debounce and session tuning shared by all channels.
    pub dispatch: DispatchSettings,
    /// Channels by name.
    pub channels: BTreeMap<String, ChannelSettings>,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for GeoliveSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            server: ServerSettings::default(),
            dispatch: DispatchSettings::default(),
            channels: default_channels(),
            logging: LoggingSettings::default(),
        }
    }
}

impl GeoliveSettings {
    /// Look up a channel by name.
    pub fn channel(&self, name: &str) -> Result<&ChannelSettings> {
        self.channels
            .get(name)
            .ok_or_else(|| SettingsError::UnknownChannel(name.to_string()))
    }

    /// Endpoint of a channel on the configured server.
    pub fn endpoint_for(&self, name: &str) -> Result<Endpoint> {
        let channel = self.channel(name)?;
        Ok(Endpoint::new(
            self.server.scheme(),
            self.server.host.clone(),
            self.server.port,
            &channel.path,
        ))
    }

    /// Quiet window of a channel: its own override, else the shared default.
    pub fn quiet_window_for(&self, name: &str) -> Result<Duration> {
        let channel = self.channel(name)?;
        let ms = channel
            .quiet_window_ms
            .unwrap_or(self.dispatch.quiet_window_ms);
        Ok(Duration::from_millis(ms))
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue("server.host is empty".into()));
        }
        if self.server.port == 0 {
            return Err(SettingsError::InvalidValue("server.port is 0".into()));
        }
        if self.dispatch.reply_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "dispatch.replyTimeoutMs must be positive".into(),
            ));
        }
        if self.dispatch.event_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "dispatch.eventCapacity must be positive".into(),
            ));
        }
        if !geolive_core::logging::is_valid_level(&self.logging.level) {
            return Err(SettingsError::InvalidValue(format!(
                "logging.level: {}",
                self.logging.level
            )));
        }
        for (name, channel) in &self.channels {
            if channel.path.trim().is_empty() {
                return Err(SettingsError::InvalidValue(format!(
                    "channels.{name}.path is empty"
                )));
            }
            if channel.sink.trim().is_empty() {
                return Err(SettingsError::InvalidValue(format!(
                    "channels.{name}.sink is empty"
                )));
            }
        }
        Ok(())
    }
}
