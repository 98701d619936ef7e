//! Server and logging settings.

use geolive_core::Scheme;
use serde::{Deserialize, Serialize};

/// Remote server shared by all channels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
    /// Handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl ServerSettings {
    /// Scheme implied by [`secure`](Self::secure).
    pub fn scheme(&self) -> Scheme {
        if self.secure { Scheme::Wss } else { Scheme::Ws }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            secure: false,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level; `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
