//! Dispatcher and session lifecycle states.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a dispatcher as a whole.
///
/// `Armed` wins over `Dispatching`: a pending timer is reported even while an
/// earlier session is still in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherState {
    /// No timer pending and no session in flight.
    #[default]
    Idle,
    /// A scheduled action is waiting for the quiet window to elapse.
    Armed,
    /// At least one session is open.
    Dispatching,
}

/// Lifecycle of one channel session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Handshake in progress.
    Opening,
    /// Value sent, receiving replies.
    Open,
    /// Ended normally (remote close, reply limit, or superseded).
    Closed,
    /// Ended by a transport error or timeout.
    Failed,
}

impl SessionState {
    /// Whether the session has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// How inbound messages from overlapping sessions reach the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryOrder {
    /// Drop messages from sessions older than the newest one that has delivered.
    #[default]
    LatestWins,
    /// Apply every message as it arrives, even if a newer session already rendered.
    ReceiptOrder,
}

impl DeliveryOrder {
    /// Wire/config spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LatestWins => "latest-wins",
            Self::ReceiptOrder => "receipt-order",
        }
    }
}

impl fmt::Display for DeliveryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "latest-wins" | "latest" => Ok(Self::LatestWins),
            "receipt-order" | "receipt" => Ok(Self::ReceiptOrder),
            other => Err(format!("unknown delivery order: {other}")),
        }
    }
}
