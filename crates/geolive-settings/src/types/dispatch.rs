use geolive_core::DeliveryOrder;
use serde::{Deserialize, Serialize};

/// Debounce and session tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchSettings {
    /// Idle time after the last trigger before a session opens.
    pub quiet_window_ms: u64,
    /// How overlapping sessions share the sink.
    pub delivery: DeliveryOrder,
    /// Close a session when no message arrives for this long.
    pub reply_timeout_ms: u64,
    /// Close a session after this many applied replies. `0` keeps it open until the server closes.
    pub max_replies: u32,
    /// Buffer size of the dispatch event channel.
    pub event_capacity: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            quiet_window_ms: 500,
            delivery: DeliveryOrder::LatestWins,
            reply_timeout_ms: 10_000,
            max_replies: 1,
            event_capacity: 64,
        }
    }
}
