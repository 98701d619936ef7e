use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One live-search channel: a logical path on the server and the sink it renders into.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSettings {
    /// Logical path on the server, e.g. `/countries`.
    pub path: String,
    /// Selector of the output location.
    pub sink: String,
    /// Per-channel quiet window; falls back to `dispatch.quietWindowMs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_window_ms: Option<u64>,
}

impl ChannelSettings {
    fn new(path: &str, sink: &str, quiet_window_ms: Option<u64>) -> Self {
        Self {
            path: path.to_string(),
            sink: sink.to_string(),
            quiet_window_ms,
        }
    }
}

/// The three channels of the geocurrency search pages.
///
/// Unit selection dispatches on every change, so its quiet window is zero.
pub fn default_channels() -> BTreeMap<String, ChannelSettings> {
    BTreeMap::from([
        (
            "countries".to_string(),
            ChannelSettings::new("/countries", "countries_stream", None),
        ),
        (
            "currencies".to_string(),
            ChannelSettings::new("/currencies", "currencies_stream", None),
        ),
        (
            "units".to_string(),
            ChannelSettings::new("/units", "dest_units_list", Some(0)),
        ),
    ])
}
