//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use geolive_core::DeliveryOrder;
use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::GeoliveSettings;

/// Resolve the path to the settings file (`~/.geolive/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".geolive").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<GeoliveSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a merged result that
/// fails [`GeoliveSettings::validate`] is an error.
pub fn load_settings_from_path(path: &Path) -> Result<GeoliveSettings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// Like [`load_settings_from_path`], reading overrides through `lookup`.
pub fn load_settings_with<F>(path: &Path, lookup: F) -> Result<GeoliveSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = read_file_layer(path)?;
    apply_overrides_from(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<GeoliveSettings> {
    let defaults = serde_json::to_value(GeoliveSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `GEOLIVE_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut GeoliveSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` to read variables.
///
/// Invalid values are ignored with a warning and the file/default value is kept.
pub fn apply_overrides_from<F>(settings: &mut GeoliveSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("GEOLIVE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("GEOLIVE_PORT") {
        if let Some(port) = checked(&v, "GEOLIVE_PORT", |s| parse_u64_range(s, 1, 65_535)) {
            settings.server.port = u16::try_from(port).unwrap_or(settings.server.port);
        }
    }
    if let Some(v) = read("GEOLIVE_SECURE") {
        if let Some(secure) = checked(&v, "GEOLIVE_SECURE", parse_bool) {
            settings.server.secure = secure;
        }
    }
    if let Some(v) = read("GEOLIVE_QUIET_WINDOW_MS") {
        if let Some(ms) = checked(&v, "GEOLIVE_QUIET_WINDOW_MS", |s| {
            parse_u64_range(s, 0, 60_000)
        }) {
            settings.dispatch.quiet_window_ms = ms;
        }
    }
    if let Some(v) = read("GEOLIVE_REPLY_TIMEOUT_MS") {
        if let Some(ms) = checked(&v, "GEOLIVE_REPLY_TIMEOUT_MS", |s| {
            parse_u64_range(s, 1, 3_600_000)
        }) {
            settings.dispatch.reply_timeout_ms = ms;
        }
    }
    if let Some(v) = read("GEOLIVE_DELIVERY") {
        if let Some(order) = checked(&v, "GEOLIVE_DELIVERY", |s| s.parse::<DeliveryOrder>().ok()) {
            settings.dispatch.delivery = order;
        }
    }
    if let Some(v) = read("GEOLIVE_LOG_LEVEL") {
        if geolive_core::logging::is_valid_level(&v) {
            settings.logging.level = v.to_ascii_lowercase();
        } else {
            tracing::warn!(key = "GEOLIVE_LOG_LEVEL", value = %v, "invalid env var, ignoring");
        }
    }
}

fn checked<T>(val: &str, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let result = parse(val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8000, "host": "localhost"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_new_keys_added() {
        let target = serde_json::json!({"channels": {"units": {"path": "/units"}}});
        let source = serde_json::json!({"channels": {"rates": {"path": "/rates"}}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["channels"]["units"]["path"], "/units");
        assert_eq!(merged["channels"]["rates"]["path"], "/rates");
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = read_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, GeoliveSettings::default());
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9090}, "dispatch": {"delivery": "receipt-order"}}"#,
        )
        .unwrap();

        let settings = read_file_layer(&path).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.dispatch.delivery, DeliveryOrder::ReceiptOrder);
        assert_eq!(settings.dispatch.quiet_window_ms, 500);
    }

    #[test]
    fn load_adds_channel_and_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"channels": {"rates": {"path": "/rates", "sink": "rates_stream", "quietWindowMs": 250}}}"#,
        )
        .unwrap();

        let settings = read_file_layer(&path).unwrap();
        assert_eq!(settings.channels.len(), 4);
        assert_eq!(settings.channel("rates").unwrap().quiet_window_ms, Some(250));
        assert_eq!(settings.channel("countries").unwrap().sink, "countries_stream");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        assert!(matches!(
            load_settings_from_path(&path).unwrap_err(),
            SettingsError::Json(_)
        ));
    }

    #[test]
    fn load_rejects_invalid_merged_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"channels": {"rates": {"sink": "rates_stream"}}}"#).unwrap();

        assert!(matches!(
            load_settings_from_path(&path).unwrap_err(),
            SettingsError::InvalidValue(_)
        ));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = GeoliveSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("GEOLIVE_HOST", "geo.internal"),
                ("GEOLIVE_PORT", "9443"),
                ("GEOLIVE_SECURE", "yes"),
                ("GEOLIVE_QUIET_WINDOW_MS", "250"),
                ("GEOLIVE_REPLY_TIMEOUT_MS", "2000"),
                ("GEOLIVE_DELIVERY", "receipt-order"),
                ("GEOLIVE_LOG_LEVEL", "DEBUG"),
            ]),
        );
        assert_eq!(settings.server.host, "geo.internal");
        assert_eq!(settings.server.port, 9443);
        assert!(settings.server.secure);
        assert_eq!(settings.dispatch.quiet_window_ms, 250);
        assert_eq!(settings.dispatch.reply_timeout_ms, 2000);
        assert_eq!(settings.dispatch.delivery, DeliveryOrder::ReceiptOrder);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut settings = GeoliveSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("GEOLIVE_PORT", "0"),
                ("GEOLIVE_SECURE", "maybe"),
                ("GEOLIVE_QUIET_WINDOW_MS", "-5"),
                ("GEOLIVE_DELIVERY", "random"),
                ("GEOLIVE_LOG_LEVEL", "loud"),
            ]),
        );
        assert_eq!(settings, GeoliveSettings::default());
    }

    #[test]
    fn empty_env_values_ignored() {
        let mut settings = GeoliveSettings::default();
        apply_overrides_from(&mut settings, env(&[("GEOLIVE_HOST", "")]));
        assert_eq!(settings.server.host, "127.0.0.1");
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("0", 0, 10), Some(0));
        assert_eq!(parse_u64_range("10", 0, 10), Some(10));
        assert_eq!(parse_u64_range("11", 0, 10), None);
        assert_eq!(parse_u64_range("x", 0, 10), None);
    }
}
