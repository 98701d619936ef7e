//! # geolive-settings
//!
//! Configuration for geolive dispatchers.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`GeoliveSettings::default()`]
//! 2. **User file**: `~/.geolive/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `GEOLIVE_*` overrides (highest priority)
//!
//! The defaults describe the three live-search channels of the geocurrency
//! front end: `countries`, `currencies`, and `units`, all on
//! `ws://127.0.0.1:8000`.
//!
//! ```no_run
//! let settings = geolive_settings::load_settings().unwrap_or_default();
//! let endpoint = settings.endpoint_for("countries").unwrap();
//! assert_eq!(endpoint.path(), "/countries");
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings, load_settings_from_path,
    load_settings_with, settings_path,
};
pub use types::*;
