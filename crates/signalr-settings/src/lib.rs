//! # signalr-settings
//!
//! Client configuration loaded from `~/.signalr/settings.json` with
//! `SIGNALR_*` environment variable overrides.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_overrides, deep_merge, load_settings, load_settings_from_path, load_settings_with,
    settings_path,
};
pub use types::ClientSettings;
