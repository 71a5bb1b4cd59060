//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ClientSettings::default()`]
//! 2. If `~/.signalr/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `SIGNALR_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::ClientSettings;

/// Resolve the path to the settings file (`~/.signalr/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".signalr").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<ClientSettings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, reading overrides through `lookup`.
pub fn load_settings_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings> {
    let defaults = serde_json::to_value(ClientSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ClientSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    validate(&settings)?;
    Ok(settings)
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

/// Apply `SIGNALR_*` overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let ranged = |name: &str, min: u64, max: u64| {
        let val = lookup(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    };

    if let Some(v) = string("SIGNALR_CONNECTION_STRING") {
        settings.connection_string = Some(v);
    }
    if let Some(v) = string("SIGNALR_HUB") {
        settings.hub = Some(v);
    }
    if let Some(v) = string("SIGNALR_CLIENT_NAME") {
        settings.name = Some(v);
    }
    if let Some(v) = string("SIGNALR_ROLE") {
        match v.parse() {
            Ok(role) => settings.role = role,
            Err(e) => tracing::warn!(key = "SIGNALR_ROLE", error = %e, "invalid role, ignoring"),
        }
    }
    if let Some(v) = ranged("SIGNALR_READ_TIMEOUT_MS", 100, 600_000) {
        settings.read_timeout_ms = v;
    }
    if let Some(v) = ranged("SIGNALR_HANDSHAKE_TIMEOUT_MS", 100, 600_000) {
        settings.handshake_timeout_ms = v;
    }
    if let Some(v) = ranged("SIGNALR_TOKEN_TTL_SECS", 60, 86_400) {
        settings.token_ttl_secs = v;
    }
}

/// Reject values no client could run with.
pub fn validate(settings: &ClientSettings) -> Result<()> {
    if settings.read_timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "readTimeoutMs must be positive".to_string(),
        ));
    }
    if settings.handshake_timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "handshakeTimeoutMs must be positive".to_string(),
        ));
    }
    if settings.token_ttl_secs == 0 {
        return Err(SettingsError::InvalidValue(
            "tokenTtlSecs must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use assert_matches::assert_matches;
    use signalr_auth::AudienceRole;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": 10});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 10);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"x": {"y": 1, "z": 2}});
        let source = serde_json::json!({"x": {"y": 9}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["x"]["y"], 9);
        assert_eq!(merged["x"]["z"], 2);
    }

    // ── loading ─────────────────────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let path = Path::new("/nonexistent/settings.json");
        let settings = load_settings_with(path, env(&[])).unwrap();
        assert_eq!(settings.read_timeout_ms, 5_000);
        assert!(settings.hub.is_none());
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"hub": "chat", "tokenTtlSecs": 600}"#).unwrap();

        let settings = load_settings_with(&path, env(&[])).unwrap();
        assert_eq!(settings.hub.as_deref(), Some("chat"));
        assert_eq!(settings.token_ttl_secs, 600);
        assert_eq!(settings.read_timeout_ms, 5_000);
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"hub": "chat", "name": "file-name"}"#).unwrap();

        let settings = load_settings_with(
            &path,
            env(&[
                ("SIGNALR_HUB", "other"),
                ("SIGNALR_READ_TIMEOUT_MS", "2500"),
                ("SIGNALR_ROLE", "server"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.hub.as_deref(), Some("other"));
        assert_eq!(settings.name.as_deref(), Some("file-name"));
        assert_eq!(settings.read_timeout_ms, 2500);
        assert_eq!(settings.role, AudienceRole::Server);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = ClientSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("SIGNALR_READ_TIMEOUT_MS", "soon"),
                ("SIGNALR_TOKEN_TTL_SECS", "5"),
                ("SIGNALR_ROLE", "admin"),
                ("SIGNALR_HUB", ""),
            ]),
        );
        assert_eq!(settings.read_timeout_ms, 5_000);
        assert_eq!(settings.token_ttl_secs, 7_200);
        assert_eq!(settings.role, AudienceRole::Client);
        assert!(settings.hub.is_none());
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        assert_matches!(
            load_settings_with(&path, env(&[])),
            Err(SettingsError::Json(_))
        );
    }

    #[test]
    fn zero_timeout_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"readTimeoutMs": 0}"#).unwrap();

        assert_matches!(
            load_settings_with(&path, env(&[])),
            Err(SettingsError::InvalidValue(_))
        );
    }

    // ── parse_u64_range ─────────────────────────────────────────────

    #[test]
    fn parse_u64_valid() {
        assert_eq!(parse_u64_range("30000", 1000, 600_000), Some(30_000));
        assert_eq!(parse_u64_range("1000", 1000, 600_000), Some(1000));
    }

    #[test]
    fn parse_u64_out_of_range() {
        assert_eq!(parse_u64_range("500", 1000, 600_000), None);
        assert_eq!(parse_u64_range("700000", 1000, 600_000), None);
        assert_eq!(parse_u64_range("abc", 1000, 600_000), None);
    }
}
