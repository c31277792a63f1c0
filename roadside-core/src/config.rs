//! Configuration management
//!
//! Settings live in `settings.json` in the profile directory:
//! ```json
//! {
//!   "app": { "mockMode": false },
//!   "hosted": { "url": "https://xyz.supabase.co", "anonKey": "..." },
//!   "boot": { "timeoutMs": 5000 },
//!   "geocoding": { "baseUrl": "https://nominatim.openstreetmap.org" }
//! }
//! ```
//!
//! Environment variables override the file and are read once, at load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default bound on the boot-time current-user lookup
pub const DEFAULT_BOOT_TIMEOUT_MS: u64 = 5000;

/// Public Nominatim instance
pub const DEFAULT_GEOCODING_URL: &str = "https://nominatim.openstreetmap.org";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    hosted: HostedSettings,
    #[serde(default)]
    boot: BootSettings,
    #[serde(default)]
    geocoding: GeocodingSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    mock_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostedSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anon_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BootSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeocodingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
}

/// Which backend serves auth and requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Everything in the local store; no network
    Mock,
    /// Hosted auth + table service
    Hosted,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Mock => write!(f, "mock"),
            Mode::Hosted => write!(f, "hosted"),
        }
    }
}

/// Whether collaborators outside the facade may reach the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkPolicy {
    Open,
    /// Mock mode is switched on explicitly
    Blocked,
}

/// Roadside configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub mock_mode: bool,
    pub hosted_url: Option<String>,
    pub hosted_anon_key: Option<String>,
    pub boot_timeout: Duration,
    pub geocoding_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mock_mode: false,
            hosted_url: None,
            hosted_anon_key: None,
            boot_timeout: Duration::from_millis(DEFAULT_BOOT_TIMEOUT_MS),
            geocoding_base_url: DEFAULT_GEOCODING_URL.to_string(),
        }
    }
}

impl Config {
    /// Load config from the profile directory, then apply environment overrides
    pub fn load(dir: &Path) -> Result<Self> {
        let raw = read_settings(dir)?;
        let mut config = Self::from_settings(&raw);
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn from_settings(raw: &SettingsFile) -> Self {
        let defaults = Self::default();
        Self {
            mock_mode: raw.app.mock_mode,
            hosted_url: non_empty(raw.hosted.url.clone()),
            hosted_anon_key: non_empty(raw.hosted.anon_key.clone()),
            boot_timeout: raw
                .boot
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.boot_timeout),
            geocoding_base_url: non_empty(raw.geocoding.base_url.clone())
                .unwrap_or(defaults.geocoding_base_url),
        }
    }

    /// Apply `ROADSIDE_*` overrides from `lookup`
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("ROADSIDE_MOCK_MODE").as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => self.mock_mode = true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => self.mock_mode = false,
            _ => {}
        }
        if let Some(url) = non_empty(lookup("ROADSIDE_SUPABASE_URL")) {
            self.hosted_url = Some(url);
        }
        if let Some(key) = non_empty(lookup("ROADSIDE_SUPABASE_ANON_KEY")) {
            self.hosted_anon_key = Some(key);
        }
        if let Some(ms) = lookup("ROADSIDE_BOOT_TIMEOUT_MS").and_then(|v| v.trim().parse().ok()) {
            self.boot_timeout = Duration::from_millis(ms);
        }
    }

    /// Hosted mode needs both credentials and mock mode switched off
    pub fn mode(&self) -> Mode {
        if !self.mock_mode && self.hosted_url.is_some() && self.hosted_anon_key.is_some() {
            Mode::Hosted
        } else {
            Mode::Mock
        }
    }

    /// Only the mock-mode switch blocks fetches; missing hosted credentials
    /// fall back to the local store but leave geocoding and tiles reachable.
    pub fn network_policy(&self) -> NetworkPolicy {
        if self.mock_mode {
            NetworkPolicy::Blocked
        } else {
            NetworkPolicy::Open
        }
    }

    /// Save the mock-mode switch to the profile directory
    /// Preserves every other setting in the file
    pub fn save(&self, dir: &Path) -> Result<()> {
        let settings_path = dir.join("settings.json");
        let mut settings = read_settings(dir)?;

        // Environment overrides are never persisted
        settings.app.mock_mode = self.mock_mode;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }
}

fn read_settings(dir: &Path) -> Result<SettingsFile> {
    let settings_path = dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Profile directory: `ROADSIDE_DIR`, else `~/.roadside`
pub fn roadside_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ROADSIDE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".roadside"))
        .context("Could not find home directory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_file_is_mock_mode() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_settings(&read_settings(dir.path()).unwrap());
        assert_eq!(config.mode(), Mode::Mock);
        assert_eq!(config.boot_timeout, Duration::from_millis(5000));
        assert_eq!(config.geocoding_base_url, DEFAULT_GEOCODING_URL);
    }

    #[test]
    fn test_credentials_select_hosted_mode() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("ROADSIDE_SUPABASE_URL", "https://demo.supabase.co"),
            ("ROADSIDE_SUPABASE_ANON_KEY", "anon"),
        ]));
        assert_eq!(config.mode(), Mode::Hosted);

        // Mock mode wins even with credentials present
        config.apply_overrides(env(&[("ROADSIDE_MOCK_MODE", "1")]));
        assert_eq!(config.mode(), Mode::Mock);
    }

    #[test]
    fn test_url_without_key_stays_mock() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("ROADSIDE_SUPABASE_URL", "https://demo.supabase.co"),
            ("ROADSIDE_SUPABASE_ANON_KEY", "   "),
        ]));
        assert_eq!(config.mode(), Mode::Mock);
    }

    #[test]
    fn test_network_policy_follows_mock_switch() {
        // No credentials: the backend falls back to mock but fetches stay open
        let config = Config::default();
        assert_eq!(config.mode(), Mode::Mock);
        assert_eq!(config.network_policy(), NetworkPolicy::Open);

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("settings.json"), r#"{"app": {"mockMode": true}}"#).unwrap();
        let config = Config::from_settings(&read_settings(dir.path()).unwrap());
        assert_eq!(config.network_policy(), NetworkPolicy::Blocked);
    }

    #[test]
    fn test_boot_timeout_override() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("ROADSIDE_BOOT_TIMEOUT_MS", "250")]));
        assert_eq!(config.boot_timeout, Duration::from_millis(250));

        config.apply_overrides(env(&[("ROADSIDE_BOOT_TIMEOUT_MS", "soon")]));
        assert_eq!(config.boot_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"mockMode": false, "theme": "dark"}, "extra": [1, 2]}"#,
        )
        .unwrap();

        let mut config = Config::from_settings(&read_settings(dir.path()).unwrap());
        config.mock_mode = true;
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("settings.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["app"]["mockMode"], true);
        assert_eq!(saved["app"]["theme"], "dark");
        assert_eq!(saved["extra"], serde_json::json!([1, 2]));

        let reloaded = Config::from_settings(&read_settings(dir.path()).unwrap());
        assert!(reloaded.mock_mode);
    }
}
