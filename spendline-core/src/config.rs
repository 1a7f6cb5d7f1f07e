//! Configuration management
//!
//! settings.json in the data directory:
//! ```json
//! {
//!   "app": { "offlineMode": false },
//!   "session": { "timeoutSecs": 600, "checkIntervalSecs": 30 },
//!   "sync": { "replayDelayMs": 1500, "syncedDisplayMs": 3000 },
//!   "latency": { "loginMs": 1000, "signupMs": 1000, "saveMs": 600 }
//! }
//! ```
//! Keys this crate does not know about are written back untouched.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

type Extra = HashMap<String, serde_json::Value>;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    session: SessionSettings,
    #[serde(default)]
    sync: SyncSettings,
    #[serde(default)]
    latency: LatencySettings,
    #[serde(flatten)]
    other: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    offline_mode: bool,
    #[serde(flatten)]
    other: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check_interval_secs: Option<u64>,
    #[serde(flatten)]
    other: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    replay_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    synced_display_ms: Option<u64>,
    #[serde(flatten)]
    other: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatencySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    login_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signup_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    save_ms: Option<u64>,
    #[serde(flatten)]
    other: Extra,
}

/// Simulated round-trip waits for the auth and save flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub login: Duration,
    pub signup: Duration,
    pub save: Duration,
}

impl Latency {
    pub const NONE: Latency = Latency {
        login: Duration::ZERO,
        signup: Duration::ZERO,
        save: Duration::ZERO,
    };
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            login: Duration::from_millis(1000),
            signup: Duration::from_millis(1000),
            save: Duration::from_millis(600),
        }
    }
}

/// Spendline configuration (resolved view of settings.json)
#[derive(Debug, Clone)]
pub struct Config {
    pub offline_mode: bool,
    pub session_timeout: Duration,
    pub check_interval: Duration,
    pub replay_delay: Duration,
    pub synced_display: Duration,
    pub latency: Latency,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            offline_mode: false,
            session_timeout: Duration::from_secs(600),
            check_interval: Duration::from_secs(30),
            replay_delay: Duration::from_millis(1500),
            synced_display: Duration::from_millis(3000),
            latency: Latency::default(),
        }
    }
}

/// Parse a boolean-ish environment value
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn read_settings(settings_path: &Path) -> Result<SettingsFile> {
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!(
            "[spendline] Ignoring unreadable {}: {}",
            settings_path.display(),
            e
        );
        SettingsFile::default()
    }))
}

impl Config {
    /// Config with no simulated waits, for tests and scripted use
    pub fn instant() -> Self {
        Self {
            replay_delay: Duration::ZERO,
            synced_display: Duration::ZERO,
            latency: Latency::NONE,
            ..Self::default()
        }
    }

    /// Load config from the data directory.
    ///
    /// Offline mode can also be forced with SPENDLINE_OFFLINE_MODE.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(&data_dir.join("settings.json"))?;
        let defaults = Self::default();

        let offline_mode = std::env::var("SPENDLINE_OFFLINE_MODE")
            .ok()
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(raw.app.offline_mode);

        let secs = |v: Option<u64>, d: Duration| v.map(Duration::from_secs).unwrap_or(d);
        let millis = |v: Option<u64>, d: Duration| v.map(Duration::from_millis).unwrap_or(d);

        Ok(Self {
            offline_mode,
            session_timeout: secs(raw.session.timeout_secs, defaults.session_timeout),
            // A zero period would spin the watchdog
            check_interval: secs(raw.session.check_interval_secs, defaults.check_interval)
                .max(Duration::from_secs(1)),
            replay_delay: millis(raw.sync.replay_delay_ms, defaults.replay_delay),
            synced_display: millis(raw.sync.synced_display_ms, defaults.synced_display),
            latency: Latency {
                login: millis(raw.latency.login_ms, defaults.latency.login),
                signup: millis(raw.latency.signup_ms, defaults.latency.signup),
                save: millis(raw.latency.save_ms, defaults.latency.save),
            },
        })
    }

    /// Save the offline flag, preserving everything else in the file
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");
        let mut settings = read_settings(&settings_path)?;

        settings.app.offline_mode = self.offline_mode;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }
}
