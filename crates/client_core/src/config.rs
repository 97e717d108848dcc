use std::{fs, time::Duration};

use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub socket_url: String,
    pub reconnect_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api/units".into(),
            socket_url: "http://localhost:5000".into(),
            reconnect_delay_ms: 1000,
        }
    }
}

impl Settings {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    resolve_settings(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file, then the environment. Blank
/// environment values count as unset.
pub fn resolve_settings(file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = match file {
        Some(raw) => toml::from_str::<Settings>(raw).unwrap_or_else(|err| {
            warn!(file = SETTINGS_FILE, error = %err, "ignoring unreadable settings file");
            Settings::default()
        }),
        None => Settings::default(),
    };

    let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    for key in ["UNIT_API_URL", "APP__API_URL"] {
        if let Some(v) = lookup(key) {
            settings.api_url = v;
        }
    }

    for key in ["UNIT_SOCKET_URL", "APP__SOCKET_URL"] {
        if let Some(v) = lookup(key) {
            settings.socket_url = v;
        }
    }

    if let Some(v) = lookup("APP__RECONNECT_DELAY_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.reconnect_delay_ms = parsed,
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__RECONNECT_DELAY_MS"),
        }
    }

    settings
}
