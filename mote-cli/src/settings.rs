//! Persistent settings

use std::path::PathBuf;
use std::time::Duration;

use mote_list::{
    BackendFailurePolicy, ManualPortCheck, PollerConfig, RegistryConfig, ScannerConfig,
};
use serde::{Deserialize, Serialize};

/// Mote registered by hand on every start
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualMote {
    /// Serial port path
    pub port: String,
    /// Display name
    pub name: String,
    /// Serial number or other identifier
    #[serde(default)]
    pub reference: String,
}

/// Application settings. Missing fields take their default value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Delay between scans in watch mode (milliseconds)
    pub poll_interval_ms: u64,
    /// Skip ports whose name contains any of these patterns
    pub skip_patterns: Vec<String>,
    /// List only ports behind a known USB-serial bridge
    pub only_known_adapters: bool,
    /// Validation of manually added ports
    pub manual_port_check: ManualPortCheck,
    /// Behavior when the platform scan fails
    pub backend_failure: BackendFailurePolicy,
    /// Motes to register on startup
    pub manual_motes: Vec<ManualMote>,
}

impl Default for Settings {
    fn default() -> Self {
        let scanner = ScannerConfig::default();
        Self {
            poll_interval_ms: 1000,
            skip_patterns: scanner.skip_patterns,
            only_known_adapters: scanner.only_known_adapters,
            manual_port_check: ManualPortCheck::default(),
            backend_failure: BackendFailurePolicy::default(),
            manual_motes: Vec::new(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for motelist
    /// Uses $XDG_CONFIG_HOME/motelist on Linux/macOS, falls back to ~/.config/motelist
    fn config_dir() -> Option<PathBuf> {
        // First try XDG_CONFIG_HOME environment variable
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("motelist"));
            }
        }

        // Fall back to ~/.config/motelist (XDG default)
        dirs::home_dir().map(|h| h.join(".config").join("motelist"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| Self::parse(&s))
            .unwrap_or_default()
    }

    fn parse(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("Ignoring malformed settings file: {}", e);
                None
            }
        }
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            skip_patterns: self.skip_patterns.clone(),
            only_known_adapters: self.only_known_adapters,
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            manual_port_check: self.manual_port_check,
            backend_failure: self.backend_failure,
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
