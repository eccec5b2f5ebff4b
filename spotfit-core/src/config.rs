//! Configuration management for the spotfit host

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{Result, SpotfitError};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upper bound on how long plugins get to dispose during shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout(),
            log_level: default_log_level(),
            plugins: Vec::new(),
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpotfitError::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| SpotfitError::config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SpotfitError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SpotfitError::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.shutdown_timeout_secs == 0 {
            return Err(SpotfitError::config(
                "shutdown_timeout_secs must be greater than zero",
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(SpotfitError::config(format!(
                "Unknown log level '{}', expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        let mut seen = HashSet::new();
        for plugin in &self.plugins {
            plugin.validate()?;
            if !seen.insert(plugin.name.as_str()) {
                return Err(SpotfitError::config(format!(
                    "Plugin '{}' is configured more than once",
                    plugin.name
                )));
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_environment_overrides(
        &mut self,
        env_overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (key, value) in env_overrides {
            match key.as_str() {
                "SPOTFIT_LOG_LEVEL" => self.log_level = value.to_lowercase(),
                "SPOTFIT_SHUTDOWN_TIMEOUT" => {
                    self.shutdown_timeout_secs = value.parse().map_err(|_| {
                        SpotfitError::config(format!(
                            "Invalid timeout in environment variable: {}",
                            value
                        ))
                    })?;
                }
                _ => {
                    // Ignore unknown environment variables
                }
            }
        }
        Ok(())
    }

    /// Collect the `SPOTFIT_*` variables from the process environment
    pub fn environment_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("SPOTFIT_"))
            .collect()
    }

    /// Get plugin configuration by name
    pub fn get_plugin_config(&self, name: &str) -> Option<&PluginConfig> {
        self.plugins.iter().find(|p| p.name == name)
    }

    /// Add or update plugin configuration
    pub fn set_plugin_config(&mut self, config: PluginConfig) {
        if let Some(existing) = self.plugins.iter_mut().find(|p| p.name == config.name) {
            *existing = config;
        } else {
            self.plugins.push(config);
        }
    }

    /// Plugins without an entry are enabled
    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.get_plugin_config(name)
            .map(|p| p.enabled)
            .unwrap_or(true)
    }

    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl PluginConfig {
    /// Create a new enabled plugin configuration
    pub fn new(name: String) -> Self {
        Self {
            name,
            enabled: true,
            settings: HashMap::new(),
        }
    }

    /// Get a typed setting
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.settings
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a typed setting
    pub fn set<T>(&mut self, key: String, value: T) -> Result<()>
    where
        T: Serialize,
    {
        let json_value = serde_json::to_value(value)?;
        self.settings.insert(key, json_value);
        Ok(())
    }

    /// Validate plugin configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SpotfitError::config("Plugin name cannot be empty"));
        }
        Ok(())
    }
}
