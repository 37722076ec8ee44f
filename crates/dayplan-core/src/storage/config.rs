//! TOML-based application configuration.
//!
//! Stores:
//! - Working-day boundaries, buffer and estimate cap
//! - Oracle endpoint, models, timeout and failure policy
//! - Export defaults (attendee, colour)
//!
//! Configuration is stored at `~/.config/dayplan/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use super::data_dir;
use crate::error::ConfigError;
use crate::export::EventExporter;
use crate::oracle::CompletionSettings;
use crate::scheduler::SchedulerConfig;
use crate::timeline::{parse_time_of_day, DayWindow};

/// Working-day configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayConfig {
    #[serde(default = "default_day_start")]
    pub start: String,
    #[serde(default = "default_day_end")]
    pub end: String,
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: i64,
    #[serde(default = "default_max_estimate_minutes")]
    pub max_estimate_minutes: i64,
    /// Label written into exported events' `timeZone`.
    #[serde(default = "default_timezone_label")]
    pub timezone_label: String,
    /// From this time on, planning targets the next day.
    #[serde(default = "default_next_day_cutoff")]
    pub next_day_cutoff: String,
}

/// Oracle endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_slot_model")]
    pub slot_model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub transport_failures_fatal: bool,
    #[serde(default = "default_priority_temperature")]
    pub priority_temperature: f64,
    #[serde(default = "default_slot_temperature")]
    pub slot_temperature: f64,
}

/// Export configuration. Empty strings leave the field out of exported events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub attendee_email: String,
    #[serde(default = "default_color_id")]
    pub color_id: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dayplan/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub day: DayConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

// Default functions
fn default_day_start() -> String {
    "08:30".into()
}
fn default_day_end() -> String {
    "23:00".into()
}
fn default_buffer_minutes() -> i64 {
    10
}
fn default_max_estimate_minutes() -> i64 {
    180
}
fn default_timezone_label() -> String {
    "UTC".into()
}
fn default_next_day_cutoff() -> String {
    "21:00".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_slot_model() -> String {
    "gpt-4-turbo".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_priority_temperature() -> f64 {
    0.3
}
fn default_slot_temperature() -> f64 {
    0.7
}
fn default_color_id() -> String {
    "1".into()
}

impl Default for DayConfig {
    fn default() -> Self {
        Self {
            start: default_day_start(),
            end: default_day_end(),
            buffer_minutes: default_buffer_minutes(),
            max_estimate_minutes: default_max_estimate_minutes(),
            timezone_label: default_timezone_label(),
            next_day_cutoff: default_next_day_cutoff(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            slot_model: default_slot_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            transport_failures_fatal: false,
            priority_temperature: default_priority_temperature(),
            slot_temperature: default_slot_temperature(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            attendee_email: String::new(),
            color_id: default_color_id(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };

        let mut current = root;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }
        let obj = current
            .as_object_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let existing = obj
            .get(leaf)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => {
                serde_json::Value::Bool(value.parse::<bool>().map_err(|e| invalid(e.to_string()))?)
            }
            serde_json::Value::Number(_) => {
                if let Ok(n) = value.parse::<i64>() {
                    serde_json::Value::Number(n.into())
                } else if let Ok(n) = value.parse::<f64>() {
                    serde_json::Number::from_f64(n)
                        .map(serde_json::Value::Number)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                } else {
                    return Err(invalid(format!("cannot parse '{value}' as number")));
                }
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. Returns error if the key
    /// is unknown or the resulting config is invalid.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window()?;
        parse_time_of_day(&self.day.next_day_cutoff).map_err(|e| ConfigError::InvalidValue {
            key: "day.next_day_cutoff".into(),
            message: e.to_string(),
        })?;
        if self.day.buffer_minutes < 0 {
            return Err(ConfigError::InvalidValue {
                key: "day.buffer_minutes".into(),
                message: "must not be negative".into(),
            });
        }
        if self.day.max_estimate_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "day.max_estimate_minutes".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Working-day window.
    pub fn window(&self) -> Result<DayWindow, ConfigError> {
        DayWindow::parse(&self.day.start, &self.day.end).map_err(|e| ConfigError::InvalidValue {
            key: "day".into(),
            message: e.to_string(),
        })
    }

    /// Scheduler settings derived from this config.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        Ok(SchedulerConfig {
            window: self.window()?,
            buffer_minutes: self.day.buffer_minutes,
            max_estimate_minutes: self.day.max_estimate_minutes,
            oracle_timeout: (self.oracle.timeout_secs > 0)
                .then(|| StdDuration::from_secs(self.oracle.timeout_secs)),
            transport_failures_fatal: self.oracle.transport_failures_fatal,
        })
    }

    /// Completion endpoint settings; the API key is read from the environment.
    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            base_url: self.oracle.base_url.clone(),
            api_key: std::env::var(&self.oracle.api_key_env).ok(),
            model: self.oracle.model.clone(),
            slot_model: self.oracle.slot_model.clone(),
            priority_temperature: self.oracle.priority_temperature,
            slot_temperature: self.oracle.slot_temperature,
        }
    }

    /// Exporter carrying the configured label, attendee and colour.
    pub fn exporter(&self) -> EventExporter {
        let non_empty = |s: &String| Some(s.clone()).filter(|s| !s.trim().is_empty());
        EventExporter::new(self.day.timezone_label.clone())
            .with_attendee(non_empty(&self.export.attendee_email))
            .with_color_id(non_empty(&self.export.color_id))
    }
}
