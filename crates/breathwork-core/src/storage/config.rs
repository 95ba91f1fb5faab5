//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Timer tick period
//! - Whether finished sessions are written to history
//! - A custom breathing plan replacing the reference exercise
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::plan::BreathingPlan;
use crate::timer::DEFAULT_PERIOD_MS;

/// Timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Tick period in milliseconds. Non-positive values fall back to 1000.
    #[serde(default = "default_period_ms")]
    pub period_ms: i64,
}

/// Session history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerSettings,
    #[serde(default)]
    pub history: HistoryConfig,
    /// Custom plan override.
    #[serde(default)]
    pub custom_plan: Option<BreathingPlan>,
}

fn default_period_ms() -> i64 {
    DEFAULT_PERIOD_MS as i64
}
fn default_true() -> bool {
    true
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerSettings::default(),
            history: HistoryConfig::default(),
            custom_plan: None,
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

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_)
                    | serde_json::Value::Array(_)
                    | serde_json::Value::Null => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::path()?)
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path,
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::path()?)
    }

    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content)?;
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

    /// Update a value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result no longer forms a valid configuration.
    pub fn update(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        if let Some(plan) = &updated.custom_plan {
            BreathingPlan::new(plan.title().clone(), plan.rounds().to_vec())?;
        }
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.update(key, value)?;
        self.save()
    }

    /// The plan sessions run: the custom plan if it validates, otherwise the
    /// reference exercise.
    pub fn plan(&self) -> BreathingPlan {
        match &self.custom_plan {
            Some(custom) => BreathingPlan::new(custom.title().clone(), custom.rounds().to_vec())
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "custom plan is invalid, using default");
                    BreathingPlan::lower_breathing()
                }),
            None => BreathingPlan::lower_breathing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Round, RoundType};
    use crate::text::DisplayText;

    fn custom_plan() -> BreathingPlan {
        BreathingPlan::new(
            DisplayText::literal("Box"),
            vec![
                Round::timed(4, RoundType::Inhale, false),
                Round::timed(4, RoundType::Hold, true),
                Round::timed(4, RoundType::Exhale, true),
            ],
        )
        .unwrap()
    }

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.period_ms, 1000);
        assert!(parsed.history.enabled);
        assert!(parsed.custom_plan.is_none());
    }

    #[test]
    fn custom_plan_survives_toml() {
        let cfg = Config {
            custom_plan: Some(custom_plan()),
            ..Config::default()
        };
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.plan(), custom_plan());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let parsed: Config = toml::from_str("[timer]\nperiod_ms = 250\n").unwrap();
        assert_eq!(parsed.timer.period_ms, 250);
        assert!(parsed.history.enabled);
        assert_eq!(parsed.plan(), BreathingPlan::lower_breathing());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.period_ms").as_deref(), Some("1000"));
        assert_eq!(cfg.get("history.enabled").as_deref(), Some("true"));
        assert!(cfg.get("timer.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn update_changes_nested_values() {
        let mut cfg = Config::default();
        cfg.update("timer.period_ms", "500").unwrap();
        cfg.update("history.enabled", "false").unwrap();
        assert_eq!(cfg.timer.period_ms, 500);
        assert!(!cfg.history.enabled);
    }

    #[test]
    fn update_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.update("timer.nonexistent", "1").unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Config(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn update_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.update("history.enabled", "not_a_bool").is_err());
        assert!(cfg.update("timer.period_ms", "fast").is_err());
        assert_eq!(cfg.timer.period_ms, 1000);
    }

    #[test]
    fn update_sets_custom_plan_from_json() {
        let mut cfg = Config::default();
        let json = serde_json::to_string(&custom_plan()).unwrap();
        cfg.update("custom_plan", &json).unwrap();
        assert_eq!(cfg.plan(), custom_plan());
    }

    #[test]
    fn update_rejects_empty_custom_plan() {
        let mut cfg = Config::default();
        let err = cfg
            .update("custom_plan", r#"{"title":{"literal":"x"},"rounds":[]}"#)
            .unwrap_err();
        assert!(matches!(err, crate::error::CoreError::Validation(_)));
        assert!(cfg.custom_plan.is_none());
    }

    #[test]
    fn load_from_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(path.clone()).unwrap();
        assert_eq!(cfg.timer.period_ms, 1000);
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.update("timer.period_ms", "100").unwrap();
        changed.save_to(path.clone()).unwrap();
        assert_eq!(Config::load_from(path).unwrap().timer.period_ms, 100);
    }

    #[test]
    fn load_from_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timer = [").unwrap();
        assert!(Config::load_from(path).is_err());
    }
}
