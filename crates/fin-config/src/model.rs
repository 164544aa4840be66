use serde::{de::Deserializer, Deserialize, Serialize};
use std::{env, ffi::OsString, fmt, path::PathBuf};

use crate::ConfigError;

/// Environment variable that relocates the data root when the config leaves it unset.
pub const DATA_ROOT_ENV: &str = "FINTRACK_HOME";
const DEFAULT_DATA_DIR: &str = ".fintrack";

/// Stores installation-wide settings for the finance tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "Config::default_user_id")]
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom data directory. Defaults to `$FINTRACK_HOME` or `~/.fintrack`.
    pub data_root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: Self::default_user_id(),
            data_root: None,
            log_filter: None,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Config {
    pub fn default_user_id() -> String {
        "default".into()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::Invalid("user_id must not be empty".into()));
        }
        self.classifier.validate()
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        self.data_root_or(env::var_os(DATA_ROOT_ENV))
    }

    /// Resolution order: the configured directory, then `env_root`, then `~/.fintrack`.
    pub fn data_root_or(&self, env_root: Option<OsString>) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }
        if let Some(raw) = env_root.filter(|raw| !raw.is_empty()) {
            return PathBuf::from(raw);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DATA_DIR)
    }
}

/// Tuning knobs for the category classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierConfig {
    #[serde(default = "ClassifierConfig::default_min_examples")]
    pub min_examples: usize,
    #[serde(default = "ClassifierConfig::default_min_categories")]
    pub min_categories: usize,
    #[serde(default = "ClassifierConfig::default_max_features")]
    pub max_features: usize,
    #[serde(default = "ClassifierConfig::default_smoothing")]
    pub smoothing: f64,
    #[serde(default)]
    pub retrain_policy: RetrainMode,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_examples: Self::default_min_examples(),
            min_categories: Self::default_min_categories(),
            max_features: Self::default_max_features(),
            smoothing: Self::default_smoothing(),
            retrain_policy: RetrainMode::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn default_min_examples() -> usize {
        10
    }

    pub fn default_min_categories() -> usize {
        2
    }

    pub fn default_max_features() -> usize {
        1000
    }

    pub fn default_smoothing() -> f64 {
        1.0
    }

    /// The thresholds may only be raised above their defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_examples < Self::default_min_examples() {
            return Err(ConfigError::Invalid(format!(
                "classifier.min_examples must be at least {}, got {}",
                Self::default_min_examples(),
                self.min_examples
            )));
        }
        if self.min_categories < Self::default_min_categories() {
            return Err(ConfigError::Invalid(format!(
                "classifier.min_categories must be at least {}, got {}",
                Self::default_min_categories(),
                self.min_categories
            )));
        }
        if self.max_features == 0 {
            return Err(ConfigError::Invalid(
                "classifier.max_features must be at least 1".into(),
            ));
        }
        if !(self.smoothing.is_finite() && self.smoothing > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "classifier.smoothing must be positive, got {}",
                self.smoothing
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrainMode {
    #[default]
    Immediate,
    Deferred,
}

impl RetrainMode {
    fn from_value(value: Option<String>) -> Self {
        value
            .map(|v| RetrainMode::from_str(v.trim()))
            .unwrap_or_default()
    }

    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "deferred" | "lazy" => RetrainMode::Deferred,
            _ => RetrainMode::Immediate,
        }
    }
}

impl fmt::Display for RetrainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RetrainMode::Immediate => "immediate",
            RetrainMode::Deferred => "deferred",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for RetrainMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(RetrainMode::from_value(value))
    }
}
