//! Config loading, validation, and the process-wide cache.

use super::model::Config;
use crate::error::{ParleyError, Result};
use std::path::Path;
use std::sync::OnceLock;

static SHARED: OnceLock<Config> = OnceLock::new();

impl Config {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(ParleyError::ConfigError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ParleyError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, using built-in defaults when it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load the config once per process and hand out the cached copy afterwards.
    ///
    /// The first successful call wins; later calls ignore `path`.
    pub fn load_shared<P: AsRef<Path>>(path: P) -> Result<&'static Config> {
        if let Some(config) = SHARED.get() {
            return Ok(config);
        }
        let config = Self::load_or_default(path)?;
        Ok(SHARED.get_or_init(|| config))
    }

    /// Parse config from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                ParleyError::ConfigError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `comment_max_chars` must leave room for the truncation suffix
    /// - section labels must be non-empty and distinct
    /// - `findings_count` and `actions_max_count` must be positive
    /// - `mentions.max_per_response` must be positive
    /// - `trigger.workflow` must be non-empty
    pub fn validate(&self) -> Result<()> {
        if self.comment_max_chars < 100 {
            return Err(ParleyError::ConfigError(format!(
                "comment_max_chars must be at least 100 (found {})",
                self.comment_max_chars
            )));
        }

        let labels = self.format.sections.in_order();
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(ParleyError::ConfigError(
                    "format.sections labels must be non-empty".to_string(),
                ));
            }
            if labels[..i].contains(label) {
                return Err(ParleyError::ConfigError(format!(
                    "format.sections label '{}' is used for more than one section",
                    label
                )));
            }
        }

        let limits = &self.format.limits;
        if limits.findings_count == 0 || limits.actions_max_count == 0 {
            return Err(ParleyError::ConfigError(
                "format.limits findings_count and actions_max_count must be greater than 0"
                    .to_string(),
            ));
        }

        if self.mentions.max_per_response == 0 {
            return Err(ParleyError::ConfigError(
                "mentions.max_per_response must be greater than 0".to_string(),
            ));
        }

        if self.trigger.workflow.trim().is_empty() {
            return Err(ParleyError::ConfigError(
                "trigger.workflow must be non-empty".to_string(),
            ));
        }

        Ok(())
    }
}
