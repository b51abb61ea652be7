//! Configuration parsing for skill generation.
//!
//! Key=value format read from `.skillgen/config` in the working directory.
//! Precedence: CLI flags > `--config` file > `.skillgen/config` > defaults.

use crate::organizer::DEFAULT_NUMBER_OF_HINTS;
use crate::skill::DEFAULT_OUTPUT_SUFFIX;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Config file looked up when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = ".skillgen/config";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid config line: {0}")]
    InvalidLine(String),
    #[error("invalid integer value for {key}: {value}")]
    InvalidInt { key: String, value: String },
    #[error("invalid number value for {key}: {value}")]
    InvalidFloat { key: String, value: String },
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: &'static str,
    },
}

/// Generation settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Question sheet (TSV).
    pub sheet_path: PathBuf,
    /// Prior skill export; the output is written next to it.
    pub skill_path: PathBuf,

    /// Intent confidence required by answer nodes.
    pub confidence: f64,
    /// Maximum number of intents in the skill. 0 means unlimited.
    pub intent_limit: usize,
    pub number_of_hints: usize,

    /// Seed for reproducible node ids; random ids when unset.
    pub id_seed: Option<String>,
    pub output_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheet_path: PathBuf::from("results/Perguntas.tsv"),
            skill_path: PathBuf::from("results/skill.json"),
            confidence: 0.7,
            intent_limit: 0,
            number_of_hints: DEFAULT_NUMBER_OF_HINTS,
            id_seed: None,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

impl Config {
    /// Load config from a file, merging with defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.load_file(path)?;
        Ok(config)
    }

    /// Load and merge values from a config file.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.parse_content(&content)
    }

    /// Parse config content (key=value format).
    fn parse_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine(line.to_string()));
            };

            let key = key.trim();
            let value = Self::unquote(value.trim());

            self.apply_value(key, &value)?;
        }
        Ok(())
    }

    /// Remove surrounding quotes from a value.
    fn unquote(value: &str) -> String {
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            return value[1..value.len() - 1].to_string();
        }
        value.to_string()
    }

    /// Apply a single config value.
    fn apply_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "sheet_path" => self.sheet_path = PathBuf::from(value),
            "skill_path" => self.skill_path = PathBuf::from(value),
            "confidence" => {
                let confidence: f64 = value.parse().map_err(|_| ConfigError::InvalidFloat {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                if !(0.0..=1.0).contains(&confidence) {
                    return Err(Self::invalid_value(key, value, "must be between 0 and 1"));
                }
                self.confidence = confidence;
            }
            "intent_limit" => self.intent_limit = Self::parse_int(key, value)?,
            "number_of_hints" => {
                let hints = Self::parse_int(key, value)?;
                if hints == 0 {
                    return Err(Self::invalid_value(key, value, "must be at least 1"));
                }
                self.number_of_hints = hints;
            }
            "id_seed" => {
                self.id_seed = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "output_suffix" => {
                if value.is_empty() {
                    return Err(Self::invalid_value(key, value, "must not be empty"));
                }
                self.output_suffix = value.to_string();
            }
            _ => {
                // Warn but don't fail for unknown keys
                warn!(key, "unknown config key");
            }
        }
        Ok(())
    }

    fn parse_int(key: &str, value: &str) -> Result<usize, ConfigError> {
        value.parse().map_err(|_| ConfigError::InvalidInt {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    fn invalid_value(key: &str, value: &str, reason: &'static str) -> ConfigError {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        }
    }

    /// Intent limit as an option; 0 disables limiting.
    pub fn intent_limit(&self) -> Option<usize> {
        (self.intent_limit > 0).then_some(self.intent_limit)
    }

    /// Resolve relative paths against a workspace root.
    pub fn resolve_paths(&mut self, workspace_root: &Path) {
        if self.sheet_path.is_relative() {
            self.sheet_path = workspace_root.join(&self.sheet_path);
        }
        if self.skill_path.is_relative() {
            self.skill_path = workspace_root.join(&self.skill_path);
        }
    }
}
