//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::models::ModeFilter;
use crate::normalize::{NormalizeOptions, SchemaPolicy};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Aggregation and normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// "ranked", "casual" or "both"
    #[serde(default = "default_game_mode")]
    pub game_mode: String,

    /// Matchups need strictly more games than this
    #[serde(default)]
    pub game_threshold: u32,

    /// Cards need strictly more plays than this
    #[serde(default = "default_card_threshold")]
    pub card_threshold: u32,

    /// Threshold used when building stored graphs
    #[serde(default = "default_graph_threshold")]
    pub graph_threshold: u32,

    #[serde(default = "default_split_dates")]
    pub split_dates: bool,

    #[serde(default)]
    pub schema_policy: SchemaPolicy,
}

fn default_game_mode() -> String {
    "ranked".to_string()
}

fn default_card_threshold() -> u32 {
    2
}

fn default_graph_threshold() -> u32 {
    5
}

fn default_split_dates() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            game_mode: default_game_mode(),
            game_threshold: 0,
            card_threshold: default_card_threshold(),
            graph_threshold: default_graph_threshold(),
            split_dates: default_split_dates(),
            schema_policy: SchemaPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parsed game mode filter.
    pub fn mode(&self) -> Result<ModeFilter, ConfigError> {
        self.game_mode
            .parse()
            .map_err(|e| ConfigError::ValidationError(format!("game_mode: {}", e)))
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            split_dates: self.split_dates,
            schema_policy: self.schema_policy,
        }
    }
}

/// Match history source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retries per page after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries, multiplied by the attempt number
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
}

fn default_base_url() -> String {
    "https://trackobot.com/profile/history.json".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_delay() -> u64 {
    500
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            request_delay_ms: default_request_delay(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            analysis: AnalysisConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            warn!("Config file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Source timeout must be greater than 0".to_string(),
            ));
        }

        if self.source.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Source base_url must not be empty".to_string(),
            ));
        }

        self.analysis.mode()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.analysis.game_mode, "ranked");
        assert_eq!(config.analysis.game_threshold, 0);
        assert_eq!(config.analysis.card_threshold, 2);
        assert_eq!(config.analysis.graph_threshold, 5);
        assert_eq!(config.source.timeout_seconds, 30);
    }

    #[test]
    fn test_source_config_default() {
        let source = SourceConfig::default();

        assert_eq!(source.base_url, "https://trackobot.com/profile/history.json");
        assert_eq!(source.max_retries, 3);
        assert_eq!(source.request_delay_ms, 500);
    }

    #[test]
    fn test_analysis_options() {
        let analysis = AnalysisConfig::default();
        assert_eq!(analysis.mode().unwrap(), ModeFilter::Ranked);

        let opts = analysis.normalize_options();
        assert!(opts.split_dates);
        assert_eq!(opts.schema_policy, SchemaPolicy::Abort);
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.source.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_base_url() {
        let mut config = AppConfig::default();
        config.source.base_url = "  ".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_mode() {
        let mut config = AppConfig::default();
        config.analysis.game_mode = "wild".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            data_dir = "/tmp/decks"

            [analysis]
            game_mode = "both"
            schema_policy = "skip_and_warn"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/decks"));
        assert_eq!(config.analysis.mode().unwrap(), ModeFilter::Both);
        assert_eq!(config.analysis.schema_policy, SchemaPolicy::SkipAndWarn);
        assert_eq!(config.analysis.card_threshold, 2);
        assert_eq!(config.source.max_retries, 3);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[source]\ntimeout_seconds = 0\n").unwrap();

        assert!(AppConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.analysis.graph_threshold, parsed.analysis.graph_threshold);
    }
}
