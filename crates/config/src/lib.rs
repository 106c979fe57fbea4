//! Configuration loading and validation for Salespilot.
//!
//! Loads configuration from `~/.salespilot/config.toml` with environment
//! variable overrides. Command-line flags are merged on top by the CLI.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.salespilot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// POS API token (Bearer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_token: Option<String>,

    /// Default store to scope queries to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_store_id: Option<String>,

    /// Base URL of the OpenAI-compatible LLM endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_base_url: Option<String>,

    /// LLM API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_api_key: Option<String>,

    /// LLM model identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,

    /// Per-request HTTP timeout, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Structured log file path
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,

    /// Conversation history limits
    #[serde(default)]
    pub history: HistoryConfig,
}

fn default_timeout_secs() -> u64 {
    20
}
fn default_log_file() -> String {
    "./salespilot.log".into()
}

/// Limits for the in-memory conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_max_messages() -> usize {
    20
}
fn default_max_tokens() -> usize {
    2000
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("pos_token", &redact(&self.pos_token))
            .field("pos_store_id", &self.pos_store_id)
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("llm_model", &self.llm_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("log_file", &self.log_file)
            .field("debug", &self.debug)
            .field("history", &self.history)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.salespilot/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `EVOTOR_TOKEN`, `EVOTOR_STORE_ID`
    /// - `LLM_BASE_URL`, `LLM_API_KEY`, `LLM_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(token) = std::env::var("EVOTOR_TOKEN") {
            config.pos_token = Some(token);
        }
        if let Ok(store_id) = std::env::var("EVOTOR_STORE_ID") {
            config.pos_store_id = Some(store_id);
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm_base_url = Some(url);
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm_model = Some(model);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".salespilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.history.max_messages == 0 {
            return Err(ConfigError::ValidationError(
                "history.max_messages must be greater than 0".into(),
            ));
        }

        if self.history.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "history.max_tokens must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Whether the POS token is available (from config or environment).
    pub fn has_pos_token(&self) -> bool {
        self.pos_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether enough LLM settings are present to build a provider.
    pub fn has_llm(&self) -> bool {
        self.llm_api_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.llm_model.as_deref().is_some_and(|m| !m.is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pos_token: None,
            pos_store_id: None,
            llm_base_url: None,
            llm_api_key: None,
            llm_model: None,
            timeout_secs: default_timeout_secs(),
            log_file: default_log_file(),
            debug: false,
            history: HistoryConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout_secs, 20);
        assert_eq!(config.history.max_messages, 20);
        assert_eq!(config.history.max_tokens, 2000);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().log_file, "./salespilot.log");
    }

    #[test]
    fn config_file_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
pos_token = "tok"
pos_store_id = "store-1"
llm_model = "gpt-4o-mini"
timeout_secs = 5

[history]
max_messages = 8
max_tokens = 500
"#
        )
        .unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.pos_token.as_deref(), Some("tok"));
        assert_eq!(config.pos_store_id.as_deref(), Some("store-1"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.history.max_messages, 8);
        assert_eq!(config.history.max_tokens, 500);
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = AppConfig {
            timeout_secs: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_history_limits_rejected() {
        let config = AppConfig {
            history: HistoryConfig {
                max_messages: 0,
                max_tokens: 2000,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig {
            pos_token: Some("super-secret".into()),
            llm_api_key: Some("sk-123".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("sk-123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn has_llm_requires_key_and_model() {
        let mut config = AppConfig {
            llm_api_key: Some("sk-123".into()),
            ..AppConfig::default()
        };
        assert!(!config.has_llm());
        config.llm_model = Some("gpt-4o-mini".into());
        assert!(config.has_llm());
    }
}
