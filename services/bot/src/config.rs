//! services/bot/src/config.rs
//!
//! Defines the bot's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use learning_assistant_core::{DEFAULT_MEMORY_CAPACITY, DEFAULT_MEMORY_WINDOW};
use std::path::PathBuf;
use tracing::Level;

/// Gemini's OpenAI-compatible chat completions endpoint.
pub const DEFAULT_LLM_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BOT_NAME: &str = "Ayaka";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_token: String,
    pub gemini_api_key: String,
    pub log_level: Level,
    pub data_dir: PathBuf,
    pub llm_model: String,
    pub llm_api_base: String,
    pub bot_name: String,
    pub bot_aliases: Vec<String>,
    pub memory_capacity: usize,
    pub memory_window: usize,
    pub known_users_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required =
            |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Load Secrets ---
        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;
        let gemini_api_key = required("GEMINI_API_KEY")?;

        // --- Load Logging and Storage Settings ---
        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_dir = var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let known_users_path = var("KNOWN_USERS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./config/known_users.json"));
        let catalog_path = var("CATALOG_PATH").map(PathBuf::from);

        // --- Load Generation Settings ---
        let llm_model = var("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
        let llm_api_base = var("LLM_API_BASE").unwrap_or_else(|| DEFAULT_LLM_API_BASE.to_string());

        // --- Load Persona and Memory Settings ---
        let bot_name = var("BOT_NAME").unwrap_or_else(|| DEFAULT_BOT_NAME.to_string());
        let bot_aliases = var("BOT_ALIASES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let memory_capacity = parse_count(var("MEMORY_CAPACITY"), "MEMORY_CAPACITY", DEFAULT_MEMORY_CAPACITY)?;
        let memory_window = parse_count(var("MEMORY_WINDOW"), "MEMORY_WINDOW", DEFAULT_MEMORY_WINDOW)?;

        Ok(Self {
            telegram_token,
            gemini_api_key,
            log_level,
            data_dir,
            llm_model,
            llm_api_base,
            bot_name,
            bot_aliases,
            memory_capacity,
            memory_window,
            known_users_path,
            catalog_path,
        })
    }
}

/// Parses a positive count, falling back to `default` when unset.
fn parse_count(raw: Option<String>, key: &str, default: usize) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a positive number", raw),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const SECRETS: [(&str, &str); 2] = [("TELEGRAM_BOT_TOKEN", "123:abc"), ("GEMINI_API_KEY", "key")];

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let config = load(&SECRETS).expect("config");

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(config.bot_name, "Ayaka");
        assert!(config.bot_aliases.is_empty());
        assert_eq!(config.memory_capacity, DEFAULT_MEMORY_CAPACITY);
        assert_eq!(config.memory_window, DEFAULT_MEMORY_WINDOW);
        assert_eq!(config.catalog_path, None);
    }

    #[test]
    fn missing_secrets_are_reported_by_name() {
        let err = load(&[("TELEGRAM_BOT_TOKEN", "123:abc"), ("GEMINI_API_KEY", " ")])
            .expect_err("missing key");
        assert!(matches!(err, ConfigError::MissingVar(key) if key == "GEMINI_API_KEY"));

        let err = load(&[]).expect_err("missing token");
        assert!(matches!(err, ConfigError::MissingVar(key) if key == "TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = SECRETS.to_vec();
        vars.extend([
            ("BOT_ALIASES", "aya, tutor ,,"),
            ("MEMORY_CAPACITY", "20"),
            ("RUST_LOG", "debug"),
            ("CATALOG_PATH", "/etc/catalog.json"),
        ]);

        let config = load(&vars).expect("config");

        assert_eq!(config.bot_aliases, vec!["aya".to_string(), "tutor".to_string()]);
        assert_eq!(config.memory_capacity, 20);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.catalog_path, Some(PathBuf::from("/etc/catalog.json")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut vars = SECRETS.to_vec();
        vars.push(("MEMORY_WINDOW", "0"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidValue(key, _)) if key == "MEMORY_WINDOW"
        ));

        let mut vars = SECRETS.to_vec();
        vars.push(("RUST_LOG", "loud"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidValue(key, _)) if key == "RUST_LOG"
        ));
    }
}
