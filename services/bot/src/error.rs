//! services/bot/src/error.rs
//!
//! Defines the primary error type for the bot service.

use crate::config::ConfigError;
use learning_assistant_core::{CatalogError, PortError};

/// The primary error type for the `bot` service.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// The content catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The known-users table is not valid JSON.
    #[error("Known users table is invalid: {0}")]
    KnownUsers(#[from] serde_json::Error),

    /// The bot name or an alias could not be turned into a mention pattern.
    #[error("Invalid bot name pattern: {0}")]
    Persona(#[from] regex::Error),

    /// Represents an error from a Telegram Bot API request.
    #[error("Telegram Error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Represents a standard Input/Output error (e.g., reading a config file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
