//! services/bot/src/startup.rs
//!
//! Loads the immutable startup data: the known-users table and the content catalog.

use crate::error::BotError;
use learning_assistant_core::{ContentCatalog, KnownUsers};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Reads the known-users table. A missing file yields an empty table.
pub async fn load_known_users(path: &Path) -> Result<KnownUsers, BotError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let known = KnownUsers::from_json(&text)?;
            info!(path = %path.display(), entries = known.entries().len(), "Loaded known users");
            Ok(known)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "Known users file not found, starting with an empty table");
            Ok(KnownUsers::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Loads the catalog from `path`, or the built-in one when no path is configured.
pub async fn load_catalog(path: Option<&Path>) -> Result<ContentCatalog, BotError> {
    let catalog = match path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            info!(path = %path.display(), "Loading content catalog from file");
            ContentCatalog::from_json(&text)?
        }
        None => ContentCatalog::builtin()?,
    };
    info!(
        modules = catalog.list_modules(None).len(),
        topics = ?catalog.topics(),
        "Content catalog ready"
    );
    Ok(catalog)
}
