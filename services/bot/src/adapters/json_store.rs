//! services/bot/src/adapters/json_store.rs
//!
//! This module contains the file-backed adapter for the `RecordStore` port.
//! Each named document lives in `<data_dir>/<name>.json`.

use async_trait::async_trait;
use chrono::Utc;
use learning_assistant_core::{Collection, Document, PortError, PortResult, RecordStore};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A `RecordStore` keeping one pretty-printed JSON file per document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
    // Numbers temp files so overlapping saves never share one.
    writes: Arc<AtomicU64>,
}

fn io_error(name: &str, e: std::io::Error) -> PortError {
    PortError::Io {
        name: name.to_string(),
        reason: e.to_string(),
    }
}

impl JsonFileStore {
    /// Creates the store and its data directory.
    pub async fn open(root: impl AsRef<Path>) -> PortResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| io_error(&root.display().to_string(), e))?;
        info!(root = %root.display(), "Opened JSON record store");
        Ok(Self {
            root,
            writes: Arc::new(AtomicU64::new(0)),
        })
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        let seq = self.writes.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!("{name}.json.{}.{seq}.tmp", std::process::id()))
    }

    fn backup_dir(&self) -> PathBuf {
        self.root.join("backups")
    }
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn load(&self, name: &str) -> PortResult<Document> {
        let text = match fs::read_to_string(self.document_path(name)).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(io_error(name, e)),
        };
        if text.trim().is_empty() {
            return Ok(Document::new());
        }

        let corrupt = |reason: String| PortError::CorruptStore {
            name: name.to_string(),
            reason,
        };
        match serde_json::from_str::<Value>(&text).map_err(|e| corrupt(e.to_string()))? {
            Value::Object(document) => Ok(document),
            _ => Err(corrupt("top-level value is not an object".to_string())),
        }
    }

    /// Each save writes its own temporary file and renames it over the document,
    /// so readers only ever see a complete document and the last rename wins.
    async fn save(&self, name: &str, document: &Document) -> PortResult<()> {
        let text = serde_json::to_string_pretty(document)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let temp_path = self.temp_path(name);
        let written = match fs::write(&temp_path, text).await {
            Ok(()) => fs::rename(&temp_path, self.document_path(name)).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_error(name, e));
        }
        debug!(name, entries = document.len(), "Saved document");
        Ok(())
    }

    async fn backup(&self) -> PortResult<usize> {
        let dir = self.backup_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("backups", e))?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");

        let mut copied = 0;
        for collection in Collection::ALL {
            let name = collection.name();
            let source = self.document_path(name);
            if !fs::try_exists(&source).await.map_err(|e| io_error(name, e))? {
                continue;
            }
            let target = dir.join(format!("{stamp}_{name}.json"));
            fs::copy(&source, &target)
                .await
                .map_err(|e| io_error(name, e))?;
            copied += 1;
        }
        info!(copied, dir = %dir.display(), "Backed up record store");
        Ok(copied)
    }
}
