//! In-memory doubles for the ports, used by the unit tests of this crate.

use crate::ports::{Document, PortError, PortResult, RecordStore, TextGenerationService};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryStore {
    documents: Mutex<HashMap<String, Document>>,
    fail_loads: AtomicBool,
}

impl InMemoryStore {
    pub fn put_raw(&self, name: &str, value: Value) {
        let Value::Object(document) = value else {
            panic!("documents must be JSON objects");
        };
        self.documents
            .lock()
            .unwrap()
            .insert(name.to_string(), document);
    }

    pub fn raw(&self, name: &str) -> Option<Document> {
        self.documents.lock().unwrap().get(name).cloned()
    }

    pub fn fail_loads(&self) {
        self.fail_loads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn load(&self, name: &str) -> PortResult<Document> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PortError::Io {
                name: name.to_string(),
                reason: "disk unplugged".to_string(),
            });
        }
        Ok(self.raw(name).unwrap_or_default())
    }

    async fn save(&self, name: &str, document: &Document) -> PortResult<()> {
        self.documents
            .lock()
            .unwrap()
            .insert(name.to_string(), document.clone());
        Ok(())
    }

    async fn backup(&self) -> PortResult<usize> {
        Ok(self.documents.lock().unwrap().len())
    }
}

/// A text generator that replays a fixed answer (or failure) and records prompts.
pub struct ScriptedGenerator {
    answer: Option<String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// (prompt, persona instructions) pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerationService for ScriptedGenerator {
    async fn generate(&self, prompt: &str, persona_instructions: &str) -> PortResult<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), persona_instructions.to_string()));
        self.answer
            .clone()
            .ok_or_else(|| PortError::Generation("quota exceeded".to_string()))
    }
}
