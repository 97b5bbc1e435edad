//! crates/learning_assistant_core/src/memory.rs
//!
//! Per-chat conversation memory: a bounded FIFO of recent turns used as
//! prompt context.

use crate::domain::{MemoryEntry, MemoryTurn};
use crate::ports::RecordStore;
use crate::store::{load_collection, persist, Collection};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MEMORY_CAPACITY: usize = 50;
pub const DEFAULT_MEMORY_WINDOW: usize = 5;

impl MemoryEntry {
    pub fn new(chat_id: &str) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            turns: VecDeque::new(),
        }
    }

    /// Appends a turn, dropping the oldest ones beyond `capacity`.
    pub fn push(&mut self, turn: MemoryTurn, capacity: usize) {
        self.turns.push_back(turn);
        while self.turns.len() > capacity {
            self.turns.pop_front();
        }
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&MemoryTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).collect()
    }
}

pub struct ConversationMemory {
    store: Arc<dyn RecordStore>,
    capacity: usize,
}

impl ConversationMemory {
    pub fn new(store: Arc<dyn RecordStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
        }
    }

    pub async fn get(&self, chat_id: &str) -> MemoryEntry {
        let mut all: BTreeMap<String, MemoryEntry> =
            load_collection(self.store.as_ref(), Collection::Memories).await;
        all.remove(chat_id)
            .unwrap_or_else(|| MemoryEntry::new(chat_id))
    }

    /// The last `window` turns of a chat, oldest first.
    pub async fn recent(&self, chat_id: &str, window: usize) -> Vec<MemoryTurn> {
        self.get(chat_id)
            .await
            .recent(window)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Appends turns to a chat's history in order and persists it.
    pub async fn append(&self, chat_id: &str, turns: Vec<MemoryTurn>) -> MemoryEntry {
        let mut all: BTreeMap<String, MemoryEntry> =
            load_collection(self.store.as_ref(), Collection::Memories).await;
        let entry = all
            .entry(chat_id.to_string())
            .or_insert_with(|| MemoryEntry::new(chat_id));
        for turn in turns {
            entry.push(turn, self.capacity);
        }
        let updated = entry.clone();
        debug!(chat_id, turns = updated.turns.len(), "Conversation memory updated");
        persist(self.store.as_ref(), Collection::Memories, &all).await;
        updated
    }
}
