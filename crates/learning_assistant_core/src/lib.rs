pub mod catalog;
pub mod conversation;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod progress;
pub mod store;
pub mod users;

#[cfg(test)]
mod testing;

pub use catalog::{CatalogError, ContentCatalog};
pub use conversation::{
    classify, ConversationHandler, ConversationOutcome, Disposition, PersonaSettings,
    GENERATION_FALLBACK,
};
pub use domain::{
    ChatKind, Identity, InboundMessage, MemoryEntry, MemoryTurn, ModuleDefinition,
    ProgressRecord, QuizDefinition, QuizQuestion, Role, Sender, SkillLevel, Speaker, UserRecord,
};
pub use memory::{ConversationMemory, DEFAULT_MEMORY_CAPACITY, DEFAULT_MEMORY_WINDOW};
pub use ports::{Document, PortError, PortResult, RecordStore, TextGenerationService};
pub use progress::{progress_summary, quiz_passed, Achievement, ProgressTracker};
pub use store::Collection;
pub use users::{KnownUser, KnownUsers, UserDirectory};
