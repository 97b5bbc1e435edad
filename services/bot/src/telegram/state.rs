//! services/bot/src/telegram/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::telegram::quiz_session::QuizSessions;
use learning_assistant_core::{
    ContentCatalog, ConversationHandler, ConversationMemory, KnownUsers, PersonaSettings,
    ProgressTracker, RecordStore, TextGenerationService, UserDirectory,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Handlers)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub catalog: Arc<ContentCatalog>,
    pub users: Arc<UserDirectory>,
    pub progress: Arc<ProgressTracker>,
    pub conversation: Arc<ConversationHandler>,
    pub quizzes: Arc<QuizSessions>,
}

impl AppState {
    /// Wires the core components around one store and one generator.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn RecordStore>,
        catalog: Arc<ContentCatalog>,
        known_users: Arc<KnownUsers>,
        generator: Arc<dyn TextGenerationService>,
        persona: PersonaSettings,
    ) -> Self {
        let users = Arc::new(UserDirectory::new(store.clone(), known_users));
        let progress = Arc::new(ProgressTracker::new(store.clone(), catalog.clone()));
        let memory = Arc::new(ConversationMemory::new(
            store.clone(),
            config.memory_capacity,
        ));
        let persona = persona.with_memory_window(config.memory_window);
        let conversation = Arc::new(ConversationHandler::new(
            users.clone(),
            progress.clone(),
            memory,
            generator,
            Arc::new(persona),
        ));

        Self {
            config,
            store,
            catalog,
            users,
            progress,
            conversation,
            quizzes: Arc::new(QuizSessions::default()),
        }
    }
}
