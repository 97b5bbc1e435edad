//! crates/learning_assistant_core/src/conversation.rs
//!
//! The conversation handler. Decides whether an inbound chat message is meant
//! for the bot, builds the tutoring prompt from the user's profile, progress and
//! recent chat history, calls the text generator and records the exchange.

use crate::domain::{
    ChatKind, InboundMessage, MemoryEntry, MemoryTurn, ProgressRecord, Speaker, UserRecord,
};
use crate::memory::{ConversationMemory, DEFAULT_MEMORY_WINDOW};
use crate::ports::TextGenerationService;
use crate::progress::ProgressTracker;
use crate::users::{KnownUsers, UserDirectory};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sent instead of a generated reply when the text generator fails.
pub const GENERATION_FALLBACK: &str =
    "Sorry, I'm having trouble processing that right now. Please try again in a moment!";

fn default_instructions(bot_name: &str) -> String {
    format!(
        "You are {name}, a friendly AI tutor with expertise in cryptocurrency, stock trading \
         and general conversation. Introduce yourself as {name} when appropriate.\n\
         For crypto and stock topics, give accurate, educational answers with safety-focused advice \
         and never present anything as financial advice.\n\
         Break complex ideas into simple explanations, use examples and analogies, \
         and encourage follow-up questions.\n\
         For general conversation, be helpful, engaging and supportive.\n\
         Keep a warm, conversational tone and adapt your depth to the learner's skill level.",
        name = bot_name
    )
}

//=========================================================================================
// Persona Settings
//=========================================================================================

/// Who the bot is and which names address it. Built once at startup.
#[derive(Debug, Clone)]
pub struct PersonaSettings {
    pub bot_name: String,
    pub instructions: String,
    pub memory_window: usize,
    /// Lowercase names that count as a mention, without a leading `@`.
    names: BTreeSet<String>,
    name_pattern: Regex,
}

impl PersonaSettings {
    pub fn new(bot_name: &str, aliases: &[String]) -> Result<Self, regex::Error> {
        let names: BTreeSet<String> = std::iter::once(bot_name)
            .chain(aliases.iter().map(String::as_str))
            .map(|n| n.trim().trim_start_matches('@').to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        let name_pattern = Self::compile(&names)?;
        Ok(Self {
            bot_name: bot_name.to_string(),
            instructions: default_instructions(bot_name),
            memory_window: DEFAULT_MEMORY_WINDOW,
            names,
            name_pattern,
        })
    }

    fn compile(names: &BTreeSet<String>) -> Result<Regex, regex::Error> {
        let alternatives: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
        Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
    }

    pub fn with_memory_window(mut self, window: usize) -> Self {
        self.memory_window = window;
        self
    }

    /// Adds the bot's platform handle (e.g. its Telegram username) as a mention target.
    pub fn with_handle(mut self, handle: &str) -> Result<Self, regex::Error> {
        let handle = handle.trim().trim_start_matches('@').to_lowercase();
        if !handle.is_empty() && self.names.insert(handle) {
            self.name_pattern = Self::compile(&self.names)?;
        }
        Ok(self)
    }

    /// True if `text` calls the bot by one of its names.
    pub fn is_called_in(&self, text: &str) -> bool {
        self.name_pattern.is_match(text)
    }

    pub fn answers_to(&self, mentioned: &str) -> bool {
        self.names
            .contains(&mentioned.trim().trim_start_matches('@').to_lowercase())
    }
}

//=========================================================================================
// Classification
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Respond,
    Ignore,
}

/// Direct messages are always answered. In groups the bot answers only when it
/// is mentioned, called by name or replied to.
pub fn classify(message: &InboundMessage, persona: &PersonaSettings) -> Disposition {
    if message.text.trim().is_empty() {
        return Disposition::Ignore;
    }
    let addressed = match message.chat_kind {
        ChatKind::Direct => true,
        ChatKind::Group => {
            message.is_reply_to_bot
                || message.mentioned_names.iter().any(|n| persona.answers_to(n))
                || persona.is_called_in(&message.text)
        }
    };
    if addressed {
        Disposition::Respond
    } else {
        Disposition::Ignore
    }
}

//=========================================================================================
// Prompt Building
//=========================================================================================

fn format_history(history: &[MemoryTurn], bot_name: &str) -> String {
    if history.is_empty() {
        return "No previous conversations".to_string();
    }
    history
        .iter()
        .map(|turn| match &turn.speaker {
            Speaker::User { name, .. } => format!("{}: {}", name, turn.text),
            Speaker::Bot => format!("{}: {}", bot_name, turn.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn group_context(known: &KnownUsers) -> String {
    let mut context = String::from(
        "You are in a group chat with friends. Remember the context of group conversations",
    );
    if known.entries().is_empty() {
        context.push_str(".\n");
    } else {
        context.push_str(" between:\n");
        for member in known.entries() {
            let handle = member.handle.trim();
            if handle.is_empty() {
                context.push_str(&format!("- {} ({})\n", member.name, member.role.as_str()));
            } else {
                context.push_str(&format!(
                    "- {} ({}, {})\n",
                    member.name,
                    handle,
                    member.role.as_str()
                ));
            }
        }
    }
    context.push_str(
        "When they reference previous conversations or inside jokes, acknowledge them.\n",
    );
    context
}

/// Assembles the user-turn prompt sent alongside the persona instructions.
pub fn build_prompt(
    persona: &PersonaSettings,
    user: &UserRecord,
    progress: &ProgressRecord,
    history: &[MemoryTurn],
    message: &InboundMessage,
    known: &KnownUsers,
) -> String {
    let mut prompt = String::new();
    if message.chat_kind == ChatKind::Group {
        prompt.push_str(&group_context(known));
        prompt.push('\n');
    }

    let recent_topics = if progress.recent_topics.is_empty() {
        "none yet".to_string()
    } else {
        progress.recent_topics.join(", ")
    };
    prompt.push_str("Current user:\n");
    prompt.push_str(&format!("- Name: {}\n", user.display_name));
    prompt.push_str(&format!("- Skill level: {}\n", progress.skill_level));
    prompt.push_str(&format!(
        "- Learning progress: {}% complete\n",
        progress.overall_score
    ));
    prompt.push_str(&format!(
        "- Completed modules: {}\n",
        progress.completed_modules.len()
    ));
    prompt.push_str(&format!("- Recent topics: {}\n\n", recent_topics));

    prompt.push_str("Recent conversation history:\n");
    prompt.push_str(&format_history(history, &persona.bot_name));
    prompt.push_str("\n\n");

    prompt.push_str(&format!("Current message from {}: {}\n\n", user.display_name, message.text));
    prompt.push_str("Respond considering the conversation history and context.");
    prompt
}

//=========================================================================================
// Conversation Handler
//=========================================================================================

/// The result of handling one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationOutcome {
    Ignored,
    Replied { text: String, memory: MemoryEntry },
    /// Generation failed; nothing was recorded.
    Fallback { text: String },
}

impl ConversationOutcome {
    /// The text to send back to the chat, if any.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            ConversationOutcome::Ignored => None,
            ConversationOutcome::Replied { text, .. } | ConversationOutcome::Fallback { text } => {
                Some(text)
            }
        }
    }
}

pub struct ConversationHandler {
    users: Arc<UserDirectory>,
    progress: Arc<ProgressTracker>,
    memory: Arc<ConversationMemory>,
    generator: Arc<dyn TextGenerationService>,
    persona: Arc<PersonaSettings>,
}

impl ConversationHandler {
    pub fn new(
        users: Arc<UserDirectory>,
        progress: Arc<ProgressTracker>,
        memory: Arc<ConversationMemory>,
        generator: Arc<dyn TextGenerationService>,
        persona: Arc<PersonaSettings>,
    ) -> Self {
        Self {
            users,
            progress,
            memory,
            generator,
            persona,
        }
    }

    pub fn persona(&self) -> &PersonaSettings {
        &self.persona
    }

    /// Runs one message through classify, generate and record. Never fails:
    /// generation errors become `ConversationOutcome::Fallback`.
    pub async fn handle(&self, message: &InboundMessage) -> ConversationOutcome {
        if classify(message, &self.persona) == Disposition::Ignore {
            debug!(chat_id = %message.chat_id, "Message not addressed to the bot");
            return ConversationOutcome::Ignored;
        }

        let user = self.users.resolve_at(&message.sender, message.received_at).await;
        let progress = self
            .progress
            .get_at(&user.identity, message.received_at)
            .await;
        let history = self
            .memory
            .recent(&message.chat_id, self.persona.memory_window)
            .await;
        let prompt = build_prompt(
            &self.persona,
            &user,
            &progress,
            &history,
            message,
            self.users.known_users(),
        );

        let reply = match self
            .generator
            .generate(&prompt, &self.persona.instructions)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(identity = %user.identity, chat_id = %message.chat_id, error = %e, "Text generation failed");
                return ConversationOutcome::Fallback {
                    text: GENERATION_FALLBACK.to_string(),
                };
            }
        };

        let turns = vec![
            MemoryTurn::from_user(
                &user.identity,
                &user.display_name,
                &message.text,
                message.received_at,
            ),
            MemoryTurn::from_bot(&reply, message.received_at),
        ];
        let memory = self.memory.append(&message.chat_id, turns).await;
        self.progress
            .record_activity_at(&user.identity, message.received_at)
            .await;
        info!(identity = %user.identity, chat_id = %message.chat_id, "Replied to message");

        ConversationOutcome::Replied {
            text: reply,
            memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ContentCatalog;
    use crate::domain::{Role, Sender};
    use crate::testing::{InMemoryStore, ScriptedGenerator};
    use crate::users::KnownUser;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    struct Harness {
        store: Arc<InMemoryStore>,
        generator: Arc<ScriptedGenerator>,
        handler: ConversationHandler,
    }

    fn harness(generator: ScriptedGenerator) -> Harness {
        let store = Arc::new(InMemoryStore::default());
        let generator = Arc::new(generator);
        let known = KnownUsers::new(vec![KnownUser {
            handle: "@Nexxxyzz".to_string(),
            name: "Nex".to_string(),
            role: Role::Student,
            identity: None,
        }]);
        let catalog = Arc::new(ContentCatalog::builtin().expect("catalog"));
        let persona = PersonaSettings::new("Ayaka", &["aya".to_string()])
            .and_then(|p| p.with_handle("@ayaka_tutor_bot"))
            .expect("persona");
        let handler = ConversationHandler::new(
            Arc::new(UserDirectory::new(store.clone(), Arc::new(known))),
            Arc::new(ProgressTracker::new(store.clone(), catalog)),
            Arc::new(ConversationMemory::new(store.clone(), 50)),
            generator.clone(),
            Arc::new(persona),
        );
        Harness {
            store,
            generator,
            handler,
        }
    }

    fn message(kind: ChatKind, text: &str) -> InboundMessage {
        InboundMessage {
            sender: Sender {
                identity: "42".to_string(),
                username: Some("nexxxyzz".to_string()),
                display_name: "N".to_string(),
            },
            chat_id: "-100".to_string(),
            chat_kind: kind,
            text: text.to_string(),
            is_reply_to_bot: false,
            mentioned_names: BTreeSet::new(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ignores_group_messages_not_addressed_to_the_bot() {
        let h = harness(ScriptedGenerator::answering("hi"));

        let outcome = h
            .handler
            .handle(&message(ChatKind::Group, "anyone buying btc today?"))
            .await;

        assert_eq!(outcome, ConversationOutcome::Ignored);
        assert!(h.generator.calls().is_empty());
        assert!(h.store.raw("users").is_none());
    }

    #[tokio::test]
    async fn answers_direct_messages_unconditionally() {
        let h = harness(ScriptedGenerator::answering("Hello Nex!"));

        let outcome = h.handler.handle(&message(ChatKind::Direct, "hello")).await;

        assert_eq!(outcome.reply_text(), Some("Hello Nex!"));
    }

    #[test]
    fn group_messages_are_answered_when_addressed() {
        let persona = PersonaSettings::new("Ayaka", &["aya".to_string()])
            .and_then(|p| p.with_handle("ayaka_tutor_bot"))
            .expect("persona");

        let mut mentioned = message(ChatKind::Group, "@ayaka_tutor_bot what is a wallet");
        mentioned.mentioned_names.insert("Ayaka_Tutor_Bot".to_string());
        let mut replied = message(ChatKind::Group, "and what about staking?");
        replied.is_reply_to_bot = true;
        let called = message(ChatKind::Group, "hey AYAKA, explain ETFs");
        let alias = message(ChatKind::Group, "aya, you there?");
        let substring = message(ChatKind::Group, "my friend ayakawa says hi");
        let other_mention = {
            let mut m = message(ChatKind::Group, "@someone_else look");
            m.mentioned_names.insert("someone_else".to_string());
            m
        };

        assert_eq!(classify(&mentioned, &persona), Disposition::Respond);
        assert_eq!(classify(&replied, &persona), Disposition::Respond);
        assert_eq!(classify(&called, &persona), Disposition::Respond);
        assert_eq!(classify(&alias, &persona), Disposition::Respond);
        assert_eq!(classify(&substring, &persona), Disposition::Ignore);
        assert_eq!(classify(&other_mention, &persona), Disposition::Ignore);
    }

    #[tokio::test]
    async fn failed_generation_returns_fallback_and_records_no_activity() {
        let h = harness(ScriptedGenerator::failing());
        let msg = message(ChatKind::Direct, "hello");

        let outcome = h.handler.handle(&msg).await;

        assert_eq!(
            outcome,
            ConversationOutcome::Fallback {
                text: GENERATION_FALLBACK.to_string()
            }
        );
        assert!(h.store.raw("memories").is_none());
        assert_eq!(h.generator.calls().len(), 1);

        // First contact still registers the user with an untouched progress record.
        let progress = h.store.raw("progress").expect("progress document");
        let record: ProgressRecord =
            serde_json::from_value(progress["42"].clone()).expect("progress record");
        assert_eq!(record, ProgressRecord::new("42", msg.received_at));
    }

    #[tokio::test]
    async fn successful_turn_appends_user_and_bot_entries() {
        let h = harness(ScriptedGenerator::answering("Bitcoin is a digital currency."));

        let outcome = h
            .handler
            .handle(&message(ChatKind::Direct, "what is bitcoin?"))
            .await;

        let ConversationOutcome::Replied { memory, .. } = outcome else {
            panic!("expected a reply, got {:?}", outcome);
        };
        assert_eq!(memory.turns.len(), 2);
        assert_eq!(memory.turns[0].text, "what is bitcoin?");
        assert_eq!(
            memory.turns[0].speaker,
            Speaker::User {
                identity: "42".to_string(),
                name: "Nex".to_string()
            }
        );
        assert_eq!(memory.turns[1].speaker, Speaker::Bot);
        assert_eq!(h.store.raw("progress").expect("progress").len(), 1);
    }

    #[tokio::test]
    async fn prompt_carries_profile_history_and_persona() {
        let h = harness(ScriptedGenerator::answering("Sure."));

        h.handler.handle(&message(ChatKind::Direct, "first question")).await;
        h.handler
            .handle(&message(ChatKind::Group, "Ayaka, second question"))
            .await;

        let calls = h.generator.calls();
        let (prompt, persona) = &calls[1];
        assert!(persona.contains("You are Ayaka"));
        assert!(prompt.contains("- Name: Nex"));
        assert!(prompt.contains("- Skill level: beginner"));
        assert!(prompt.contains("Nex: first question"));
        assert!(prompt.contains("Ayaka: Sure."));
        assert!(prompt.contains("group chat"));
        assert!(prompt.contains("Ayaka, second question"));
    }
}
