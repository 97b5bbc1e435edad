//! crates/learning_assistant_core/src/domain.rs
//!
//! Defines the core data structures for the application: the persisted records,
//! the static content definitions and the inbound chat envelope.
//! Persisted records derive serde so they can live in the JSON documents of the
//! record store; nothing here knows about files or the chat platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Platform-assigned identifier of a user or chat, stored as a string.
pub type Identity = String;

//=========================================================================================
// Enums
//=========================================================================================

/// The role a user plays in the learning group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    Regular,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::Regular => "regular",
        }
    }
}

/// Skill level of a learner. Also used as the difficulty of modules and quizzes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 3] = [
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Advanced,
    ];

    /// The level one step above this one, if any.
    pub fn next(self) -> Option<SkillLevel> {
        match self {
            SkillLevel::Beginner => Some(SkillLevel::Intermediate),
            SkillLevel::Intermediate => Some(SkillLevel::Advanced),
            SkillLevel::Advanced => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = String;

    /// Accepts the level names plus the easy/medium/hard quiz vocabulary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "easy" => Ok(SkillLevel::Beginner),
            "intermediate" | "medium" => Ok(SkillLevel::Intermediate),
            "advanced" | "hard" => Ok(SkillLevel::Advanced),
            other => Err(format!("'{}' is not a skill level", other)),
        }
    }
}

//=========================================================================================
// Persisted Records
//=========================================================================================

/// A user of the bot, created the first time an identity is observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub identity: Identity,
    pub display_name: String,
    #[serde(default)]
    pub username: Option<String>,
    pub role: Role,
    /// True when role and display name came from the known-users table.
    #[serde(default)]
    pub known: bool,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Learning progress owned 1:1 by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub identity: Identity,
    #[serde(default)]
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub completed_modules: BTreeSet<String>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub achievements: BTreeSet<String>,
    #[serde(default)]
    pub overall_score: u32,
    #[serde(default)]
    pub quizzes_completed: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub days_active: u32,
    /// Most recent last.
    #[serde(default)]
    pub recent_topics: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who said something in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Speaker {
    User { identity: Identity, name: String },
    Bot,
}

/// One remembered line of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTurn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl MemoryTurn {
    pub fn from_user(identity: &str, name: &str, text: &str, at: DateTime<Utc>) -> Self {
        Self {
            speaker: Speaker::User {
                identity: identity.to_string(),
                name: name.to_string(),
            },
            text: text.to_string(),
            at,
        }
    }

    pub fn from_bot(text: &str, at: DateTime<Utc>) -> Self {
        Self {
            speaker: Speaker::Bot,
            text: text.to_string(),
            at,
        }
    }
}

/// Bounded recent history of a single chat, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub chat_id: Identity,
    #[serde(default)]
    pub turns: VecDeque<MemoryTurn>,
}

//=========================================================================================
// Static Content
//=========================================================================================

/// A unit of educational content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub key: String,
    pub title: String,
    pub description: String,
    pub topic: String,
    pub difficulty: SkillLevel,
    pub estimated_minutes: u32,
    pub body: String,
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_option: usize,
    pub explanation: String,
}

fn default_pass_percent() -> u32 {
    80
}

/// A question bank for one (topic, difficulty) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDefinition {
    pub topic: String,
    pub difficulty: SkillLevel,
    /// Minimum share of correct answers, in percent, needed to pass.
    #[serde(default = "default_pass_percent")]
    pub pass_percent: u32,
    pub questions: Vec<QuizQuestion>,
}

//=========================================================================================
// Inbound Chat Envelope
//=========================================================================================

/// The person who sent an inbound message, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub identity: Identity,
    pub username: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Direct,
    Group,
}

/// A platform-neutral inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: Sender,
    pub chat_id: Identity,
    pub chat_kind: ChatKind,
    pub text: String,
    pub is_reply_to_bot: bool,
    /// Names mentioned in the message, without a leading `@`.
    pub mentioned_names: BTreeSet<String>,
    pub received_at: DateTime<Utc>,
}
