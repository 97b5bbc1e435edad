//! crates/learning_assistant_core/src/catalog.rs
//!
//! The read-only content catalog: learning modules, quiz banks keyed by
//! (topic, difficulty), and the rotating daily tips.

use crate::domain::{ModuleDefinition, QuizDefinition, SkillLevel};
use crate::ports::{PortError, PortResult};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

const BUILTIN_CATALOG: &str = include_str!("content/catalog.json");

/// Errors raised while loading a catalog definition.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Module key '{0}' is defined more than once")]
    DuplicateModule(String),
    #[error("Quiz for topic '{topic}' at {difficulty} is defined more than once")]
    DuplicateQuiz { topic: String, difficulty: SkillLevel },
    #[error("Quiz for topic '{topic}' at {difficulty} has no questions")]
    EmptyQuiz { topic: String, difficulty: SkillLevel },
    #[error("Question {question} of quiz '{topic}' marks an option that does not exist")]
    InvalidAnswer { topic: String, question: usize },
}

#[derive(Deserialize)]
struct CatalogFile {
    modules: Vec<ModuleDefinition>,
    quizzes: Vec<QuizDefinition>,
    #[serde(default)]
    tips: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ContentCatalog {
    modules: Vec<ModuleDefinition>,
    quizzes: BTreeMap<(String, SkillLevel), QuizDefinition>,
    tips: Vec<String>,
}

fn topic_key(topic: &str) -> String {
    topic.trim().to_lowercase()
}

impl ContentCatalog {
    /// The catalog shipped with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(text)?;

        // Keys are looked up case-insensitively, so they must be unique that way too.
        let mut seen = BTreeSet::new();
        for module in &file.modules {
            if !seen.insert(module.key.trim().to_ascii_lowercase()) {
                return Err(CatalogError::DuplicateModule(module.key.clone()));
            }
        }

        let mut quizzes = BTreeMap::new();
        for mut quiz in file.quizzes {
            quiz.topic = topic_key(&quiz.topic);
            if quiz.questions.is_empty() {
                return Err(CatalogError::EmptyQuiz {
                    topic: quiz.topic,
                    difficulty: quiz.difficulty,
                });
            }
            if let Some(question) = quiz
                .questions
                .iter()
                .position(|q| q.correct_option >= q.options.len())
            {
                return Err(CatalogError::InvalidAnswer {
                    topic: quiz.topic,
                    question: question + 1,
                });
            }
            let key = (quiz.topic.clone(), quiz.difficulty);
            if quizzes.contains_key(&key) {
                return Err(CatalogError::DuplicateQuiz {
                    topic: quiz.topic,
                    difficulty: quiz.difficulty,
                });
            }
            quizzes.insert(key, quiz);
        }

        Ok(Self {
            modules: file.modules,
            quizzes,
            tips: file.tips,
        })
    }

    /// Modules in catalog order, optionally restricted to one difficulty.
    pub fn list_modules(&self, difficulty: Option<SkillLevel>) -> Vec<&ModuleDefinition> {
        self.modules
            .iter()
            .filter(|m| difficulty.map_or(true, |d| m.difficulty == d))
            .collect()
    }

    pub fn get_module(&self, key: &str) -> PortResult<&ModuleDefinition> {
        let key = key.trim();
        self.modules
            .iter()
            .find(|m| m.key.eq_ignore_ascii_case(key))
            .ok_or_else(|| PortError::NotFound(format!("module '{}'", key)))
    }

    pub fn get_quiz(&self, topic: &str, difficulty: SkillLevel) -> PortResult<&QuizDefinition> {
        self.quizzes
            .get(&(topic_key(topic), difficulty))
            .ok_or_else(|| PortError::NotFound(format!("{} quiz on '{}'", difficulty, topic)))
    }

    pub fn quizzes_for(&self, topic: &str) -> Vec<&QuizDefinition> {
        let topic = topic_key(topic);
        self.quizzes
            .values()
            .filter(|q| q.topic == topic)
            .collect()
    }

    /// Topics that have at least one quiz, sorted.
    pub fn topics(&self) -> Vec<&str> {
        let topics: BTreeSet<&str> = self.quizzes.keys().map(|(t, _)| t.as_str()).collect();
        topics.into_iter().collect()
    }

    /// The tip of the day; the same date always yields the same tip.
    pub fn daily_tip(&self, date: NaiveDate) -> Option<&str> {
        if self.tips.is_empty() {
            return None;
        }
        let index = date.num_days_from_ce().unsigned_abs() as usize % self.tips.len();
        Some(self.tips[index].as_str())
    }
}
