//! services/bot/src/telegram/quiz_session.rs
//!
//! In-progress quizzes, one per user. Sessions live in process memory and are
//! lost on restart.

use learning_assistant_core::{QuizDefinition, QuizQuestion, SkillLevel};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("You don't have a quiz running. Start one with /quiz.")]
    NoActiveQuiz,
    #[error("Please answer with a number between 1 and {max}.")]
    OutOfRange { max: usize },
}

#[derive(Debug, Clone)]
struct QuizSession {
    topic: String,
    difficulty: SkillLevel,
    questions: Vec<QuizQuestion>,
    current: usize,
    correct: u32,
}

impl QuizSession {
    fn question_text(&self) -> String {
        let question = &self.questions[self.current];
        let mut text = format!(
            "Question {}/{}: {}\n",
            self.current + 1,
            self.questions.len(),
            question.prompt
        );
        for (i, option) in question.options.iter().enumerate() {
            text.push_str(&format!("{}) {}\n", i + 1, option));
        }
        text.push_str("\nReply with /answer <number>");
        text
    }
}

/// What happened after one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Next {
        was_correct: bool,
        explanation: String,
        next_question: String,
    },
    Finished {
        was_correct: bool,
        explanation: String,
        topic: String,
        difficulty: SkillLevel,
        correct: u32,
        total: u32,
    },
}

#[derive(Default)]
pub struct QuizSessions {
    sessions: Mutex<HashMap<String, QuizSession>>,
}

impl QuizSessions {
    /// Starts (or restarts) a quiz for `identity` and returns the first question.
    pub async fn start(&self, identity: &str, quiz: &QuizDefinition) -> String {
        let session = QuizSession {
            topic: quiz.topic.clone(),
            difficulty: quiz.difficulty,
            questions: quiz.questions.clone(),
            current: 0,
            correct: 0,
        };
        let first = session.question_text();
        self.sessions
            .lock()
            .await
            .insert(identity.to_string(), session);
        first
    }

    /// Scores a 1-based `choice` against the current question.
    pub async fn answer(&self, identity: &str, choice: usize) -> Result<AnswerOutcome, AnswerError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(identity).ok_or(AnswerError::NoActiveQuiz)?;

        let question = &session.questions[session.current];
        let max = question.options.len();
        if choice == 0 || choice > max {
            return Err(AnswerError::OutOfRange { max });
        }
        let was_correct = choice - 1 == question.correct_option;
        let explanation = question.explanation.clone();
        if was_correct {
            session.correct += 1;
        }
        session.current += 1;

        if session.current < session.questions.len() {
            return Ok(AnswerOutcome::Next {
                was_correct,
                explanation,
                next_question: session.question_text(),
            });
        }

        let finished = sessions.remove(identity).ok_or(AnswerError::NoActiveQuiz)?;
        Ok(AnswerOutcome::Finished {
            was_correct,
            explanation,
            topic: finished.topic,
            difficulty: finished.difficulty,
            correct: finished.correct,
            total: finished.questions.len() as u32,
        })
    }

    /// Drops the user's quiz, returning whether one was running.
    pub async fn cancel(&self, identity: &str) -> bool {
        self.sessions.lock().await.remove(identity).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quiz() -> QuizDefinition {
        let question = |prompt: &str, correct_option: usize| QuizQuestion {
            prompt: prompt.to_string(),
            options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            correct_option,
            explanation: format!("{} explained", prompt),
        };
        QuizDefinition {
            topic: "crypto".to_string(),
            difficulty: SkillLevel::Beginner,
            pass_percent: 80,
            questions: vec![question("Q1", 0), question("Q2", 2)],
        }
    }

    #[tokio::test]
    async fn walks_through_questions_and_reports_the_score() {
        let sessions = QuizSessions::default();

        let first = sessions.start("1", &quiz()).await;
        assert!(first.starts_with("Question 1/2: Q1"));
        assert!(first.contains("3) C"));

        let next = sessions.answer("1", 1).await.expect("answer");
        assert!(matches!(next, AnswerOutcome::Next { was_correct: true, ref next_question, .. }
            if next_question.starts_with("Question 2/2")));

        let done = sessions.answer("1", 1).await.expect("answer");
        assert_eq!(
            done,
            AnswerOutcome::Finished {
                was_correct: false,
                explanation: "Q2 explained".to_string(),
                topic: "crypto".to_string(),
                difficulty: SkillLevel::Beginner,
                correct: 1,
                total: 2,
            }
        );
        assert_eq!(sessions.answer("1", 1).await, Err(AnswerError::NoActiveQuiz));
    }

    #[tokio::test]
    async fn out_of_range_answers_do_not_advance() {
        let sessions = QuizSessions::default();
        sessions.start("1", &quiz()).await;

        assert_eq!(sessions.answer("1", 0).await, Err(AnswerError::OutOfRange { max: 3 }));
        assert_eq!(sessions.answer("1", 4).await, Err(AnswerError::OutOfRange { max: 3 }));
        assert!(matches!(
            sessions.answer("1", 1).await,
            Ok(AnswerOutcome::Next { was_correct: true, .. })
        ));
    }

    #[tokio::test]
    async fn cancel_ends_the_session() {
        let sessions = QuizSessions::default();
        sessions.start("1", &quiz()).await;

        assert!(sessions.cancel("1").await);
        assert!(!sessions.cancel("1").await);
    }
}
