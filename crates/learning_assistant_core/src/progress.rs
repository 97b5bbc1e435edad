//! crates/learning_assistant_core/src/progress.rs
//!
//! The progress tracker and the rules it applies: daily streaks, achievement
//! thresholds, score bookkeeping and skill-level upgrades after passed quizzes.

use crate::catalog::ContentCatalog;
use crate::domain::{ProgressRecord, SkillLevel};
use crate::ports::RecordStore;
use crate::store::{load_collection, persist, Collection};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const MODULE_COMPLETION_POINTS: u32 = 10;
pub const CORRECT_ANSWER_POINTS: u32 = 5;
pub const MAX_OVERALL_SCORE: u32 = 100;
pub const RECENT_TOPICS_LIMIT: usize = 10;
/// Used when a quiz result arrives for a quiz the catalog does not know.
pub const DEFAULT_PASS_PERCENT: u32 = 80;

//=========================================================================================
// Achievements
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Achievement {
    FirstSteps,
    KnowledgeSeeker,
    FiveModules,
    QuizMaster,
    SevenDayStreak,
    HighAchiever,
    PerfectScore,
}

impl Achievement {
    pub const ALL: [Achievement; 7] = [
        Achievement::FirstSteps,
        Achievement::KnowledgeSeeker,
        Achievement::FiveModules,
        Achievement::QuizMaster,
        Achievement::SevenDayStreak,
        Achievement::HighAchiever,
        Achievement::PerfectScore,
    ];

    /// The stable key stored in `ProgressRecord::achievements`.
    pub fn key(self) -> &'static str {
        match self {
            Achievement::FirstSteps => "first-steps",
            Achievement::KnowledgeSeeker => "knowledge-seeker",
            Achievement::FiveModules => "five-modules",
            Achievement::QuizMaster => "quiz-master",
            Achievement::SevenDayStreak => "seven-day-streak",
            Achievement::HighAchiever => "high-achiever",
            Achievement::PerfectScore => "perfect-score",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Achievement::FirstSteps => "First Steps",
            Achievement::KnowledgeSeeker => "Knowledge Seeker",
            Achievement::FiveModules => "Five Modules",
            Achievement::QuizMaster => "Quiz Master",
            Achievement::SevenDayStreak => "Consistent Learner",
            Achievement::HighAchiever => "High Achiever",
            Achievement::PerfectScore => "Perfect Score",
        }
    }

    pub fn from_key(key: &str) -> Option<Achievement> {
        Achievement::ALL.into_iter().find(|a| a.key() == key)
    }

    fn is_satisfied(self, record: &ProgressRecord) -> bool {
        let completed = record.completed_modules.len();
        match self {
            Achievement::FirstSteps => completed >= 1,
            Achievement::KnowledgeSeeker => completed >= 3,
            Achievement::FiveModules => completed >= 5,
            Achievement::QuizMaster => record.quizzes_completed >= 5,
            Achievement::SevenDayStreak => record.streak >= 7,
            Achievement::HighAchiever => record.overall_score >= 80,
            Achievement::PerfectScore => {
                record.total_questions >= 5 && record.correct_answers == record.total_questions
            }
        }
    }
}

//=========================================================================================
// Progress Rules
//=========================================================================================

/// Whether `correct` out of `total` reaches `pass_percent`. An empty quiz never passes.
pub fn quiz_passed(correct: u32, total: u32, pass_percent: u32) -> bool {
    total > 0 && u64::from(correct) * 100 >= u64::from(pass_percent) * u64::from(total)
}

impl ProgressRecord {
    pub fn new(identity: &str, now: DateTime<Utc>) -> Self {
        Self {
            identity: identity.to_string(),
            skill_level: SkillLevel::Beginner,
            completed_modules: Default::default(),
            streak: 0,
            last_activity: None,
            achievements: Default::default(),
            overall_score: 0,
            quizzes_completed: 0,
            correct_answers: 0,
            total_questions: 0,
            days_active: 0,
            recent_topics: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn days_since_activity(&self, today: NaiveDate) -> Option<i64> {
        self.last_activity
            .map(|last| (today - last.date_naive()).num_days())
    }

    /// The streak as of `today`: zero once a whole day has passed without activity.
    pub fn effective_streak(&self, today: NaiveDate) -> u32 {
        match self.days_since_activity(today) {
            Some(gap) if gap > 1 => 0,
            _ => self.streak,
        }
    }

    /// Zeroes a stale streak in place. Returns true if anything changed.
    pub fn expire_stale_streak(&mut self, today: NaiveDate) -> bool {
        let effective = self.effective_streak(today);
        let changed = effective != self.streak;
        self.streak = effective;
        changed
    }

    /// Counts one learning activity at `now`. Each distinct day adds one to the
    /// streak; a gap of more than one day starts a new streak.
    pub fn register_activity(&mut self, now: DateTime<Utc>) {
        match self.days_since_activity(now.date_naive()) {
            Some(gap) if gap <= 0 => {}
            Some(1) => {
                self.streak += 1;
                self.days_active += 1;
            }
            _ => {
                self.streak = 1;
                self.days_active += 1;
            }
        }
        if self.last_activity.map_or(true, |last| last < now) {
            self.last_activity = Some(now);
        }
        self.updated_at = now;
    }

    /// Adds every newly satisfied achievement and returns them.
    pub fn evaluate_achievements(&mut self) -> Vec<Achievement> {
        let earned: Vec<Achievement> = Achievement::ALL
            .into_iter()
            .filter(|a| !self.achievements.contains(a.key()) && a.is_satisfied(self))
            .collect();
        for achievement in &earned {
            self.achievements.insert(achievement.key().to_string());
        }
        earned
    }

    /// Share of quiz answers that were correct, in percent.
    pub fn accuracy_percent(&self) -> Option<f64> {
        (self.total_questions > 0)
            .then(|| f64::from(self.correct_answers) * 100.0 / f64::from(self.total_questions))
    }

    fn add_points(&mut self, points: u32) {
        self.overall_score = self.overall_score.saturating_add(points).min(MAX_OVERALL_SCORE);
    }

    fn note_topic(&mut self, topic: &str) {
        self.recent_topics.retain(|t| t != topic);
        self.recent_topics.push(topic.to_string());
        if self.recent_topics.len() > RECENT_TOPICS_LIMIT {
            let excess = self.recent_topics.len() - RECENT_TOPICS_LIMIT;
            self.recent_topics.drain(..excess);
        }
    }
}

//=========================================================================================
// Progress Tracker
//=========================================================================================

pub struct ProgressTracker {
    store: Arc<dyn RecordStore>,
    catalog: Arc<ContentCatalog>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn RecordStore>, catalog: Arc<ContentCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Loads, mutates and saves one user's record. Missing records are created.
    async fn update<F>(&self, identity: &str, now: DateTime<Utc>, apply: F) -> ProgressRecord
    where
        F: FnOnce(&mut ProgressRecord),
    {
        let mut all: BTreeMap<String, ProgressRecord> =
            load_collection(self.store.as_ref(), Collection::Progress).await;
        let record = all
            .entry(identity.to_string())
            .or_insert_with(|| ProgressRecord::new(identity, now));
        record.expire_stale_streak(now.date_naive());
        apply(record);
        let updated = record.clone();
        persist(self.store.as_ref(), Collection::Progress, &all).await;
        updated
    }

    pub async fn get(&self, identity: &str) -> ProgressRecord {
        self.get_at(identity, Utc::now()).await
    }

    /// Returns the user's record with a stale streak expired as of `now`.
    pub async fn get_at(&self, identity: &str, now: DateTime<Utc>) -> ProgressRecord {
        let mut all: BTreeMap<String, ProgressRecord> =
            load_collection(self.store.as_ref(), Collection::Progress).await;
        let (record, dirty) = match all.get_mut(identity) {
            Some(record) => {
                let changed = record.expire_stale_streak(now.date_naive());
                (record.clone(), changed)
            }
            None => {
                let record = ProgressRecord::new(identity, now);
                all.insert(identity.to_string(), record.clone());
                (record, true)
            }
        };
        if dirty {
            persist(self.store.as_ref(), Collection::Progress, &all).await;
        }
        record
    }

    pub async fn record_module_completion(&self, identity: &str, module_key: &str) -> ProgressRecord {
        self.record_module_completion_at(identity, module_key, Utc::now())
            .await
    }

    /// Completing an already completed module only refreshes the streak.
    pub async fn record_module_completion_at(
        &self,
        identity: &str,
        module_key: &str,
        now: DateTime<Utc>,
    ) -> ProgressRecord {
        let topic = self
            .catalog
            .get_module(module_key)
            .map(|m| m.topic.clone())
            .unwrap_or_else(|_| module_key.to_string());

        self.update(identity, now, |record| {
            record.register_activity(now);
            if record.completed_modules.insert(module_key.to_string()) {
                record.add_points(MODULE_COMPLETION_POINTS);
                info!(identity, module_key, "Module completed");
            }
            record.note_topic(&topic);
            announce(identity, record.evaluate_achievements());
        })
        .await
    }

    /// A pass at or above the user's level moves the skill level up one step.
    pub async fn record_quiz_result_at(
        &self,
        identity: &str,
        topic: &str,
        difficulty: SkillLevel,
        correct: u32,
        total: u32,
        now: DateTime<Utc>,
    ) -> ProgressRecord {
        if correct > total {
            warn!(identity, correct, total, "Clamping quiz score to the question count");
        }
        let correct = correct.min(total);
        let pass_percent = self
            .catalog
            .get_quiz(topic, difficulty)
            .map(|q| q.pass_percent)
            .unwrap_or(DEFAULT_PASS_PERCENT);

        self.update(identity, now, |record| {
            record.register_activity(now);
            record.quizzes_completed += 1;
            record.correct_answers += correct;
            record.total_questions += total;
            record.add_points(correct.saturating_mul(CORRECT_ANSWER_POINTS));
            record.note_topic(topic);

            if quiz_passed(correct, total, pass_percent) && difficulty >= record.skill_level {
                if let Some(next) = record.skill_level.next() {
                    info!(identity, from = %record.skill_level, to = %next, "Skill level upgraded");
                    record.skill_level = next;
                }
            }
            announce(identity, record.evaluate_achievements());
        })
        .await
    }

    /// Counts ordinary chat activity towards the streak.
    pub async fn record_activity_at(&self, identity: &str, now: DateTime<Utc>) -> ProgressRecord {
        self.update(identity, now, |record| {
            record.register_activity(now);
            announce(identity, record.evaluate_achievements());
        })
        .await
    }

    /// Replaces the user's record with a fresh one.
    pub async fn reset(&self, identity: &str) -> ProgressRecord {
        let now = Utc::now();
        let fresh = self
            .update(identity, now, |record| *record = ProgressRecord::new(identity, now))
            .await;
        info!(identity, "Progress reset");
        fresh
    }

    /// Records ordered by overall score, highest first.
    pub async fn leaderboard(&self, limit: usize) -> Vec<ProgressRecord> {
        let mut records: Vec<ProgressRecord> =
            load_collection::<ProgressRecord>(self.store.as_ref(), Collection::Progress)
                .await
                .into_values()
                .collect();
        records.sort_by(|a, b| {
            b.overall_score
                .cmp(&a.overall_score)
                .then_with(|| b.completed_modules.len().cmp(&a.completed_modules.len()))
        });
        records.truncate(limit);
        records
    }

    /// Up to three suggestions for what to study next.
    pub fn recommendations(&self, record: &ProgressRecord) -> Vec<String> {
        let mut suggestions: Vec<String> = self
            .catalog
            .list_modules(None)
            .into_iter()
            .filter(|m| m.difficulty <= record.skill_level)
            .filter(|m| !record.completed_modules.contains(&m.key))
            .take(2)
            .map(|m| format!("Study {} next: /module {}", m.title, m.key))
            .collect();

        if record.quizzes_completed < 3 {
            suggestions.push("Take more quizzes to test your knowledge: /quiz".to_string());
        }
        if suggestions.is_empty() {
            if let Some(next) = record.skill_level.next() {
                suggestions.push(format!(
                    "You've covered your level. Pass a {} quiz to reach {}.",
                    record.skill_level, next
                ));
            }
        }
        suggestions.truncate(3);
        suggestions
    }
}

fn announce(identity: &str, earned: Vec<Achievement>) {
    for achievement in earned {
        info!(identity, achievement = achievement.key(), "Achievement earned");
    }
}

/// A plain-text progress report for display in chat.
pub fn progress_summary(display_name: &str, record: &ProgressRecord, today: NaiveDate) -> String {
    let mut summary = format!("Learning progress for {}\n\n", display_name);
    summary.push_str(&format!("Skill level: {}\n", record.skill_level));
    summary.push_str(&format!("Overall score: {}%\n", record.overall_score));
    summary.push_str(&format!(
        "Completed modules: {}\n",
        record.completed_modules.len()
    ));
    summary.push_str(&format!(
        "Learning streak: {} days\n",
        record.effective_streak(today)
    ));
    summary.push_str(&format!("Days active: {}\n", record.days_active));
    summary.push_str(&format!("Quizzes completed: {}\n", record.quizzes_completed));
    if let Some(accuracy) = record.accuracy_percent() {
        summary.push_str(&format!("Quiz accuracy: {:.1}%\n", accuracy));
    }
    if !record.recent_topics.is_empty() {
        summary.push_str("\nRecent topics:\n");
        for topic in record.recent_topics.iter().rev().take(5) {
            summary.push_str(&format!("- {}\n", topic));
        }
    }
    if !record.achievements.is_empty() {
        summary.push_str("\nAchievements:\n");
        for key in &record.achievements {
            let title = Achievement::from_key(key).map_or(key.as_str(), |a| a.title());
            summary.push_str(&format!("- {}\n", title));
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryStore;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn tracker() -> (Arc<InMemoryStore>, ProgressTracker) {
        let store = Arc::new(InMemoryStore::default());
        let catalog = Arc::new(ContentCatalog::builtin().expect("catalog"));
        (store.clone(), ProgressTracker::new(store, catalog))
    }

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[tokio::test]
    async fn module_completion_is_idempotent() {
        let (_, tracker) = tracker();

        let once = tracker
            .record_module_completion_at("1", "crypto-101", noon(1))
            .await;
        let twice = tracker
            .record_module_completion_at("1", "crypto-101", noon(1))
            .await;

        assert_eq!(once.completed_modules.len(), 1);
        assert_eq!(twice.completed_modules.len(), 1);
        assert_eq!(twice.overall_score, MODULE_COMPLETION_POINTS);
    }

    #[tokio::test]
    async fn five_modules_achievement_arrives_on_fifth_completion() {
        let (_, tracker) = tracker();
        let keys = ["crypto-101", "crypto-102", "crypto-103", "crypto-104", "crypto-105"];

        for (i, key) in keys.iter().enumerate() {
            let record = tracker.record_module_completion_at("1", key, noon(1)).await;
            let has_five = record.achievements.contains("five-modules");
            assert_eq!(has_five, i == 4, "after completing {}", key);
        }
    }

    #[tokio::test]
    async fn first_steps_and_knowledge_seeker_follow_module_counts() {
        let (_, tracker) = tracker();

        let one = tracker.record_module_completion_at("1", "crypto-101", noon(1)).await;
        tracker.record_module_completion_at("1", "stocks-101", noon(1)).await;
        let three = tracker.record_module_completion_at("1", "crypto-102", noon(1)).await;

        assert!(one.achievements.contains("first-steps"));
        assert!(!one.achievements.contains("knowledge-seeker"));
        assert!(three.achievements.contains("knowledge-seeker"));
    }

    #[tokio::test]
    async fn streak_increments_once_per_distinct_day() {
        let (_, tracker) = tracker();

        let day1 = tracker.record_module_completion_at("1", "crypto-101", noon(1)).await;
        let same_day = tracker
            .record_module_completion_at("1", "stocks-101", noon(1) + Duration::hours(3))
            .await;
        let day2 = tracker.record_module_completion_at("1", "crypto-102", noon(2)).await;
        let day3 = tracker.record_module_completion_at("1", "trading-201", noon(3)).await;

        assert_eq!(day1.streak, 1);
        assert_eq!(same_day.streak, 1);
        assert_eq!(day2.streak, 2);
        assert_eq!(day3.streak, 3);
        assert_eq!(day3.days_active, 3);
    }

    #[tokio::test]
    async fn streak_resets_after_a_gap_longer_than_a_day() {
        let (_, tracker) = tracker();
        tracker.record_module_completion_at("1", "crypto-101", noon(1)).await;
        tracker.record_module_completion_at("1", "crypto-102", noon(2)).await;

        let next_day_view = tracker.get_at("1", noon(3)).await;
        let stale_view = tracker.get_at("1", noon(5)).await;
        let resumed = tracker.record_module_completion_at("1", "stocks-101", noon(5)).await;

        assert_eq!(next_day_view.streak, 2);
        assert_eq!(stale_view.streak, 0);
        assert_eq!(resumed.streak, 1);
    }

    #[tokio::test]
    async fn seven_day_streak_is_awarded() {
        let (_, tracker) = tracker();
        for day in 1..=6 {
            let record = tracker.record_activity_at("1", noon(day)).await;
            assert!(!record.achievements.contains("seven-day-streak"));
        }
        let record = tracker.record_activity_at("1", noon(7)).await;
        assert_eq!(record.streak, 7);
        assert!(record.achievements.contains("seven-day-streak"));
    }

    #[tokio::test]
    async fn passing_quiz_at_current_level_upgrades_skill() {
        let (_, tracker) = tracker();

        let record = tracker
            .record_quiz_result_at("1", "crypto", SkillLevel::Beginner, 9, 10, noon(1))
            .await;

        assert_eq!(record.skill_level, SkillLevel::Intermediate);
        assert_eq!(record.quizzes_completed, 1);
        assert_eq!(record.correct_answers, 9);
        assert_eq!(record.total_questions, 10);
        assert_eq!(record.overall_score, 45);
    }

    #[tokio::test]
    async fn failing_or_easier_quizzes_never_change_skill() {
        let (_, tracker) = tracker();

        let failed = tracker
            .record_quiz_result_at("1", "crypto", SkillLevel::Beginner, 7, 10, noon(1))
            .await;
        assert_eq!(failed.skill_level, SkillLevel::Beginner);

        tracker
            .record_quiz_result_at("1", "crypto", SkillLevel::Beginner, 10, 10, noon(1))
            .await;
        let easier = tracker
            .record_quiz_result_at("1", "stocks", SkillLevel::Beginner, 5, 5, noon(1))
            .await;
        assert_eq!(easier.skill_level, SkillLevel::Intermediate);

        let low_score = tracker
            .record_quiz_result_at("1", "crypto", SkillLevel::Intermediate, 0, 4, noon(1))
            .await;
        assert_eq!(low_score.skill_level, SkillLevel::Intermediate);
    }

    #[tokio::test]
    async fn advanced_is_the_ceiling() {
        let (_, tracker) = tracker();
        for level in SkillLevel::ALL {
            tracker
                .record_quiz_result_at("1", "trading", level, 4, 4, noon(1))
                .await;
        }
        let record = tracker
            .record_quiz_result_at("1", "trading", SkillLevel::Advanced, 4, 4, noon(1))
            .await;
        assert_eq!(record.skill_level, SkillLevel::Advanced);
    }

    #[tokio::test]
    async fn quiz_scores_are_clamped_and_empty_quizzes_never_pass() {
        let (_, tracker) = tracker();

        let empty = tracker
            .record_quiz_result_at("1", "crypto", SkillLevel::Beginner, 0, 0, noon(1))
            .await;
        assert_eq!(empty.skill_level, SkillLevel::Beginner);

        let clamped = tracker
            .record_quiz_result_at("1", "crypto", SkillLevel::Beginner, 12, 5, noon(1))
            .await;
        assert_eq!(clamped.correct_answers, 5);
        assert_eq!(clamped.total_questions, 5);
        assert!(clamped.achievements.contains("perfect-score"));
    }

    #[tokio::test]
    async fn score_is_capped_and_high_achiever_awarded() {
        let (_, tracker) = tracker();
        for _ in 0..5 {
            tracker
                .record_quiz_result_at("1", "stocks", SkillLevel::Beginner, 5, 5, noon(1))
                .await;
        }
        let record = tracker.get_at("1", noon(1)).await;
        assert_eq!(record.overall_score, MAX_OVERALL_SCORE);
        assert!(record.achievements.contains("high-achiever"));
        assert!(record.achievements.contains("quiz-master"));
    }

    #[tokio::test]
    async fn reset_replaces_the_record() {
        let (_, tracker) = tracker();
        tracker.record_module_completion("1", "crypto-101").await;

        let fresh = tracker.reset("1").await;

        assert!(fresh.completed_modules.is_empty());
        assert!(fresh.achievements.is_empty());
        assert_eq!(tracker.get("1").await.overall_score, 0);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_score() {
        let (_, tracker) = tracker();
        tracker.record_module_completion_at("low", "crypto-101", noon(1)).await;
        tracker
            .record_quiz_result_at("high", "crypto", SkillLevel::Beginner, 5, 5, noon(1))
            .await;

        let board = tracker.leaderboard(10).await;
        let order: Vec<&str> = board.iter().map(|r| r.identity.as_str()).collect();

        assert_eq!(order, vec!["high", "low"]);
        assert_eq!(tracker.leaderboard(1).await.len(), 1);
    }

    #[tokio::test]
    async fn recommendations_point_at_unfinished_modules() {
        let (_, tracker) = tracker();
        let record = tracker.record_module_completion_at("1", "crypto-101", noon(1)).await;

        let suggestions = tracker.recommendations(&record);

        assert!(suggestions.len() <= 3);
        assert!(suggestions[0].contains("stocks-101"));
        assert!(suggestions.iter().any(|s| s.contains("/quiz")));
    }

    #[tokio::test]
    async fn recent_topics_are_bounded_and_deduplicated() {
        let mut record = ProgressRecord::new("1", noon(1));
        for i in 0..15 {
            record.note_topic(&format!("topic-{}", i));
        }
        record.note_topic("topic-10");

        assert_eq!(record.recent_topics.len(), RECENT_TOPICS_LIMIT);
        assert_eq!(record.recent_topics.last().map(String::as_str), Some("topic-10"));
        assert_eq!(record.recent_topics[0], "topic-5");
    }

    #[test]
    fn summary_lists_achievement_titles() {
        let mut record = ProgressRecord::new("1", noon(1));
        record.completed_modules.insert("crypto-101".to_string());
        record.evaluate_achievements();

        let text = progress_summary("Sam", &record, noon(1).date_naive());

        assert!(text.contains("Learning progress for Sam"));
        assert!(text.contains("First Steps"));
        assert!(!text.contains("Quiz accuracy"));
    }
}
