//! services/bot/src/telegram/replies.rs
//!
//! Builds the text reply for each slash command. Nothing here talks to
//! Telegram, so every command can be exercised against a temporary store.

use crate::telegram::commands::Command;
use crate::telegram::quiz_session::AnswerOutcome;
use crate::telegram::state::AppState;
use chrono::{DateTime, Utc};
use learning_assistant_core::progress::DEFAULT_PASS_PERCENT;
use learning_assistant_core::{
    progress_summary, quiz_passed, Achievement, ModuleDefinition, ProgressRecord, QuizDefinition,
    SkillLevel, UserRecord,
};
use std::collections::BTreeMap;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

const LEADERBOARD_SIZE: usize = 10;

/// The reply to `command` sent by `user` at `now`.
pub async fn reply_to_command(
    state: &AppState,
    user: &UserRecord,
    command: Command,
    now: DateTime<Utc>,
) -> String {
    match command {
        Command::Start => welcome(state, user, now).await,
        Command::Help => help(state),
        Command::Learn(level) => list_modules(state, &level),
        Command::Module(key) => show_module(state, &key),
        Command::Complete(key) => complete_module(state, user, &key, now).await,
        Command::Quiz(args) => start_quiz(state, user, &args, now).await,
        Command::Answer(choice) => answer_quiz(state, user, &choice, now).await,
        Command::Progress => show_progress(state, user, now).await,
        Command::Achievements => show_achievements(state, user, now).await,
        Command::Leaderboard => leaderboard(state).await,
        Command::Tips => daily_tip(state, now),
        Command::Reset => reset_progress(state, user).await,
        Command::Users(query) => list_users(state, user, &query).await,
        Command::Backup => backup(state, user).await,
    }
}

async fn welcome(state: &AppState, user: &UserRecord, now: DateTime<Utc>) -> String {
    let bot_name = &state.config.bot_name;
    let record = state.progress.get_at(&user.identity, now).await;
    let mut text = format!(
        "Hey {}! I'm {}, your friendly AI tutor. I'm here to help you learn about \
         cryptocurrency and stock trading!\n\n\
         Your current level: {}\n\n\
         Try these to get going:\n\
         /learn - browse learning modules\n\
         /quiz - test your knowledge\n\
         /progress - see how you're doing\n\
         /tips - get the tip of the day\n\n\
         You can also just chat with me. In groups, call me {} or reply to one of my messages.",
        user.display_name, bot_name, record.skill_level, bot_name
    );
    let suggestions = state.progress.recommendations(&record);
    if let Some(first) = suggestions.first() {
        text.push_str(&format!("\n\nSuggested next step: {}", first));
    }
    text
}

fn help(state: &AppState) -> String {
    format!(
        "{}\n\nJust send me a message to chat. In groups, mention {} or reply to me.",
        Command::descriptions(),
        state.config.bot_name
    )
}

fn format_module_list(title: &str, modules: &[&ModuleDefinition]) -> String {
    let mut text = format!("{}:\n", title);
    for module in modules {
        text.push_str(&format!(
            "- {}: {} ({} min)\n",
            module.key, module.title, module.estimated_minutes
        ));
    }
    text
}

fn list_modules(state: &AppState, level: &str) -> String {
    let level = level.trim();
    let mut text = if level.is_empty() {
        SkillLevel::ALL
            .into_iter()
            .map(|l| (l, state.catalog.list_modules(Some(l))))
            .filter(|(_, modules)| !modules.is_empty())
            .map(|(l, modules)| format_module_list(&format!("{} modules", capitalize(l.as_str())), &modules))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        match level.parse::<SkillLevel>() {
            Ok(l) => {
                let modules = state.catalog.list_modules(Some(l));
                if modules.is_empty() {
                    return format!("No {} modules are available yet.", l);
                }
                format_module_list(&format!("{} modules", capitalize(l.as_str())), &modules)
            }
            Err(e) => return format!("{}. Try beginner, intermediate or advanced.", e),
        }
    };
    text.push_str("\nOpen one with /module <key>.");
    text
}

fn show_module(state: &AppState, key: &str) -> String {
    let key = key.trim();
    if key.is_empty() {
        return "Usage: /module <key>. See /learn for the list.".to_string();
    }
    match state.catalog.get_module(key) {
        Ok(module) => format!(
            "{}\nLevel: {} | About {} min\n\n{}\n\nWhen you're done: /complete {}",
            module.title, module.difficulty, module.estimated_minutes, module.body, module.key
        ),
        Err(_) => format!("Module '{}' is not available. See /learn for the list.", key),
    }
}

fn new_achievements(before: &ProgressRecord, after: &ProgressRecord) -> Vec<&'static str> {
    Achievement::ALL
        .into_iter()
        .filter(|a| after.achievements.contains(a.key()) && !before.achievements.contains(a.key()))
        .map(Achievement::title)
        .collect()
}

fn append_achievements(text: &mut String, earned: &[&str]) {
    for title in earned {
        text.push_str(&format!("\nAchievement unlocked: {}!", title));
    }
}

async fn complete_module(state: &AppState, user: &UserRecord, key: &str, now: DateTime<Utc>) -> String {
    let key = key.trim();
    if key.is_empty() {
        return "Usage: /complete <key>. See /learn for the list.".to_string();
    }
    let module = match state.catalog.get_module(key) {
        Ok(module) => module,
        Err(_) => return format!("Module '{}' is not available. See /learn for the list.", key),
    };

    let before = state.progress.get_at(&user.identity, now).await;
    let after = state
        .progress
        .record_module_completion_at(&user.identity, &module.key, now)
        .await;

    if before.completed_modules.contains(&module.key) {
        return format!("You've already completed {}. Keep your streak going!", module.title);
    }
    let mut text = format!(
        "Completed {}! Overall score: {}%. Learning streak: {} days.",
        module.title, after.overall_score, after.streak
    );
    append_achievements(&mut text, &new_achievements(&before, &after));
    text
}

/// Picks a quiz for `topic`: the requested difficulty, or else the hardest one
/// at or below `level`, or else the easiest one available.
fn choose_quiz<'a>(
    state: &'a AppState,
    topic: &str,
    difficulty: Option<SkillLevel>,
    level: SkillLevel,
) -> Option<&'a QuizDefinition> {
    if let Some(difficulty) = difficulty {
        return state.catalog.get_quiz(topic, difficulty).ok();
    }
    let quizzes = state.catalog.quizzes_for(topic);
    quizzes
        .iter()
        .filter(|q| q.difficulty <= level)
        .max_by_key(|q| q.difficulty)
        .or_else(|| quizzes.iter().min_by_key(|q| q.difficulty))
        .copied()
}

async fn start_quiz(state: &AppState, user: &UserRecord, args: &str, now: DateTime<Utc>) -> String {
    let record = state.progress.get_at(&user.identity, now).await;
    let topics = state.catalog.topics();

    let mut topic = None;
    let mut difficulty = None;
    for token in args.split_whitespace() {
        match token.parse::<SkillLevel>() {
            Ok(level) => difficulty = Some(level),
            Err(_) => topic = Some(token.to_lowercase()),
        }
    }
    let topic = topic
        .or_else(|| {
            record
                .recent_topics
                .iter()
                .rev()
                .find(|t| topics.contains(&t.as_str()))
                .cloned()
        })
        .or_else(|| topics.first().map(|t| t.to_string()));
    let Some(topic) = topic else {
        return "No quizzes are available yet.".to_string();
    };

    let Some(quiz) = choose_quiz(state, &topic, difficulty, record.skill_level) else {
        let level = difficulty.map(|d| format!("{} ", d)).unwrap_or_default();
        return format!(
            "A {}{} quiz is not available. Topics: {}.",
            level,
            topic,
            topics.join(", ")
        );
    };

    let first = state.quizzes.start(&user.identity, quiz).await;
    info!(identity = %user.identity, topic = %quiz.topic, difficulty = %quiz.difficulty, "Quiz started");
    format!(
        "{} quiz ({}, pass mark {}%)\n\n{}",
        capitalize(&quiz.topic),
        quiz.difficulty,
        quiz.pass_percent,
        first
    )
}

async fn answer_quiz(state: &AppState, user: &UserRecord, choice: &str, now: DateTime<Utc>) -> String {
    let Ok(choice) = choice.trim().parse::<usize>() else {
        return "Please answer with a number, e.g. /answer 2".to_string();
    };
    let outcome = match state.quizzes.answer(&user.identity, choice).await {
        Ok(outcome) => outcome,
        Err(e) => return e.to_string(),
    };

    let verdict = |was_correct: bool, explanation: &str| {
        let head = if was_correct { "Correct!" } else { "Not quite." };
        if explanation.is_empty() {
            head.to_string()
        } else {
            format!("{} {}", head, explanation)
        }
    };

    match outcome {
        AnswerOutcome::Next {
            was_correct,
            explanation,
            next_question,
        } => format!("{}\n\n{}", verdict(was_correct, &explanation), next_question),
        AnswerOutcome::Finished {
            was_correct,
            explanation,
            topic,
            difficulty,
            correct,
            total,
        } => {
            let before = state.progress.get_at(&user.identity, now).await;
            let after = state
                .progress
                .record_quiz_result_at(&user.identity, &topic, difficulty, correct, total, now)
                .await;
            let pass_percent = state
                .catalog
                .get_quiz(&topic, difficulty)
                .map(|q| q.pass_percent)
                .unwrap_or(DEFAULT_PASS_PERCENT);

            let mut text = format!(
                "{}\n\nQuiz finished: {}/{} correct.",
                verdict(was_correct, &explanation),
                correct,
                total
            );
            if quiz_passed(correct, total, pass_percent) {
                text.push_str(" You passed!");
            } else {
                text.push_str(&format!(
                    " You need {}% to pass. Review the modules and try again.",
                    pass_percent
                ));
            }
            if after.skill_level != before.skill_level {
                text.push_str(&format!("\nLevel up! You're now {}.", after.skill_level));
            }
            append_achievements(&mut text, &new_achievements(&before, &after));
            text
        }
    }
}

async fn show_progress(state: &AppState, user: &UserRecord, now: DateTime<Utc>) -> String {
    let record = state.progress.get_at(&user.identity, now).await;
    let mut text = progress_summary(&user.display_name, &record, now.date_naive());
    let suggestions = state.progress.recommendations(&record);
    if !suggestions.is_empty() {
        text.push_str("\nRecommended next:\n");
        for suggestion in suggestions {
            text.push_str(&format!("- {}\n", suggestion));
        }
    }
    text
}

async fn show_achievements(state: &AppState, user: &UserRecord, now: DateTime<Utc>) -> String {
    let record = state.progress.get_at(&user.identity, now).await;
    let earned = Achievement::ALL
        .into_iter()
        .filter(|a| record.achievements.contains(a.key()))
        .count();
    let mut text = format!("Achievements ({}/{}):\n", earned, Achievement::ALL.len());
    for achievement in Achievement::ALL {
        let mark = if record.achievements.contains(achievement.key()) {
            "✅"
        } else {
            "🔒"
        };
        text.push_str(&format!("{} {}\n", mark, achievement.title()));
    }
    text
}

async fn leaderboard(state: &AppState) -> String {
    let board = state.progress.leaderboard(LEADERBOARD_SIZE).await;
    if board.is_empty() {
        return "No learners yet. Be the first: /learn".to_string();
    }
    let users = state.users.all().await;
    let mut text = String::from("Top learners:\n");
    for (rank, record) in board.iter().enumerate() {
        let name = users
            .get(&record.identity)
            .map_or(record.identity.as_str(), |u| u.display_name.as_str());
        text.push_str(&format!(
            "{}. {} - {}% ({} modules, {})\n",
            rank + 1,
            name,
            record.overall_score,
            record.completed_modules.len(),
            record.skill_level
        ));
    }
    text
}

fn daily_tip(state: &AppState, now: DateTime<Utc>) -> String {
    match state.catalog.daily_tip(now.date_naive()) {
        Some(tip) => format!("Tip of the day: {}", tip),
        None => "No tips are available right now.".to_string(),
    }
}

async fn reset_progress(state: &AppState, user: &UserRecord) -> String {
    state.progress.reset(&user.identity).await;
    state.quizzes.cancel(&user.identity).await;
    "Your progress has been reset. Start again with /learn.".to_string()
}

const ADMIN_ONLY: &str = "This command is only available to admins.";

async fn list_users(state: &AppState, user: &UserRecord, query: &str) -> String {
    if !state.users.is_admin(&user.identity).await {
        return ADMIN_ONLY.to_string();
    }
    let query = query.trim();
    let users: Vec<UserRecord> = if query.is_empty() {
        state.users.all().await.into_values().collect()
    } else {
        state.users.search(query).await
    };
    if users.is_empty() && query.is_empty() {
        return "No users have registered yet.".to_string();
    }
    if users.is_empty() {
        return format!("No users match '{}'.", query);
    }

    let scores: BTreeMap<String, u32> = state
        .progress
        .leaderboard(usize::MAX)
        .await
        .into_iter()
        .map(|record| (record.identity, record.overall_score))
        .collect();
    let mut by_role: BTreeMap<&str, usize> = BTreeMap::new();
    let mut text = format!("Users ({}):\n", users.len());
    for u in &users {
        *by_role.entry(u.role.as_str()).or_default() += 1;
        let handle = u
            .username
            .as_deref()
            .map(|h| format!(" (@{})", h))
            .unwrap_or_default();
        text.push_str(&format!(
            "- {}{} - {} - {}%\n",
            u.display_name,
            handle,
            u.role.as_str(),
            scores.get(&u.identity).copied().unwrap_or(0)
        ));
    }
    let roles: Vec<String> = by_role.iter().map(|(r, n)| format!("{} {}", n, r)).collect();
    text.push_str(&format!(
        "\n{}. {} preconfigured members.",
        roles.join(", "),
        state.users.known_users().entries().len()
    ));
    text
}

async fn backup(state: &AppState, user: &UserRecord) -> String {
    if !state.users.is_admin(&user.identity).await {
        return ADMIN_ONLY.to_string();
    }
    match state.store.backup().await {
        Ok(count) => format!("Backed up {} documents.", count),
        Err(e) => {
            error!(error = %e, "Backup failed");
            format!("Backup failed: {}", e)
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
