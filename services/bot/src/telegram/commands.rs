//! services/bot/src/telegram/commands.rs
//!
//! The bot's slash commands.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "start learning and get a welcome message.")]
    Start,
    #[command(description = "show this help.")]
    Help,
    #[command(description = "list learning modules, optionally for one level: /learn beginner")]
    Learn(String),
    #[command(description = "read a module: /module crypto-101")]
    Module(String),
    #[command(description = "mark a module as completed: /complete crypto-101")]
    Complete(String),
    #[command(description = "take a quiz: /quiz crypto [easy|medium|hard]")]
    Quiz(String),
    #[command(description = "answer the current quiz question: /answer 2")]
    Answer(String),
    #[command(description = "show your learning progress.")]
    Progress,
    #[command(description = "list achievements you have earned and the ones still locked.")]
    Achievements,
    #[command(description = "show the top learners.")]
    Leaderboard,
    #[command(description = "get the tip of the day.")]
    Tips,
    #[command(description = "start your learning progress over.")]
    Reset,
    #[command(description = "(admin) list or search users: /users [name]")]
    Users(String),
    #[command(description = "(admin) back up the record store.")]
    Backup,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_arguments_as_one_string() {
        assert_eq!(
            Command::parse("/quiz crypto hard", "ayaka_bot").expect("parse"),
            Command::Quiz("crypto hard".to_string())
        );
        assert_eq!(
            Command::parse("/learn", "ayaka_bot").expect("parse"),
            Command::Learn(String::new())
        );
        assert_eq!(
            Command::parse("/progress@ayaka_bot", "ayaka_bot").expect("parse"),
            Command::Progress
        );
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(Command::parse("/moon", "ayaka_bot").is_err());
    }
}
