//! services/bot/src/telegram/format.rs
//!
//! Outbound text helpers: markdown cleanup and splitting at Telegram's
//! message length limit.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum message length for Telegram, in characters.
pub const TELEGRAM_MESSAGE_LENGTH_MAX: usize = 4096;

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[\w+-]*\n?(.*?)\n?```").expect("valid regex"));
static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("valid regex"));
static RE_BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\n]+)\*\*|__([^_\n]+)__").expect("valid regex"));
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid regex"));
static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").expect("valid regex"));
static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid regex"));

/// Strips the markdown that Telegram fails to parse: code fences, inline code,
/// bold, italic, headings and links. Link text is kept, followed by the URL.
pub fn clean_markdown(text: &str) -> String {
    let cleaned = RE_CODE_FENCE.replace_all(text, "$1");
    let cleaned = RE_INLINE_CODE.replace_all(&cleaned, "$1");
    let cleaned = RE_BOLD.replace_all(&cleaned, "$1$2");
    let cleaned = RE_ITALIC.replace_all(&cleaned, "$1");
    let cleaned = RE_LINK.replace_all(&cleaned, "$1 ($2)");
    let cleaned = RE_HEADING.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Splits `text` into chunks of at most `limit` characters, breaking at the
/// last newline inside the limit when there is one.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while rest.chars().count() > limit {
        let hard_cut = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(i, _)| i);
        let cut = rest[..hard_cut]
            .rfind('\n')
            .filter(|&i| i > 0)
            .unwrap_or(hard_cut);
        let chunk = rest[..cut].trim_end();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// Cleans and splits a reply for sending.
pub fn prepare_reply(text: &str) -> Vec<String> {
    split_message(&clean_markdown(text), TELEGRAM_MESSAGE_LENGTH_MAX)
}
