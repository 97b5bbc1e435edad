//! services/bot/src/telegram/envelope.rs
//!
//! Translates Telegram messages into the platform-neutral `InboundMessage`.

use learning_assistant_core::{ChatKind, InboundMessage, Sender};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use teloxide::types::{Me, Message, User};

// Telegram usernames are 5-32 characters of letters, digits and underscores.
static RE_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w@])@(\w{5,32})\b").expect("valid regex"));

/// `@username` mentions in `text`, without the `@`.
pub fn extract_mentions(text: &str) -> BTreeSet<String> {
    RE_MENTION
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// First and last name joined, or a placeholder when both are blank.
pub fn display_name(first_name: &str, last_name: Option<&str>) -> String {
    let name = match last_name.map(str::trim).filter(|l| !l.is_empty()) {
        Some(last) => format!("{} {}", first_name.trim(), last),
        None => first_name.trim().to_string(),
    };
    if name.is_empty() {
        "Friend".to_string()
    } else {
        name
    }
}

pub fn sender_from_user(user: &User) -> Sender {
    Sender {
        identity: user.id.0.to_string(),
        username: user.username.clone(),
        display_name: display_name(&user.first_name, user.last_name.as_deref()),
    }
}

/// The human who sent `msg`, if any. Messages from bots are skipped.
pub fn sender_of(msg: &Message) -> Option<Sender> {
    msg.from()
        .filter(|user| !user.is_bot)
        .map(sender_from_user)
}

/// Builds the envelope for a text message. Returns `None` for non-text
/// messages and messages without a human sender.
pub fn to_inbound(msg: &Message, me: &Me) -> Option<InboundMessage> {
    let text = msg.text()?;
    let sender = sender_of(msg)?;
    let is_reply_to_bot = msg
        .reply_to_message()
        .and_then(|reply| reply.from())
        .is_some_and(|author| author.id == me.user.id);
    let chat_kind = if msg.chat.is_private() {
        ChatKind::Direct
    } else {
        ChatKind::Group
    };

    Some(InboundMessage {
        sender,
        chat_id: msg.chat.id.0.to_string(),
        chat_kind,
        text: text.to_string(),
        is_reply_to_bot,
        mentioned_names: extract_mentions(text),
        received_at: msg.date,
    })
}
