//! services/bot/src/telegram/dispatch.rs
//!
//! The teloxide handler tree: slash commands go to `replies`, every other text
//! message goes through the conversation handler.

use crate::error::BotError;
use crate::telegram::commands::Command;
use crate::telegram::envelope::{sender_of, to_inbound};
use crate::telegram::format::prepare_reply;
use crate::telegram::replies::reply_to_command;
use crate::telegram::state::AppState;
use learning_assistant_core::{classify, Disposition};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, Me};
use tracing::{debug, error};

/// Builds the update handler tree used by the dispatcher.
pub fn schema() -> UpdateHandler<BotError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_text))
}

/// Cleans, splits and sends a reply. Send failures are logged per chunk.
async fn send_reply(bot: &Bot, chat_id: ChatId, text: &str) {
    for chunk in prepare_reply(text) {
        if let Err(e) = bot.send_message(chat_id, chunk).await {
            error!(error = %e, chat_id = chat_id.0, "Failed to send Telegram message");
        }
    }
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    command: Command,
    state: Arc<AppState>,
) -> Result<(), BotError> {
    let Some(sender) = sender_of(&msg) else {
        return Ok(());
    };
    debug!(identity = %sender.identity, ?command, "Handling command");

    let user = state.users.resolve_at(&sender, msg.date).await;
    let reply = reply_to_command(&state, &user, command, msg.date).await;
    send_reply(&bot, msg.chat.id, &reply).await;
    Ok(())
}

async fn handle_text(bot: Bot, msg: Message, me: Me, state: Arc<AppState>) -> Result<(), BotError> {
    let Some(inbound) = to_inbound(&msg, &me) else {
        return Ok(());
    };
    if classify(&inbound, state.conversation.persona()) == Disposition::Ignore {
        return Ok(());
    }

    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        debug!(error = %e, "Failed to send typing indicator");
    }
    let outcome = state.conversation.handle(&inbound).await;
    if let Some(text) = outcome.reply_text() {
        send_reply(&bot, msg.chat.id, text).await;
    }
    Ok(())
}
