use teloxide::prelude::*;

use crate::bot::handlers::{sender_identity, BotContext, HandlerResult};
use crate::database::models::InboxEntry;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_database_error, log_database_operation};

/// Everything that is not a recognised command lands here.
///
/// Admins typing something command-like get a hint. Private messages from
/// everyone else go to the inbox.
pub async fn handle_general_message(bot: Bot, msg: Message, ctx: BotContext) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if ctx.is_admin(msg.from()) {
        if text.starts_with('/') {
            let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
            let command = text.split_whitespace().next().unwrap_or(text);
            let error_msg = format!("Unknown command or missing arguments: {command}");
            feedback
                .validation_error(&error_msg, "Use /help to see all commands and their arguments.")
                .await?;
        }
        return Ok(());
    }

    if !msg.chat.is_private() || text.starts_with('/') {
        return Ok(());
    }

    let (_, user_id) = sender_identity(msg.from());
    let username = msg.from().and_then(|u| u.username.clone());

    match InboxEntry::record(&ctx.db.pool, user_id, username, text.to_string()).await {
        Ok(entry) => {
            log_database_operation("INSERT", "inbox", Some(&format!("entry {} from {}", entry.id, user_id)));
            bot.send_message(msg.chat.id, "📨 Thanks, your message has been received.")
                .await?;
        }
        Err(e) => {
            log_database_error("INSERT", "inbox", &e.to_string());
        }
    }

    Ok(())
}
