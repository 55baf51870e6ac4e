use teloxide::prelude::*;

use crate::bot::commands::truncate_listing;
use crate::bot::handlers::{sender_identity, BotContext};
use crate::database::models::{MessageKind, MessageTemplate, NewTemplate};
use crate::services::broadcast::BroadcastError;
use crate::utils::datetime::format_timestamp;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_success, log_database_operation};
use crate::utils::validation::{
    parse_button_layout, parse_id_and_rest, parse_title_and_content, validate_content_for_kind,
};

const LISTING_LIMIT: usize = 4000;

pub async fn handle_new_message(
    bot: Bot,
    msg: Message,
    text: String,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender_identity(msg.from());

    let (title, content) = match parse_title_and_content(&text) {
        Ok(parts) => parts,
        Err(e) => {
            feedback
                .validation_error(
                    &format!("Invalid message: {e}"),
                    "Use /newmessage Title | Content. Reply to a photo, video or file to attach it.",
                )
                .await?;
            return Ok(());
        }
    };

    let (kind, media_file_id) = match attached_media(&msg) {
        Some((kind, file_id)) => (kind, Some(file_id)),
        None => (MessageKind::Text, None),
    };

    if let Err(e) = validate_content_for_kind(&content, kind) {
        feedback
            .validation_error(&format!("Invalid message: {e}"), "Shorten the content or send it as a text message.")
            .await?;
        return Ok(());
    }

    let new = NewTemplate {
        title,
        content,
        kind,
        media_file_id,
        buttons: None,
    };

    match MessageTemplate::create(&ctx.db.pool, new).await {
        Ok(message) => {
            log_database_operation("INSERT", "messages", Some(&format!("id {}", message.id)));
            log_command_success("newmessage", &user, user_id, Some(&format!("message {}", message.id)));
            feedback
                .success(&format!(
                    "Saved message #{} \"{}\" ({}).\n\nPreview with /preview {} or send with /broadcast {}",
                    message.id, message.title, message.kind, message.id, message.id
                ))
                .await?;
        }
        Err(e) => {
            log_command_error("newmessage", &user, user_id, &e.to_string());
            feedback.error("Failed to save the message").await?;
        }
    }

    Ok(())
}

pub async fn handle_edit_message(
    bot: Bot,
    msg: Message,
    args: String,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender_identity(msg.from());

    let parsed = parse_id_and_rest(&args)
        .and_then(|(id, rest)| parse_title_and_content(&rest).map(|(title, content)| (id, title, content)));
    let (message_id, title, content) = match parsed {
        Ok(parts) => parts,
        Err(e) => {
            feedback
                .validation_error(&format!("Invalid edit: {e}"), "Use /editmessage <id> Title | Content")
                .await?;
            return Ok(());
        }
    };

    let existing = match MessageTemplate::find_by_id(&ctx.db.pool, message_id).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            feedback
                .validation_error(&format!("Message #{message_id} not found"), "Use /messages to see saved messages.")
                .await?;
            return Ok(());
        }
        Err(e) => {
            log_command_error("editmessage", &user, user_id, &e.to_string());
            feedback.error("Failed to load the message").await?;
            return Ok(());
        }
    };

    if let Err(e) = validate_content_for_kind(&content, existing.message_kind()) {
        feedback
            .validation_error(&format!("Invalid edit: {e}"), "Shorten the content to fit the media caption.")
            .await?;
        return Ok(());
    }

    match MessageTemplate::update_content(&ctx.db.pool, message_id, &title, &content).await {
        Ok(true) => {
            log_command_success("editmessage", &user, user_id, Some(&format!("message {message_id}")));
            feedback.success(&format!("Message #{message_id} updated.")).await?;
        }
        Ok(false) => {
            feedback
                .validation_error(&format!("Message #{message_id} not found"), "Use /messages to see saved messages.")
                .await?;
        }
        Err(e) => {
            log_command_error("editmessage", &user, user_id, &e.to_string());
            feedback.error("Failed to update the message").await?;
        }
    }

    Ok(())
}

pub async fn handle_set_buttons(
    bot: Bot,
    msg: Message,
    args: String,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender_identity(msg.from());
    let suggestion = "Use /setbuttons <id> Label=https://example.com; Other=https://example.org or /setbuttons <id> clear";

    let (message_id, layout_text) = match parse_id_and_rest(&args) {
        Ok(parts) => parts,
        Err(e) => {
            feedback.validation_error(&format!("Invalid buttons: {e}"), suggestion).await?;
            return Ok(());
        }
    };

    let layout = if layout_text.eq_ignore_ascii_case("clear") {
        None
    } else {
        match parse_button_layout(&layout_text) {
            Ok(layout) => Some(layout),
            Err(e) => {
                feedback.validation_error(&format!("Invalid buttons: {e}"), suggestion).await?;
                return Ok(());
            }
        }
    };

    match MessageTemplate::set_buttons(&ctx.db.pool, message_id, layout.as_deref()).await {
        Ok(true) => {
            log_command_success("setbuttons", &user, user_id, Some(&format!("message {message_id}")));
            let text = match &layout {
                Some(rows) => format!("Message #{message_id} now has {} button(s).", rows.len()),
                None => format!("Buttons removed from message #{message_id}."),
            };
            feedback.success(&text).await?;
        }
        Ok(false) => {
            feedback
                .validation_error(&format!("Message #{message_id} not found"), "Use /messages to see saved messages.")
                .await?;
        }
        Err(e) => {
            log_command_error("setbuttons", &user, user_id, &e.to_string());
            feedback.error("Failed to update buttons").await?;
        }
    }

    Ok(())
}

pub async fn handle_delete_message(
    bot: Bot,
    msg: Message,
    message_id: i64,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender_identity(msg.from());

    match MessageTemplate::delete(&ctx.db.pool, message_id).await {
        Ok(true) => {
            log_command_success("deletemessage", &user, user_id, Some(&format!("message {message_id}")));
            feedback.success(&format!("Message #{message_id} deleted.")).await?;
        }
        Ok(false) => {
            feedback.warning(&format!("Message #{message_id} does not exist.")).await?;
        }
        Err(e) => {
            log_command_error("deletemessage", &user, user_id, &e.to_string());
            feedback.error("Failed to delete the message").await?;
        }
    }

    Ok(())
}

pub async fn handle_list_messages(bot: Bot, msg: Message, ctx: &BotContext) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let messages = match MessageTemplate::list_recent(&ctx.db.pool).await {
        Ok(messages) => messages,
        Err(e) => {
            tracing::error!("Failed to list messages: {}", e);
            feedback.error("Failed to load messages from the database").await?;
            return Ok(());
        }
    };

    if messages.is_empty() {
        feedback.info("No messages yet. Create one with /newmessage Title | Content").await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, format_message_list(&messages)).await?;
    Ok(())
}

pub async fn handle_preview(
    bot: Bot,
    msg: Message,
    message_id: i64,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    match ctx.broadcaster.send_preview(message_id, msg.chat.id.0).await {
        Ok(()) => {}
        Err(BroadcastError::MessageNotFound(id)) => {
            feedback
                .validation_error(&format!("Message #{id} not found"), "Use /messages to see saved messages.")
                .await?;
        }
        Err(e) => {
            tracing::warn!("Preview of message {} failed: {}", message_id, e);
            feedback.error(&format!("Preview failed: {e}")).await?;
        }
    }

    Ok(())
}

/// Media the command message replies to, if any. The largest photo size wins.
fn attached_media(msg: &Message) -> Option<(MessageKind, String)> {
    let source = msg.reply_to_message()?;

    if let Some(photo) = source.photo().and_then(|sizes| sizes.last()) {
        return Some((MessageKind::Photo, photo.file.id.clone()));
    }
    if let Some(video) = source.video() {
        return Some((MessageKind::Video, video.file.id.clone()));
    }
    source
        .document()
        .map(|document| (MessageKind::Document, document.file.id.clone()))
}

pub fn format_message_list(messages: &[MessageTemplate]) -> String {
    let lines: Vec<String> = messages
        .iter()
        .map(|m| {
            let buttons = if m.buttons.is_some() { " 🔘" } else { "" };
            format!(
                "#{} {} [{}]{} - {}",
                m.id,
                m.title,
                m.kind,
                buttons,
                format_timestamp(&m.created_at)
            )
        })
        .collect();

    truncate_listing(&lines, &format!("📝 Saved messages ({})\n", messages.len()), LISTING_LIMIT)
}
