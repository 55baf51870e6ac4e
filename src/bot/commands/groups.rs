use teloxide::prelude::*;
use teloxide::types::Chat;

use crate::bot::commands::truncate_listing;
use crate::bot::handlers::{sender_identity, BotContext};
use crate::database::error::StoreError;
use crate::database::models::{Target, TargetKind};
use crate::utils::datetime::format_timestamp;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{
    log_command_error, log_command_success, log_database_error, log_database_operation,
};
use crate::utils::validation::parse_target_registration;

const LISTING_LIMIT: usize = 4000;

/// `/addgroup` with no arguments registers the chat it was sent in.
/// `/addgroup <chat_id> <name>` registers another chat by id.
pub async fn handle_add_group(
    bot: Bot,
    msg: Message,
    args: String,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender_identity(msg.from());

    let (chat_id, name, kind) = if args.trim().is_empty() {
        (msg.chat.id.0, chat_display_name(&msg.chat), chat_kind(&msg.chat))
    } else {
        match parse_target_registration(&args) {
            Ok((chat_id, name)) => (chat_id, name, kind_from_chat_id(chat_id)),
            Err(e) => {
                feedback
                    .validation_error(
                        &format!("Invalid target: {e}"),
                        "Run /addgroup inside the group, or use /addgroup <chat_id> <name>",
                    )
                    .await?;
                return Ok(());
            }
        }
    };

    match Target::register(&ctx.db.pool, chat_id, &name, kind).await {
        Ok(target) => {
            log_database_operation("INSERT", "targets", Some(&format!("chat {chat_id}")));
            log_command_success("addgroup", &user, user_id, Some(&format!("chat {chat_id}")));

            // Member counts are informational; a failure here leaves 0 in place.
            match bot.get_chat_member_count(ChatId(chat_id)).await {
                Ok(count) => {
                    if let Err(e) = Target::update_member_count(&ctx.db.pool, chat_id, count as i64).await {
                        log_database_error("UPDATE", "targets", &e.to_string());
                    }
                }
                Err(e) => tracing::debug!("Could not read member count for {}: {}", chat_id, e),
            }

            feedback
                .success(&format!(
                    "Registered \"{}\" ({}, {}) as a broadcast target.",
                    target.name, target.kind, target.chat_id
                ))
                .await?;
        }
        Err(StoreError::DuplicateTarget(chat_id)) => {
            feedback
                .warning(&format!("Chat {chat_id} is already registered."))
                .await?;
        }
        Err(e) => {
            log_command_error("addgroup", &user, user_id, &e.to_string());
            feedback.error("Failed to register the target").await?;
        }
    }

    Ok(())
}

pub async fn handle_remove_group(
    bot: Bot,
    msg: Message,
    chat_id: i64,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender_identity(msg.from());

    match Target::delete_by_chat_id(&ctx.db.pool, chat_id).await {
        Ok(true) => {
            log_database_operation("DELETE", "targets", Some(&format!("chat {chat_id}")));
            log_command_success("removegroup", &user, user_id, Some(&format!("chat {chat_id}")));
            feedback.success(&format!("Chat {chat_id} removed from targets.")).await?;
        }
        Ok(false) => {
            feedback
                .warning(&format!("Chat {chat_id} is not registered."))
                .await?;
        }
        Err(e) => {
            log_command_error("removegroup", &user, user_id, &e.to_string());
            feedback.error("Failed to remove the target").await?;
        }
    }

    Ok(())
}

pub async fn handle_list_groups(bot: Bot, msg: Message, ctx: &BotContext) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let targets = match Target::list_recent(&ctx.db.pool).await {
        Ok(targets) => targets,
        Err(e) => {
            log_database_error("SELECT", "targets", &e.to_string());
            feedback.error("Failed to load targets from the database").await?;
            return Ok(());
        }
    };

    if targets.is_empty() {
        feedback
            .info("No targets registered. Run /addgroup inside a group to add it.")
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, format_target_list(&targets)).await?;
    Ok(())
}

pub fn format_target_list(targets: &[Target]) -> String {
    let lines: Vec<String> = targets
        .iter()
        .map(|t| {
            format!(
                "• {} ({}) [{}] {} members - added {}",
                t.name,
                t.chat_id,
                t.kind,
                t.member_count,
                format_timestamp(&t.added_at)
            )
        })
        .collect();

    truncate_listing(&lines, &format!("👥 Targets ({})\n", targets.len()), LISTING_LIMIT)
}

fn chat_kind(chat: &Chat) -> TargetKind {
    if chat.is_private() {
        TargetKind::Private
    } else if chat.is_channel() {
        TargetKind::Channel
    } else {
        TargetKind::Group
    }
}

fn chat_display_name(chat: &Chat) -> String {
    chat.title()
        .or_else(|| chat.username())
        .or_else(|| chat.first_name())
        .map(str::to_string)
        .unwrap_or_else(|| chat.id.0.to_string())
}

/// Best guess for a chat registered by id: positive ids are users, anything
/// else is treated as a group.
pub fn kind_from_chat_id(chat_id: i64) -> TargetKind {
    if chat_id > 0 {
        TargetKind::Private
    } else {
        TargetKind::Group
    }
}
