use teloxide::prelude::*;

use crate::bot::commands::truncate_listing;
use crate::bot::handlers::{sender_identity, BotContext};
use crate::database::models::BroadcastRecord;
use crate::services::broadcast::{BroadcastError, BroadcastOutcome, TriggeredBy};
use crate::utils::datetime::format_timestamp;
use crate::utils::feedback::{CommandFeedback, FeedbackType};
use crate::utils::logging::{log_command_error, log_command_success, log_database_error};

const HISTORY_LIMIT: i64 = 20;
const LISTING_LIMIT: usize = 4000;
/// Failed targets listed by name in the summary; the rest are only counted.
const MAX_LISTED_FAILURES: usize = 10;

pub async fn handle_broadcast(
    bot: Bot,
    msg: Message,
    message_id: i64,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender_identity(msg.from());

    let processing = feedback
        .send_processing(&format!("Broadcasting message #{message_id}..."))
        .await?;

    let triggered_by = TriggeredBy::Admin(user.clone());
    match ctx.broadcaster.broadcast_message(message_id, &triggered_by).await {
        Ok(outcome) => {
            log_command_success(
                "broadcast",
                &user,
                user_id,
                Some(&format!("message {message_id}: {}/{}", outcome.succeeded, outcome.total)),
            );
            let feedback_type = if outcome.failed == 0 {
                FeedbackType::Success
            } else {
                FeedbackType::Warning
            };
            feedback
                .update_message(processing.id, feedback_type, &format_outcome(message_id, &outcome))
                .await?;
        }
        Err(BroadcastError::MessageNotFound(id)) => {
            feedback
                .update_message(
                    processing.id,
                    FeedbackType::Error,
                    &format!("Message #{id} not found. Use /messages to see saved messages."),
                )
                .await?;
        }
        Err(e) => {
            log_command_error("broadcast", &user, user_id, &e.to_string());
            feedback
                .update_message(processing.id, FeedbackType::Error, &format!("Broadcast failed: {e}"))
                .await?;
        }
    }

    Ok(())
}

pub async fn handle_history(bot: Bot, msg: Message, ctx: &BotContext) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let records = match BroadcastRecord::recent(&ctx.db.pool, HISTORY_LIMIT).await {
        Ok(records) => records,
        Err(e) => {
            log_database_error("SELECT", "broadcast_history", &e.to_string());
            feedback.error("Failed to load broadcast history").await?;
            return Ok(());
        }
    };

    if records.is_empty() {
        feedback.info("No broadcasts yet.").await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, format_history(&records)).await?;
    Ok(())
}

pub fn format_outcome(message_id: i64, outcome: &BroadcastOutcome) -> String {
    let mut text = format!(
        "Broadcast of message #{} finished.\n\nTargets: {}\nDelivered: {}\nFailed: {}",
        message_id, outcome.total, outcome.succeeded, outcome.failed
    );

    if outcome.total == 0 {
        text.push_str("\n\nNo targets are registered. Add one with /addgroup.");
        return text;
    }

    if !outcome.failures.is_empty() {
        text.push_str("\n\nFailed targets:");
        for failure in outcome.failures.iter().take(MAX_LISTED_FAILURES) {
            text.push_str(&format!("\n• {} ({}): {}", failure.name, failure.chat_id, failure.reason));
        }
        if outcome.failures.len() > MAX_LISTED_FAILURES {
            text.push_str(&format!(
                "\n… and {} more",
                outcome.failures.len() - MAX_LISTED_FAILURES
            ));
        }
    }

    text
}

pub fn format_history(records: &[BroadcastRecord]) -> String {
    let lines: Vec<String> = records
        .iter()
        .map(|r| {
            format!(
                "#{} \"{}\" (message {}) - {}/{} delivered, {} failed - by {} at {}",
                r.id,
                r.message_title,
                r.message_id,
                r.succeeded,
                r.total,
                r.failed,
                r.executed_by,
                format_timestamp(&r.broadcast_at)
            )
        })
        .collect();

    truncate_listing(&lines, "📜 Recent broadcasts\n", LISTING_LIMIT)
}
