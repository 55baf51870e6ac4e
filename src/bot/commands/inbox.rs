use teloxide::prelude::*;

use crate::bot::commands::truncate_listing;
use crate::bot::handlers::{sender_identity, BotContext};
use crate::database::models::InboxEntry;
use crate::utils::datetime::format_timestamp;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_success, log_database_error};

const INBOX_LIMIT: i64 = 20;
const LISTING_LIMIT: usize = 4000;
/// Long entries are shortened in the listing only; the stored text is kept whole.
const PREVIEW_CHARS: usize = 200;

pub async fn handle_inbox(bot: Bot, msg: Message, ctx: &BotContext) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let entries = match InboxEntry::list_recent(&ctx.db.pool, INBOX_LIMIT).await {
        Ok(entries) => entries,
        Err(e) => {
            log_database_error("SELECT", "inbox", &e.to_string());
            feedback.error("Failed to load the inbox").await?;
            return Ok(());
        }
    };

    if entries.is_empty() {
        feedback.info("The inbox is empty.").await?;
        return Ok(());
    }

    let unread = match InboxEntry::count_unread(&ctx.db.pool).await {
        Ok(unread) => unread,
        Err(e) => {
            log_database_error("SELECT", "inbox", &e.to_string());
            feedback.error("Failed to load the inbox").await?;
            return Ok(());
        }
    };
    bot.send_message(msg.chat.id, format_inbox(&entries, unread)).await?;
    Ok(())
}

pub async fn handle_read(
    bot: Bot,
    msg: Message,
    entry_id: i64,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender_identity(msg.from());

    match InboxEntry::mark_read(&ctx.db.pool, entry_id).await {
        Ok(true) => {
            log_command_success("read", &user, user_id, Some(&format!("entry {entry_id}")));
            feedback.success(&format!("Inbox entry #{entry_id} marked as read.")).await?;
        }
        Ok(false) => {
            feedback
                .warning(&format!("Inbox entry #{entry_id} does not exist."))
                .await?;
        }
        Err(e) => {
            log_command_error("read", &user, user_id, &e.to_string());
            feedback.error("Failed to update the inbox").await?;
        }
    }

    Ok(())
}

pub async fn handle_read_all(bot: Bot, msg: Message, ctx: &BotContext) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let (user, user_id) = sender_identity(msg.from());

    match InboxEntry::mark_all_read(&ctx.db.pool).await {
        Ok(updated) => {
            log_command_success("readall", &user, user_id, Some(&format!("{updated} entries")));
            feedback
                .success(&format!("Marked {updated} inbox entries as read."))
                .await?;
        }
        Err(e) => {
            log_command_error("readall", &user, user_id, &e.to_string());
            feedback.error("Failed to update the inbox").await?;
        }
    }

    Ok(())
}

/// `unread` is the total across the whole inbox, not just the listed entries.
pub fn format_inbox(entries: &[InboxEntry], unread: i64) -> String {
    let lines: Vec<String> = entries
        .iter()
        .map(|entry| {
            let marker = if entry.is_read { "  " } else { "🆕" };
            let from = entry
                .username
                .as_ref()
                .map(|name| format!("@{name}"))
                .unwrap_or_else(|| entry.user_id.to_string());
            format!(
                "{} #{} from {} at {}\n{}",
                marker,
                entry.id,
                from,
                format_timestamp(&entry.received_at),
                shorten(&entry.text, PREVIEW_CHARS)
            )
        })
        .collect();

    truncate_listing(
        &lines,
        &format!("📬 Inbox ({unread} unread)\nMark entries with /read <id> or /readall\n"),
        LISTING_LIMIT,
    )
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(max_chars).collect();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, username: Option<&str>, text: &str, is_read: bool) -> InboxEntry {
        InboxEntry {
            id,
            user_id: 42,
            username: username.map(str::to_string),
            text: text.to_string(),
            received_at: "2024-06-01T10:00:00.000000Z".to_string(),
            is_read,
        }
    }

    #[test]
    fn test_format_inbox_marks_unread() {
        let entries = vec![entry(2, Some("alice"), "hello", false), entry(1, None, "older", true)];
        let text = format_inbox(&entries, 1);

        assert!(text.starts_with("📬 Inbox (1 unread)"));
        assert!(text.contains("🆕 #2 from @alice"));
        assert!(text.contains("#1 from 42"));
    }

    #[test]
    fn test_format_inbox_header_uses_total_unread() {
        let entries = vec![entry(30, None, "latest", false)];
        let text = format_inbox(&entries, 25);

        assert!(text.starts_with("📬 Inbox (25 unread)"));
    }

    #[test]
    fn test_shorten_long_text() {
        let long = "x".repeat(250);
        let short = shorten(&long, PREVIEW_CHARS);
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(shorten("short", PREVIEW_CHARS), "short");
    }
}
