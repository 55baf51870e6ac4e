use teloxide::prelude::*;

use crate::bot::handlers::BotContext;
use crate::database::models::{BroadcastRecord, BroadcastStats, InboxEntry, MessageTemplate, Target};
use crate::utils::datetime::format_timestamp;
use crate::utils::feedback::{CommandFeedback, FeedbackType};

pub async fn handle_stats(bot: Bot, msg: Message, ctx: &BotContext) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let processing_msg = feedback.send_processing("Collecting broadcast statistics...").await?;

    let stats = match get_detailed_stats(&ctx.db.pool).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Failed to get stats: {}", e);
            feedback
                .update_message(
                    processing_msg.id,
                    FeedbackType::Error,
                    "Failed to retrieve statistics from the database",
                )
                .await?;
            return Ok(());
        }
    };

    feedback
        .update_message(processing_msg.id, FeedbackType::Success, &format_stats(&stats))
        .await?;

    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct DetailedStats {
    pub ledger: BroadcastStats,
    pub targets: i64,
    pub messages: i64,
    pub unread_inbox: i64,
    pub last_broadcast: Option<BroadcastRecord>,
}

async fn get_detailed_stats(pool: &sqlx::SqlitePool) -> Result<DetailedStats, sqlx::Error> {
    Ok(DetailedStats {
        ledger: BroadcastRecord::stats(pool).await?,
        targets: Target::count(pool).await?,
        messages: MessageTemplate::count(pool).await?,
        unread_inbox: InboxEntry::count_unread(pool).await?,
        last_broadcast: BroadcastRecord::recent(pool, 1).await?.into_iter().next(),
    })
}

pub fn format_stats(stats: &DetailedStats) -> String {
    let ledger = &stats.ledger;
    let success_rate = if ledger.total_sent > 0 {
        ledger.total_succeeded as f64 / ledger.total_sent as f64 * 100.0
    } else {
        0.0
    };

    let mut text = format!(
        "📊 Broadcast Statistics\n\n\
        📣 Broadcasts:\n\
        • Runs: {}\n\
        • Deliveries attempted: {}\n\
        • Delivered: {} ({:.1}%)\n\
        • Failed: {}\n\n\
        📦 Registry:\n\
        • Targets: {}\n\
        • Saved messages: {}\n\
        • Unread inbox: {}\n",
        ledger.total_broadcasts,
        ledger.total_sent,
        ledger.total_succeeded,
        success_rate,
        ledger.total_failed,
        stats.targets,
        stats.messages,
        stats.unread_inbox,
    );

    if let Some(last) = &stats.last_broadcast {
        text.push_str(&format!(
            "\n🕐 Last broadcast: \"{}\" by {} at {} ({}/{} delivered)",
            last.message_title,
            last.executed_by,
            format_timestamp(&last.broadcast_at),
            last.succeeded,
            last.total
        ));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stats_empty_ledger() {
        let text = format_stats(&DetailedStats::default());
        assert!(text.contains("Runs: 0"));
        assert!(text.contains("Delivered: 0 (0.0%)"));
        assert!(!text.contains("Last broadcast"));
    }

    #[test]
    fn test_format_stats_success_rate() {
        let stats = DetailedStats {
            ledger: BroadcastStats {
                total_broadcasts: 2,
                total_sent: 4,
                total_succeeded: 3,
                total_failed: 1,
            },
            targets: 2,
            messages: 1,
            unread_inbox: 0,
            last_broadcast: None,
        };

        let text = format_stats(&stats);
        assert!(text.contains("Delivered: 3 (75.0%)"));
        assert!(text.contains("Targets: 2"));
    }
}
