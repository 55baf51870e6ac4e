use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::datetime::now_timestamp;

/// A message a user sent to the bot.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InboxEntry {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub text: String,
    pub received_at: String,
    pub is_read: bool,
}

const INBOX_COLUMNS: &str = "id, user_id, username, text, received_at, is_read";

impl InboxEntry {
    /// Appends an entry. No deduplication: the same text twice is two entries.
    pub async fn record(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        username: Option<String>,
        text: String,
    ) -> Result<Self, sqlx::Error> {
        let now = now_timestamp();

        let result = sqlx::query(
            "INSERT INTO inbox (user_id, username, text, received_at, is_read) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(user_id)
        .bind(&username)
        .bind(&text)
        .bind(&now)
        .execute(pool)
        .await?;

        Ok(InboxEntry {
            id: result.last_insert_rowid(),
            user_id,
            username,
            text,
            received_at: now,
            is_read: false,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        entry_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, InboxEntry>(&format!(
            "SELECT {INBOX_COLUMNS} FROM inbox WHERE id = ?"
        ))
        .bind(entry_id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first.
    pub async fn list_recent(pool: &sqlx::SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, InboxEntry>(&format!(
            "SELECT {INBOX_COLUMNS} FROM inbox ORDER BY received_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Idempotent. Returns `false` only when the entry does not exist.
    pub async fn mark_read(pool: &sqlx::SqlitePool, entry_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE inbox SET is_read = 1 WHERE id = ?")
            .bind(entry_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns how many entries flipped from unread to read.
    pub async fn mark_all_read(pool: &sqlx::SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE inbox SET is_read = 1 WHERE is_read = 0")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_unread(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inbox WHERE is_read = 0")
            .fetch_one(pool)
            .await
    }
}
