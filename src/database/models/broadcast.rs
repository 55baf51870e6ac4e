use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::datetime::now_timestamp;

/// Summary of one finished broadcast run. Rows are written once and never
/// updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BroadcastRecord {
    pub id: i64,
    pub message_id: i64,
    pub message_title: String,
    pub total: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub executed_by: String,
    pub broadcast_at: String,
}

/// Totals across the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BroadcastStats {
    pub total_broadcasts: i64,
    pub total_sent: i64,
    pub total_succeeded: i64,
    pub total_failed: i64,
}

const RECORD_COLUMNS: &str =
    "id, message_id, message_title, total, succeeded, failed, executed_by, broadcast_at";

impl BroadcastRecord {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        message_id: i64,
        message_title: &str,
        total: i64,
        succeeded: i64,
        failed: i64,
        executed_by: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = now_timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO broadcast_history (message_id, message_title, total, succeeded, failed, executed_by, broadcast_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message_id)
        .bind(message_title)
        .bind(total)
        .bind(succeeded)
        .bind(failed)
        .bind(executed_by)
        .bind(&now)
        .execute(pool)
        .await?;

        Ok(BroadcastRecord {
            id: result.last_insert_rowid(),
            message_id,
            message_title: message_title.to_string(),
            total,
            succeeded,
            failed,
            executed_by: executed_by.to_string(),
            broadcast_at: now,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        record_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BroadcastRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM broadcast_history WHERE id = ?"
        ))
        .bind(record_id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first.
    pub async fn recent(pool: &sqlx::SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BroadcastRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM broadcast_history ORDER BY broadcast_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn stats(pool: &sqlx::SqlitePool) -> Result<BroadcastStats, sqlx::Error> {
        sqlx::query_as::<_, BroadcastStats>(
            r#"
            SELECT
                COUNT(*) AS total_broadcasts,
                COALESCE(SUM(total), 0) AS total_sent,
                COALESCE(SUM(succeeded), 0) AS total_succeeded,
                COALESCE(SUM(failed), 0) AS total_failed
            FROM broadcast_history
            "#,
        )
        .fetch_one(pool)
        .await
    }
}
