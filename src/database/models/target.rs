use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::database::error::{is_unique_violation, StoreError};
use crate::utils::datetime::now_timestamp;

/// Kind of chat a target points at. Supergroups are stored as groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Private,
    Group,
    Channel,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Private => "private",
            TargetKind::Group => "group",
            TargetKind::Channel => "channel",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(TargetKind::Private),
            "group" | "supergroup" => Ok(TargetKind::Group),
            "channel" => Ok(TargetKind::Channel),
            other => Err(format!("unknown target kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub chat_id: i64,
    pub name: String,
    pub kind: String,
    pub member_count: i64,
    pub added_at: String,
}

const TARGET_COLUMNS: &str = "id, chat_id, name, kind, member_count, added_at";

impl Target {
    pub fn target_kind(&self) -> TargetKind {
        self.kind.parse().unwrap_or(TargetKind::Group)
    }

    /// Adds a destination. An already registered `chat_id` is rejected and the
    /// existing row is left untouched.
    pub async fn register(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
        name: &str,
        kind: TargetKind,
    ) -> Result<Self, StoreError> {
        if Self::find_by_chat_id(pool, chat_id).await?.is_some() {
            return Err(StoreError::DuplicateTarget(chat_id));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO targets (chat_id, name, kind, member_count, added_at)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(chat_id)
        .bind(name)
        .bind(kind.as_str())
        .bind(now_timestamp())
        .execute(pool)
        .await;

        // The pre-check can race with a concurrent insert; the UNIQUE
        // constraint is the real guard.
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(StoreError::DuplicateTarget(chat_id)),
            Err(e) => return Err(e.into()),
        }

        Self::find_by_chat_id(pool, chat_id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    pub async fn find_by_chat_id(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Target>(&format!(
            "SELECT {TARGET_COLUMNS} FROM targets WHERE chat_id = ?"
        ))
        .bind(chat_id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first, for display.
    pub async fn list_recent(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Target>(&format!(
            "SELECT {TARGET_COLUMNS} FROM targets ORDER BY added_at DESC, id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Insertion order, which is the order broadcasts walk the registry.
    pub async fn list_for_delivery(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Target>(&format!(
            "SELECT {TARGET_COLUMNS} FROM targets ORDER BY id ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn update_member_count(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
        member_count: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE targets SET member_count = ? WHERE chat_id = ?")
            .bind(member_count)
            .bind(chat_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_chat_id(
        pool: &sqlx::SqlitePool,
        chat_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM targets WHERE chat_id = ?")
            .bind(chat_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM targets")
            .fetch_one(pool)
            .await
    }
}
