use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::utils::datetime::now_timestamp;

/// How a message body is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Photo,
    Video,
    Document,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Photo => "photo",
            MessageKind::Video => "video",
            MessageKind::Document => "document",
        }
    }

    pub fn has_media(&self) -> bool {
        !matches!(self, MessageKind::Text)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "photo" => Ok(MessageKind::Photo),
            "video" => Ok(MessageKind::Video),
            "document" => Ok(MessageKind::Document),
            other => Err(format!("unknown message kind '{other}'")),
        }
    }
}

/// One inline URL button. Rows of these make up a message's keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub kind: String,
    pub media_file_id: Option<String>,
    pub buttons: Option<String>, // JSON: [[{"text": .., "url": ..}]]
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied by the author when a message is created.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub title: String,
    pub content: String,
    pub kind: MessageKind,
    pub media_file_id: Option<String>,
    pub buttons: Option<Vec<Vec<ButtonSpec>>>,
}

impl NewTemplate {
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            kind: MessageKind::Text,
            media_file_id: None,
            buttons: None,
        }
    }
}

const MESSAGE_COLUMNS: &str =
    "id, title, content, kind, media_file_id, buttons, created_at, updated_at";

impl MessageTemplate {
    /// Parsed delivery kind; unknown values stored by hand fall back to text.
    pub fn message_kind(&self) -> MessageKind {
        self.kind.parse().unwrap_or(MessageKind::Text)
    }

    /// Decodes the stored keyboard layout. A message without buttons yields
    /// an empty layout.
    pub fn button_rows(&self) -> Result<Vec<Vec<ButtonSpec>>, serde_json::Error> {
        match self.buttons.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn create(pool: &sqlx::SqlitePool, new: NewTemplate) -> Result<Self, sqlx::Error> {
        let now = now_timestamp();
        let buttons = new
            .buttons
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| sqlx::Error::Protocol(format!("failed to encode buttons: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO messages (title, content, kind, media_file_id, buttons, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.title)
        .bind(&new.content)
        .bind(new.kind.as_str())
        .bind(&new.media_file_id)
        .bind(&buttons)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        message_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MessageTemplate>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?"
        ))
        .bind(message_id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first.
    pub async fn list_recent(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MessageTemplate>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Replaces title and content in place. Returns `false` if no such message.
    pub async fn update_content(
        pool: &sqlx::SqlitePool,
        message_id: i64,
        title: &str,
        content: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET title = ?, content = ?, updated_at = ? WHERE id = ?",
        )
        .bind(title)
        .bind(content)
        .bind(now_timestamp())
        .bind(message_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the keyboard layout; `None` or an empty layout clears it.
    pub async fn set_buttons(
        pool: &sqlx::SqlitePool,
        message_id: i64,
        rows: Option<&[Vec<ButtonSpec>]>,
    ) -> Result<bool, sqlx::Error> {
        let encoded = match rows {
            Some(rows) if !rows.is_empty() => Some(
                serde_json::to_string(rows)
                    .map_err(|e| sqlx::Error::Protocol(format!("failed to encode buttons: {e}")))?,
            ),
            _ => None,
        };

        let result = sqlx::query("UPDATE messages SET buttons = ?, updated_at = ? WHERE id = ?")
            .bind(encoded)
            .bind(now_timestamp())
            .bind(message_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &sqlx::SqlitePool, message_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(message_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(pool)
            .await
    }
}
