//! Outbound delivery seam.
//!
//! The broadcast engine only knows [`MessageTransport`]. Production wiring uses
//! [`TelegramTransport`]; tests plug in scripted transports.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use teloxide::{ApiError, RequestError};
use thiserror::Error;
use url::Url;

use crate::config::TextFormat;
use crate::database::models::{ButtonSpec, MessageKind, MessageTemplate};
use crate::utils::validation::MAX_CAPTION_CHARS;

/// Why a single delivery did not go through. Every variant counts as one
/// failed target; the split only exists for logs and admin feedback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    #[error("bot was blocked by the user")]
    Blocked,
    #[error("bot is no longer a member of the chat")]
    Removed,
    #[error("chat not found")]
    InvalidTarget,
    #[error("chat was upgraded to a supergroup with a new id")]
    Migrated,
    #[error("bot token was rejected")]
    Unauthorized,
    #[error("rate limited by Telegram")]
    RateLimited,
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Other(String),
}

impl From<RequestError> for DeliveryFailure {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Api(api) => match api {
                ApiError::BotBlocked | ApiError::UserDeactivated => DeliveryFailure::Blocked,
                ApiError::BotKicked | ApiError::BotKickedFromSupergroup => DeliveryFailure::Removed,
                ApiError::ChatNotFound => DeliveryFailure::InvalidTarget,
                ApiError::NotFound => DeliveryFailure::Unauthorized,
                other => DeliveryFailure::Other(other.to_string()),
            },
            RequestError::MigrateToChatId(_) => DeliveryFailure::Migrated,
            RequestError::RetryAfter(_) => DeliveryFailure::RateLimited,
            RequestError::Network(e) => DeliveryFailure::Network(e.to_string()),
            other => DeliveryFailure::Other(other.to_string()),
        }
    }
}

/// Media carried alongside the text, referenced by Telegram file id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    None,
    Photo(String),
    Video(String),
    Document(String),
}

/// A template resolved into exactly what goes over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastContent {
    pub text: String,
    pub attachment: Attachment,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0} message has no media file attached")]
    MissingMedia(MessageKind),
    #[error("stored button layout is not valid JSON: {0}")]
    Buttons(#[from] serde_json::Error),
    #[error("button '{text}' has an invalid url '{url}'")]
    ButtonUrl { text: String, url: String },
    #[error("caption is {length} characters, the limit is {limit}")]
    CaptionTooLong { length: usize, limit: usize },
}

impl BroadcastContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: Attachment::None,
            keyboard: None,
        }
    }

    pub fn from_template(template: &MessageTemplate) -> Result<Self, ContentError> {
        let kind = template.message_kind();
        let file_id = template
            .media_file_id
            .clone()
            .filter(|id| !id.trim().is_empty());

        let attachment = match (kind, file_id) {
            (MessageKind::Text, _) => Attachment::None,
            (MessageKind::Photo, Some(id)) => Attachment::Photo(id),
            (MessageKind::Video, Some(id)) => Attachment::Video(id),
            (MessageKind::Document, Some(id)) => Attachment::Document(id),
            (kind, None) => return Err(ContentError::MissingMedia(kind)),
        };

        let length = template.content.chars().count();
        if kind.has_media() && length > MAX_CAPTION_CHARS {
            return Err(ContentError::CaptionTooLong {
                length,
                limit: MAX_CAPTION_CHARS,
            });
        }

        let rows = template.button_rows()?;
        let keyboard = if rows.is_empty() {
            None
        } else {
            Some(build_keyboard(&rows)?)
        };

        Ok(Self {
            text: template.content.clone(),
            attachment,
            keyboard,
        })
    }
}

fn build_keyboard(rows: &[Vec<ButtonSpec>]) -> Result<InlineKeyboardMarkup, ContentError> {
    let mut keyboard = Vec::with_capacity(rows.len());
    for row in rows {
        let mut buttons = Vec::with_capacity(row.len());
        for spec in row {
            let url = Url::parse(&spec.url).map_err(|_| ContentError::ButtonUrl {
                text: spec.text.clone(),
                url: spec.url.clone(),
            })?;
            buttons.push(InlineKeyboardButton::url(spec.text.clone(), url));
        }
        keyboard.push(buttons);
    }
    Ok(InlineKeyboardMarkup::new(keyboard))
}

/// Sends one piece of content to one chat.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, chat_id: i64, content: &BroadcastContent) -> Result<(), DeliveryFailure>;
}

/// [`MessageTransport`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    parse_mode: Option<ParseMode>,
}

impl TelegramTransport {
    pub fn new(bot: Bot, format: TextFormat) -> Self {
        let parse_mode = match format {
            TextFormat::Plain => None,
            TextFormat::Html => Some(ParseMode::Html),
            TextFormat::Markdown => Some(ParseMode::MarkdownV2),
        };
        Self { bot, parse_mode }
    }
}

#[async_trait]
impl MessageTransport for TelegramTransport {
    async fn send(&self, chat_id: i64, content: &BroadcastContent) -> Result<(), DeliveryFailure> {
        let chat = ChatId(chat_id);
        let caption = (!content.text.trim().is_empty()).then(|| content.text.clone());

        match &content.attachment {
            Attachment::None => {
                let mut req = self.bot.send_message(chat, content.text.clone());
                if let Some(mode) = self.parse_mode {
                    req = req.parse_mode(mode);
                }
                if let Some(keyboard) = &content.keyboard {
                    req = req.reply_markup(keyboard.clone());
                }
                req.await?;
            }
            Attachment::Photo(file_id) => {
                let mut req = self.bot.send_photo(chat, InputFile::file_id(file_id.clone()));
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                if let Some(mode) = self.parse_mode {
                    req = req.parse_mode(mode);
                }
                if let Some(keyboard) = &content.keyboard {
                    req = req.reply_markup(keyboard.clone());
                }
                req.await?;
            }
            Attachment::Video(file_id) => {
                let mut req = self.bot.send_video(chat, InputFile::file_id(file_id.clone()));
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                if let Some(mode) = self.parse_mode {
                    req = req.parse_mode(mode);
                }
                if let Some(keyboard) = &content.keyboard {
                    req = req.reply_markup(keyboard.clone());
                }
                req.await?;
            }
            Attachment::Document(file_id) => {
                let mut req = self.bot.send_document(chat, InputFile::file_id(file_id.clone()));
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                if let Some(mode) = self.parse_mode {
                    req = req.parse_mode(mode);
                }
                if let Some(keyboard) = &content.keyboard {
                    req = req.reply_markup(keyboard.clone());
                }
                req.await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(kind: &str, media: Option<&str>, buttons: Option<&str>) -> MessageTemplate {
        MessageTemplate {
            id: 1,
            title: "Promo".to_string(),
            content: "Hello".to_string(),
            kind: kind.to_string(),
            media_file_id: media.map(str::to_string),
            buttons: buttons.map(str::to_string),
            created_at: "2024-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_text_template_resolves_without_keyboard() {
        let content = BroadcastContent::from_template(&template("text", None, None))
            .expect("text template should resolve");
        assert_eq!(content, BroadcastContent::text("Hello"));
    }

    #[test]
    fn test_photo_template_requires_file_id() {
        let err = BroadcastContent::from_template(&template("photo", None, None))
            .expect_err("photo without file id must be rejected");
        assert!(matches!(err, ContentError::MissingMedia(MessageKind::Photo)));

        let content = BroadcastContent::from_template(&template("photo", Some("AgAD123"), None))
            .expect("photo with file id should resolve");
        assert_eq!(content.attachment, Attachment::Photo("AgAD123".to_string()));
    }

    #[test]
    fn test_long_caption_is_rejected_for_media_only() {
        let mut photo = template("photo", Some("AgAD123"), None);
        photo.content = "x".repeat(MAX_CAPTION_CHARS + 1);
        let err = BroadcastContent::from_template(&photo).expect_err("caption over the limit");
        assert!(matches!(
            err,
            ContentError::CaptionTooLong { length, limit: MAX_CAPTION_CHARS } if length == MAX_CAPTION_CHARS + 1
        ));

        let mut text = template("text", None, None);
        text.content = "x".repeat(MAX_CAPTION_CHARS + 1);
        assert!(BroadcastContent::from_template(&text).is_ok());
    }

    #[test]
    fn test_buttons_become_inline_keyboard() {
        let layout = r#"[[{"text":"Shop","url":"https://example.com/shop"}],[{"text":"Help","url":"https://example.com/help"}]]"#;
        let content = BroadcastContent::from_template(&template("text", None, Some(layout)))
            .expect("layout should resolve");
        let keyboard = content.keyboard.expect("keyboard should be present");
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "Shop");
    }

    #[test]
    fn test_bad_button_data_is_rejected() {
        let not_json = BroadcastContent::from_template(&template("text", None, Some("{oops")));
        assert!(matches!(not_json, Err(ContentError::Buttons(_))));

        let bad_url = r#"[[{"text":"Shop","url":"not a url"}]]"#;
        let result = BroadcastContent::from_template(&template("text", None, Some(bad_url)));
        assert!(matches!(result, Err(ContentError::ButtonUrl { .. })));
    }
}
