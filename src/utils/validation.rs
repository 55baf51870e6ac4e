use anyhow::{anyhow, Result};
use url::Url;

use crate::database::models::{ButtonSpec, MessageKind};

/// Telegram rejects message text longer than this.
pub const MAX_CONTENT_CHARS: usize = 4096;
/// Telegram rejects media captions longer than this.
pub const MAX_CAPTION_CHARS: usize = 1024;
pub const MAX_TITLE_CHARS: usize = 100;
const MAX_BUTTON_ROWS: usize = 10;
const MAX_BUTTON_LABEL_CHARS: usize = 64;

pub fn validate_message_title(title: &str) -> Result<()> {
    let title = title.trim();

    if title.is_empty() {
        return Err(anyhow!("Message title cannot be empty"));
    }

    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(anyhow!("Message title cannot be longer than {} characters", MAX_TITLE_CHARS));
    }

    if title.contains('\n') || title.contains('\r') {
        return Err(anyhow!("Message title cannot contain line breaks"));
    }

    Ok(())
}

pub fn validate_message_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(anyhow!("Message content cannot be empty"));
    }

    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(anyhow!("Message content cannot be longer than {} characters", MAX_CONTENT_CHARS));
    }

    Ok(())
}

/// Media messages carry their content as a caption, which has a lower limit.
pub fn validate_content_for_kind(content: &str, kind: MessageKind) -> Result<()> {
    if kind.has_media() && content.chars().count() > MAX_CAPTION_CHARS {
        return Err(anyhow!(
            "A {} message caption cannot be longer than {} characters",
            kind,
            MAX_CAPTION_CHARS
        ));
    }

    Ok(())
}

/// Splits `Title | Content` on the first pipe and validates both halves.
pub fn parse_title_and_content(input: &str) -> Result<(String, String)> {
    let (title, content) = input
        .split_once('|')
        .ok_or_else(|| anyhow!("Expected 'Title | Content'"))?;

    let title = title.trim().to_string();
    let content = content.trim().to_string();

    validate_message_title(&title)?;
    validate_message_content(&content)?;

    Ok((title, content))
}

/// Splits a leading numeric id from the rest of the arguments.
pub fn parse_id_and_rest(input: &str) -> Result<(i64, String)> {
    let input = input.trim();
    let (id, rest) = match input.split_once(char::is_whitespace) {
        Some((id, rest)) => (id, rest.trim()),
        None => (input, ""),
    };

    if id.is_empty() {
        return Err(anyhow!("An id is required"));
    }

    let id = id
        .parse::<i64>()
        .map_err(|_| anyhow!("'{}' is not a valid id", id))?;

    Ok((id, rest.to_string()))
}

pub fn validate_telegram_chat_id(chat_id: i64) -> Result<()> {
    if chat_id == 0 {
        return Err(anyhow!("Chat ID cannot be zero"));
    }

    // Private chats are positive; groups are small negatives; supergroups and
    // channels sit around -100xxxxxxxxxx.
    if chat_id > 9_999_999_999 {
        return Err(anyhow!("Invalid user chat ID range"));
    }

    if chat_id < -2_000_000_000_000 {
        return Err(anyhow!("Chat ID out of valid range"));
    }

    Ok(())
}

/// Parses `<chat_id> <name>` used to register a chat other than the current one.
pub fn parse_target_registration(input: &str) -> Result<(i64, String)> {
    let (chat_id, name) = parse_id_and_rest(input)?;
    validate_telegram_chat_id(chat_id)?;

    let name = if name.is_empty() {
        chat_id.to_string()
    } else {
        name
    };

    Ok((chat_id, name))
}

/// Parses `Label=https://url; Other=https://url` into one button per row.
///
/// Entries are separated by `;` or newlines. Each URL must be absolute http(s).
pub fn parse_button_layout(input: &str) -> Result<Vec<Vec<ButtonSpec>>> {
    let entries: Vec<&str> = input
        .split([';', '\n'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.is_empty() {
        return Err(anyhow!("At least one button is required"));
    }

    if entries.len() > MAX_BUTTON_ROWS {
        return Err(anyhow!("Cannot have more than {} buttons", MAX_BUTTON_ROWS));
    }

    entries
        .into_iter()
        .map(|entry| {
            let (label, url) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("Button '{}' must look like Label=https://url", entry))?;
            let label = label.trim();
            let url = url.trim();

            if label.is_empty() {
                return Err(anyhow!("Button label cannot be empty"));
            }
            if label.chars().count() > MAX_BUTTON_LABEL_CHARS {
                return Err(anyhow!("Button label '{}' is too long", label));
            }

            let parsed = Url::parse(url).map_err(|_| anyhow!("'{}' is not a valid URL", url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow!("Button URL '{}' must start with http:// or https://", url));
            }

            Ok(vec![ButtonSpec {
                text: label.to_string(),
                url: url.to_string(),
            }])
        })
        .collect()
}
