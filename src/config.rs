use anyhow::{anyhow, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/broadcast.db";

/// How broadcast text is interpreted by Telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
    Markdown,
}

impl FromStr for TextFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "plain" | "none" => Ok(TextFormat::Plain),
            "html" => Ok(TextFormat::Html),
            "markdown" | "markdownv2" => Ok(TextFormat::Markdown),
            other => Err(anyhow!("Invalid BROADCAST_PARSE_MODE '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    /// Telegram user ids allowed to run admin commands.
    pub admin_user_ids: Vec<i64>,
    pub broadcast_interval: Duration,
    /// Pause between two consecutive deliveries of the same run.
    pub send_delay: Duration,
    /// Message sent on every scheduled tick. No scheduler runs without it.
    pub scheduled_message_id: Option<i64>,
    pub text_format: TextFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = database_url_from_env();

        let http_port = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let admin_user_ids = parse_admin_ids(&env::var("ADMIN_USER_IDS").unwrap_or_default())?;

        let interval_hours: u64 = env::var("BROADCAST_INTERVAL_HOURS")
            .unwrap_or_else(|_| "2".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid BROADCAST_INTERVAL_HOURS"))?;
        if interval_hours == 0 {
            return Err(anyhow!("BROADCAST_INTERVAL_HOURS must be at least 1"));
        }

        let delay_ms: u64 = env::var("BROADCAST_DELAY_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid BROADCAST_DELAY_MS"))?;

        let scheduled_message_id = match env::var("SCHEDULED_MESSAGE_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| anyhow!("Invalid SCHEDULED_MESSAGE_ID"))?,
            ),
            _ => None,
        };

        let text_format = env::var("BROADCAST_PARSE_MODE")
            .unwrap_or_default()
            .parse()?;

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            admin_user_ids,
            broadcast_interval: Duration::from_secs(interval_hours * 60 * 60),
            send_delay: Duration::from_millis(delay_ms),
            scheduled_message_id,
            text_format,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}

/// `DATABASE_URL`, or the default SQLite file when unset or blank. Used on
/// its own by the migration tool, which needs no bot token.
pub fn database_url_from_env() -> String {
    env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse()
                .map_err(|_| anyhow!("Invalid ADMIN_USER_IDS entry '{}'", id))
        })
        .collect()
}
