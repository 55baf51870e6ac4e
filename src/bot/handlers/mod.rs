pub mod general_message;
pub mod message;

use std::sync::Arc;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::dptree;
use teloxide::types::{Message, Update, User};
use teloxide::Bot;

use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::services::broadcast::BroadcastService;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Everything a handler needs, cloned into each endpoint.
#[derive(Clone)]
pub struct BotContext {
    pub db: Arc<DatabaseManager>,
    pub broadcaster: Arc<BroadcastService>,
    pub config: Arc<Config>,
}

impl BotContext {
    pub fn is_admin(&self, user: Option<&User>) -> bool {
        user.is_some_and(|u| self.config.is_admin(u.id.0 as i64))
    }
}

/// Who sent a message, as recorded in logs and the ledger.
pub fn sender_identity(user: Option<&User>) -> (String, i64) {
    match user {
        Some(u) => {
            let name = u
                .username
                .as_ref()
                .map(|name| format!("@{name}"))
                .unwrap_or_else(|| u.id.0.to_string());
            (name, u.id.0 as i64)
        }
        None => ("unknown".to_string(), 0),
    }
}

pub struct BotHandler {
    pub ctx: BotContext,
}

impl BotHandler {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        let ctx_command = self.ctx.clone();
        let ctx_general = self.ctx.clone();

        Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<crate::bot::commands::Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: crate::bot::commands::Command| {
                        let ctx = ctx_command.clone();
                        async move { message::command_handler(bot, msg, cmd, ctx).await }
                    }),
            )
            .branch(dptree::endpoint(move |bot: Bot, msg: Message| {
                let ctx = ctx_general.clone();
                async move { general_message::handle_general_message(bot, msg, ctx).await }
            }))
    }
}
