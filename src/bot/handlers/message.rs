use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot::commands::{self, Command};
use crate::bot::handlers::{sender_identity, BotContext, HandlerResult};
use crate::utils::logging::{log_command_start, log_unauthorized};

pub async fn command_handler(bot: Bot, msg: Message, cmd: Command, ctx: BotContext) -> HandlerResult {
    let (user, user_id) = sender_identity(msg.from());
    log_command_start(cmd.name(), &user, user_id, msg.chat.id.0, None);

    if !cmd.is_public() && !ctx.is_admin(msg.from()) {
        log_unauthorized(cmd.name(), &user, user_id);
        bot.send_message(msg.chat.id, "⛔ This command is only available to administrators.")
            .await?;
        return Ok(());
    }

    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
        Command::Start => {
            let text = if ctx.is_admin(msg.from()) {
                "📣 Broadcast Bot ready.\n\nCreate a message with /newmessage, register groups with /addgroup, then send with /broadcast.\nUse /help to see all commands."
            } else {
                "👋 Hi! Send a message here and the team will read it."
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Command::NewMessage { text } => {
            commands::messages::handle_new_message(bot, msg, text, &ctx).await?;
        }
        Command::EditMessage { args } => {
            commands::messages::handle_edit_message(bot, msg, args, &ctx).await?;
        }
        Command::SetButtons { args } => {
            commands::messages::handle_set_buttons(bot, msg, args, &ctx).await?;
        }
        Command::DeleteMessage { message_id } => {
            commands::messages::handle_delete_message(bot, msg, message_id, &ctx).await?;
        }
        Command::Messages => {
            commands::messages::handle_list_messages(bot, msg, &ctx).await?;
        }
        Command::Preview { message_id } => {
            commands::messages::handle_preview(bot, msg, message_id, &ctx).await?;
        }
        Command::AddGroup { args } => {
            commands::groups::handle_add_group(bot, msg, args, &ctx).await?;
        }
        Command::RemoveGroup { chat_id } => {
            commands::groups::handle_remove_group(bot, msg, chat_id, &ctx).await?;
        }
        Command::Groups => {
            commands::groups::handle_list_groups(bot, msg, &ctx).await?;
        }
        Command::Broadcast { message_id } => {
            commands::broadcast::handle_broadcast(bot, msg, message_id, &ctx).await?;
        }
        Command::History => {
            commands::broadcast::handle_history(bot, msg, &ctx).await?;
        }
        Command::Stats => {
            commands::stats::handle_stats(bot, msg, &ctx).await?;
        }
        Command::Inbox => {
            commands::inbox::handle_inbox(bot, msg, &ctx).await?;
        }
        Command::Read { entry_id } => {
            commands::inbox::handle_read(bot, msg, entry_id, &ctx).await?;
        }
        Command::ReadAll => {
            commands::inbox::handle_read_all(bot, msg, &ctx).await?;
        }
    }
    Ok(())
}
