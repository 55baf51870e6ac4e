pub mod broadcast;
pub mod groups;
pub mod inbox;
pub mod messages;
pub mod stats;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Broadcast Bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Create a message: /newmessage Title | Content (reply to a photo, video or file to attach it)")]
    NewMessage { text: String },
    #[command(description = "Edit a message: /editmessage <id> Title | Content")]
    EditMessage { args: String },
    #[command(description = "Set link buttons: /setbuttons <id> Label=https://url; Label2=https://url (or 'clear')")]
    SetButtons { args: String },
    #[command(description = "Delete a message: /deletemessage <id>")]
    DeleteMessage { message_id: i64 },
    #[command(description = "List saved messages")]
    Messages,
    #[command(description = "Send a message to this chat only: /preview <id>")]
    Preview { message_id: i64 },
    #[command(description = "Register this chat, or /addgroup <chat_id> <name>")]
    AddGroup { args: String },
    #[command(description = "Remove a target: /removegroup <chat_id>")]
    RemoveGroup { chat_id: i64 },
    #[command(description = "List target groups")]
    Groups,
    #[command(description = "Send a message to every group: /broadcast <id>")]
    Broadcast { message_id: i64 },
    #[command(description = "Show recent broadcasts")]
    History,
    #[command(description = "Show broadcast statistics")]
    Stats,
    #[command(description = "Show recent messages from users")]
    Inbox,
    #[command(description = "Mark an inbox message as read: /read <id>")]
    Read { entry_id: i64 },
    #[command(description = "Mark every inbox message as read")]
    ReadAll,
}

impl Command {
    /// Commands anyone may run. Everything else requires an admin.
    pub fn is_public(&self) -> bool {
        matches!(self, Command::Help | Command::Start)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Start => "start",
            Command::NewMessage { .. } => "newmessage",
            Command::EditMessage { .. } => "editmessage",
            Command::SetButtons { .. } => "setbuttons",
            Command::DeleteMessage { .. } => "deletemessage",
            Command::Messages => "messages",
            Command::Preview { .. } => "preview",
            Command::AddGroup { .. } => "addgroup",
            Command::RemoveGroup { .. } => "removegroup",
            Command::Groups => "groups",
            Command::Broadcast { .. } => "broadcast",
            Command::History => "history",
            Command::Stats => "stats",
            Command::Inbox => "inbox",
            Command::Read { .. } => "read",
            Command::ReadAll => "readall",
        }
    }
}

/// Telegram caps a message at 4096 characters; long listings are cut here
/// and end with a count of what was left out.
pub(crate) fn truncate_listing(lines: &[String], header: &str, limit: usize) -> String {
    let mut text = String::from(header);
    for (shown, line) in lines.iter().enumerate() {
        if text.chars().count() + line.chars().count() + 1 > limit {
            text.push_str(&format!("\n… and {} more", lines.len() - shown));
            break;
        }
        text.push('\n');
        text.push_str(line);
    }
    text
}
