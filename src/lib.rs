use teloxide::utils::command::BotCommands;

pub mod bot_state;
pub mod config;
pub mod error;
pub mod events;
pub mod flows;
pub mod gateway;
pub mod handlers;
pub mod keyboards;
pub mod models;
pub mod notifications;
pub mod relay;
pub mod sessions;
pub mod store;
pub mod validators;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "show the main menu")]
    Menu,
    #[command(description = "reply to a message by its number (psychologist only)")]
    Reply(i64),
    #[command(description = "manage appointment requests (psychologist only)")]
    Appointments,
}
