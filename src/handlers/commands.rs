use teloxide::prelude::*;

use super::HandlerResult;
use crate::bot_state::BotState;
use crate::flows::{psychologist, student};
use crate::gateway::{Gateway, Outgoing, TelegramGateway};
use crate::Command;

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: BotState,
) -> HandlerResult {
    let gw = TelegramGateway::new(bot);
    let chat_id = msg.chat.id.0;
    let username = msg.from.as_ref().and_then(|u| u.username.as_deref());

    match cmd {
        Command::Start => {
            if state.is_operator(chat_id) {
                psychologist::handle_start(&state, &gw).await?;
            } else {
                student::handle_start(&state, &gw, chat_id, username).await?;
            }
        }
        Command::Menu => {
            if state.is_operator(chat_id) {
                psychologist::handle_start(&state, &gw).await?;
            } else {
                student::handle_menu(&state, &gw, chat_id).await?;
            }
        }
        Command::Reply(message_id) => {
            if state.is_operator(chat_id) {
                psychologist::handle_reply_command(&state, &gw, message_id).await?;
            } else {
                gw.send(
                    chat_id,
                    Outgoing::text("This command is only available to the psychologist."),
                )
                .await?;
            }
        }
        Command::Appointments => {
            if state.is_operator(chat_id) {
                psychologist::handle_appointments_command(&state, &gw).await?;
            } else {
                gw.send(
                    chat_id,
                    Outgoing::text("This command is only available to the psychologist."),
                )
                .await?;
            }
        }
    }
    Ok(())
}
