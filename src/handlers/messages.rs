use teloxide::prelude::*;

use super::HandlerResult;
use crate::bot_state::BotState;
use crate::flows::{psychologist, student};
use crate::gateway::TelegramGateway;

pub async fn handle_message(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let Some(text) = msg.text() else {
        // Stickers, photos and the like are not part of any flow.
        return Ok(());
    };
    if text.starts_with('/') {
        // Unrecognized commands fall through the command filter; ignore them
        // rather than feeding them into a form field.
        return Ok(());
    }

    let gw = TelegramGateway::new(bot);
    let chat_id = msg.chat.id.0;

    if state.is_operator(chat_id) {
        let reply_ref = msg.reply_to_message().map(|quoted| quoted.id.0 as i64);
        psychologist::handle_text(&state, &gw, text, reply_ref).await
    } else {
        let username = msg.from.as_ref().and_then(|u| u.username.as_deref());
        student::handle_text(&state, &gw, chat_id, username, text, msg.id.0 as i64).await
    }
}
