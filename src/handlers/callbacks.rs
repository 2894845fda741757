use teloxide::prelude::*;

use super::HandlerResult;
use crate::bot_state::BotState;
use crate::events::CallbackAction;
use crate::flows::psychologist;
use crate::gateway::TelegramGateway;

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    // Stop the client's loading spinner whatever happens next.
    if let Err(err) = bot.answer_callback_query(q.id.clone()).await {
        log::warn!("answering callback query failed: {err}");
    }

    // All inline keyboards belong to the psychologist's dashboard; a press
    // from anyone else is ignored.
    if !state.is_operator(q.from.id.0 as i64) {
        return Ok(());
    }

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(action) = CallbackAction::parse(data) else {
        log::warn!("unrecognized callback data: {data:?}");
        return Ok(());
    };
    let Some(message) = q.message else {
        // Too old for Telegram to hand us the message; nothing to edit.
        return Ok(());
    };

    let gw = TelegramGateway::new(bot);
    psychologist::handle_action(&state, &gw, message.id().0 as i64, action).await
}
