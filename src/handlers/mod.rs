//! Thin teloxide adapters. Everything here only extracts what the update
//! carries (chat id, text, reply reference, callback data) and hands off to
//! the flows; no conversation logic lives at this layer.

pub mod callbacks;
pub mod commands;
pub mod messages;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::error::BotError;
use crate::Command;

pub type HandlerResult = Result<(), BotError>;

pub fn schema() -> UpdateHandler<BotError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(commands::handle_command),
        )
        .branch(Update::filter_message().endpoint(messages::handle_message))
        .branch(Update::filter_callback_query().endpoint(callbacks::handle_callback))
}
