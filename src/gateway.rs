//! Outbound messaging gateway.
//!
//! The flows talk to Telegram through this narrow trait so tests can swap in
//! a recording double. The production implementation wraps `teloxide::Bot`
//! and bounds every remote call with a timeout; a timed-out call is reported
//! as a delivery failure, never retried.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::requests::Request;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, MessageId,
    ParseMode, ReplyMarkup, ReplyParameters,
};
use thiserror::Error;
use tokio::time::timeout;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("telegram api error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("delivery timed out")]
    Timeout,
    #[error("delivery failed: {0}")]
    Rejected(String),
}

/// Keyboard attached to an outgoing message: either a persistent reply
/// keyboard (rows of labels) or an inline keyboard (label, callback data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Buttons(Vec<Vec<String>>),
    Inline(Vec<Vec<(String, String)>>),
}

#[derive(Debug, Clone)]
pub struct Outgoing {
    pub text: String,
    pub markup: Option<Markup>,
    /// External message id to thread this delivery onto, if any.
    pub reply_to: Option<i64>,
}

impl Outgoing {
    pub fn text(text: impl Into<String>) -> Self {
        Outgoing {
            text: text.into(),
            markup: None,
            reply_to: None,
        }
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = Some(markup);
        self
    }

    pub fn in_reply_to(mut self, external_id: i64) -> Self {
        self.reply_to = Some(external_id);
        self
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Deliver a message, returning the external id Telegram assigned to it.
    async fn send(&self, chat_id: i64, outgoing: Outgoing) -> Result<i64, GatewayError>;

    /// Replace the text (and inline keyboard) of an already-sent message.
    async fn edit(&self, chat_id: i64, message_id: i64, outgoing: Outgoing)
        -> Result<(), GatewayError>;
}

pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        TelegramGateway { bot }
    }
}

fn to_reply_markup(markup: Markup) -> ReplyMarkup {
    match markup {
        Markup::Buttons(rows) => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(
                rows.into_iter()
                    .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
            )
            .resize_keyboard(),
        ),
        Markup::Inline(rows) => ReplyMarkup::InlineKeyboard(to_inline_markup(rows)),
    }
}

fn to_inline_markup(rows: Vec<Vec<(String, String)>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
        row.into_iter()
            .map(|(label, data)| InlineKeyboardButton::callback(label, data))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl Gateway for TelegramGateway {
    async fn send(&self, chat_id: i64, outgoing: Outgoing) -> Result<i64, GatewayError> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), outgoing.text)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = outgoing.markup {
            request = request.reply_markup(to_reply_markup(markup));
        }
        if let Some(external_id) = outgoing.reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(external_id as i32)));
        }

        let sent = timeout(SEND_TIMEOUT, request.send())
            .await
            .map_err(|_| GatewayError::Timeout)??;
        Ok(sent.id.0 as i64)
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        outgoing: Outgoing,
    ) -> Result<(), GatewayError> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), outgoing.text)
            .parse_mode(ParseMode::Html);
        match outgoing.markup {
            Some(Markup::Inline(rows)) => {
                request = request.reply_markup(to_inline_markup(rows));
            }
            Some(Markup::Buttons(_)) => {
                // Reply keyboards cannot be attached to an edit.
                log::debug!("dropping reply keyboard on edit for chat {chat_id}");
            }
            None => {}
        }

        timeout(SEND_TIMEOUT, request.send())
            .await
            .map_err(|_| GatewayError::Timeout)??;
        Ok(())
    }
}
