//! Message relay and correlation engine.
//!
//! Forward path: persist the student's message, deliver a rendered copy to
//! the psychologist, and record the Telegram id of that copy so replies can
//! be correlated later. Reverse path: map an operator reply (by reply
//! reference or by explicit selection) back onto the stored message and
//! deliver it to the student, threaded onto their original message.
//!
//! Persistence always happens before delivery; a failed delivery never rolls
//! anything back, it is only reported.

use teloxide::utils::html;

use crate::error::BotError;
use crate::gateway::{Gateway, Outgoing};
use crate::models::StoredMessage;
use crate::sessions::Draft;
use crate::store::Store;

#[derive(Debug)]
pub enum ForwardOutcome {
    Delivered(StoredMessage),
    /// The message is durably stored but the psychologist was not reached.
    SavedNotDelivered(StoredMessage),
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    Delivered,
    /// Reply fields are written; the student was not reached.
    SavedNotDelivered,
    /// One-reply invariant: the message already carries a reply.
    AlreadyReplied,
    NotFound,
}

/// Render the operator-side copy: anonymous messages go through verbatim,
/// identified ones get a quoted header with the sender's details.
fn render_notification(draft: &Draft, text: &str) -> String {
    if draft.is_anonymous.unwrap_or(false) {
        return html::escape(text);
    }
    let name = draft.full_name.as_deref().unwrap_or("N/A");
    match draft.student_id.as_deref() {
        Some(student_id) => format!(
            "<blockquote>From: {}\nStudent ID: {}</blockquote>\n\n{}",
            html::escape(name),
            html::escape(student_id),
            html::escape(text)
        ),
        None => format!(
            "<blockquote>From: {}</blockquote>\n\n{}",
            html::escape(name),
            html::escape(text)
        ),
    }
}

pub async fn forward_to_operator(
    store: &dyn Store,
    gateway: &dyn Gateway,
    operator_id: i64,
    sender_telegram_id: i64,
    draft: &Draft,
    text: &str,
    origin_message_id: i64,
) -> Result<ForwardOutcome, BotError> {
    let is_anonymous = draft.is_anonymous.unwrap_or(false);
    let message = store
        .save_message(sender_telegram_id, text, is_anonymous, origin_message_id)
        .await?;

    let notification = render_notification(draft, text);
    match gateway.send(operator_id, Outgoing::text(notification)).await {
        Ok(forwarded_id) => {
            store
                .update_external_message_id(message.id, forwarded_id)
                .await?;
            Ok(ForwardOutcome::Delivered(message))
        }
        Err(err) => {
            log::error!("forwarding message {} failed: {err}", message.id);
            Ok(ForwardOutcome::SavedNotDelivered(message))
        }
    }
}

/// Reverse path keyed by the operator-side Telegram id. `Ok(None)` means the
/// reference does not correlate with any stored message and the event should
/// be treated as ordinary operator input.
pub async fn reply_by_reference(
    store: &dyn Store,
    gateway: &dyn Gateway,
    forwarded_message_id: i64,
    reply_text: &str,
) -> Result<Option<ReplyOutcome>, BotError> {
    match store
        .get_message_by_external_id(forwarded_message_id)
        .await?
    {
        Some(message) => Ok(Some(apply_reply(store, gateway, message.id, reply_text).await?)),
        None => Ok(None),
    }
}

/// Shared reply routine for both reverse paths, so the already-replied guard
/// applies uniformly no matter how the operator got here.
pub async fn apply_reply(
    store: &dyn Store,
    gateway: &dyn Gateway,
    message_id: i64,
    reply_text: &str,
) -> Result<ReplyOutcome, BotError> {
    let Some(message) = store.get_message_by_id(message_id).await? else {
        return Ok(ReplyOutcome::NotFound);
    };
    if message.replied {
        return Ok(ReplyOutcome::AlreadyReplied);
    }

    // The guarded write settles any race between concurrent reply attempts.
    let Some(message) = store.reply_to_message(message_id, reply_text).await? else {
        return Ok(ReplyOutcome::AlreadyReplied);
    };

    let Some(user) = store.get_user_by_id(message.user_id).await? else {
        log::error!("message {} has no owning user", message.id);
        return Ok(ReplyOutcome::SavedNotDelivered);
    };

    let body = format!(
        "💬 <b>Reply from the psychologist</b>\n\n<i>{}</i>\n\n\
         If you need further assistance, feel free to send another message.",
        html::escape(reply_text)
    );
    let outgoing = Outgoing::text(body).in_reply_to(message.origin_message_id);
    match gateway.send(user.telegram_id, outgoing).await {
        Ok(_) => Ok(ReplyOutcome::Delivered),
        Err(err) => {
            log::error!("delivering reply for message {} failed: {err}", message.id);
            Ok(ReplyOutcome::SavedNotDelivered)
        }
    }
}
