//! Psychologist-side flow: inbox browsing, replying, appointment management
//! and a small statistics view. List and detail views are rendered by
//! editing the message the keyboard lives on, so the dashboard never piles
//! up in the chat.

use teloxide::utils::html;

use crate::bot_state::BotState;
use crate::error::BotError;
use crate::events::CallbackAction;
use crate::gateway::{Gateway, Outgoing};
use crate::keyboards::{
    self, BTN_MANAGE_APPOINTMENTS, BTN_STATISTICS, BTN_VIEW_MESSAGES,
};
use crate::models::{AppointmentStatus, StoredMessage};
use crate::notifications;
use crate::relay::{self, ReplyOutcome};
use crate::sessions::OperatorState;

pub async fn handle_start(app: &BotState, gw: &dyn Gateway) -> Result<(), BotError> {
    let unreplied = app.store.get_unreplied_messages().await?.len();
    let pending = app.store.get_pending_appointments().await?.len();
    gw.send(
        app.operator_id(),
        Outgoing::text(format!(
            "👨‍⚕️ <b>Psychologist Dashboard</b>\n\n\
             📬 Unreplied messages: {unreplied}\n\
             📅 Pending appointments: {pending}\n\n\
             What would you like to do?"
        ))
        .with_markup(keyboards::operator_menu()),
    )
    .await?;
    app.set_operator_state(OperatorState::Idle).await;
    Ok(())
}

/// Free text from the operator. Priority order matters: an armed reply state
/// consumes the text first, then a reply-reference is tried, and only then
/// does the text get matched against menu labels.
pub async fn handle_text(
    app: &BotState,
    gw: &dyn Gateway,
    text: &str,
    reply_ref: Option<i64>,
) -> Result<(), BotError> {
    if let OperatorState::ReplyingTo(message_id) = app.operator_state().await {
        let outcome = relay::apply_reply(app.store.as_ref(), gw, message_id, text).await?;
        app.set_operator_state(OperatorState::Idle).await;
        return report_reply_outcome(app, gw, outcome).await;
    }

    if let Some(forwarded_id) = reply_ref {
        if let Some(outcome) =
            relay::reply_by_reference(app.store.as_ref(), gw, forwarded_id, text).await?
        {
            return report_reply_outcome(app, gw, outcome).await;
        }
        // The quoted message is not one of ours; fall through to the menu.
    }

    match text {
        BTN_VIEW_MESSAGES => {
            let outgoing = messages_list(app).await?;
            gw.send(app.operator_id(), outgoing).await?;
            app.set_operator_state(OperatorState::ViewingMessages).await;
        }
        BTN_MANAGE_APPOINTMENTS => {
            let outgoing = appointments_list(app, 0).await?;
            gw.send(app.operator_id(), outgoing).await?;
            app.set_operator_state(OperatorState::ManagingAppointments)
                .await;
        }
        BTN_STATISTICS => {
            let outgoing = statistics(app).await?;
            gw.send(app.operator_id(), outgoing).await?;
        }
        _ => {
            gw.send(
                app.operator_id(),
                Outgoing::text("Please use the menu buttons below.")
                    .with_markup(keyboards::operator_menu()),
            )
            .await?;
        }
    }
    Ok(())
}

/// `/reply <message_id>`: jump straight into the armed reply state.
pub async fn handle_reply_command(
    app: &BotState,
    gw: &dyn Gateway,
    message_id: i64,
) -> Result<(), BotError> {
    match app.store.get_message_by_id(message_id).await? {
        None => {
            gw.send(app.operator_id(), Outgoing::text("❌ Message not found."))
                .await?;
        }
        Some(msg) if msg.replied => {
            gw.send(
                app.operator_id(),
                Outgoing::text("⚠️ This message has already been replied to."),
            )
            .await?;
        }
        Some(msg) => {
            arm_reply(app, gw, &msg).await?;
        }
    }
    Ok(())
}

/// `/appointments`: same view the menu button opens.
pub async fn handle_appointments_command(
    app: &BotState,
    gw: &dyn Gateway,
) -> Result<(), BotError> {
    let outgoing = appointments_list(app, 0).await?;
    gw.send(app.operator_id(), outgoing).await?;
    app.set_operator_state(OperatorState::ManagingAppointments)
        .await;
    Ok(())
}

/// A decoded inline-keyboard action. `message_id` is the Telegram id of the
/// message carrying the keyboard, used for in-place edits.
pub async fn handle_action(
    app: &BotState,
    gw: &dyn Gateway,
    message_id: i64,
    action: CallbackAction,
) -> Result<(), BotError> {
    let chat_id = app.operator_id();
    match action {
        CallbackAction::Noop => {}

        CallbackAction::ShowMessage(id) => {
            match app.store.get_message_by_id(id).await? {
                None => {
                    gw.edit(chat_id, message_id, Outgoing::text("❌ Message not found."))
                        .await?;
                }
                Some(msg) => {
                    let detail = message_detail(app, &msg).await?;
                    gw.edit(
                        chat_id,
                        message_id,
                        Outgoing::text(detail).with_markup(keyboards::message_actions(msg.id)),
                    )
                    .await?;
                }
            }
        }

        CallbackAction::StartReply(id) => match app.store.get_message_by_id(id).await? {
            None => {
                gw.send(chat_id, Outgoing::text("❌ Message not found."))
                    .await?;
            }
            Some(msg) if msg.replied => {
                gw.send(
                    chat_id,
                    Outgoing::text("⚠️ This message has already been replied to."),
                )
                .await?;
            }
            Some(msg) => {
                arm_reply(app, gw, &msg).await?;
            }
        },

        CallbackAction::MessagesPage(page) => {
            let outgoing = messages_list_page(app, page).await?;
            gw.edit(chat_id, message_id, outgoing).await?;
        }
        CallbackAction::BackToMessages => {
            let outgoing = messages_list(app).await?;
            gw.edit(chat_id, message_id, outgoing).await?;
        }

        CallbackAction::ShowAppointment(id) => {
            match app.store.get_appointment_by_id(id).await? {
                None => {
                    gw.edit(
                        chat_id,
                        message_id,
                        Outgoing::text("❌ Appointment not found."),
                    )
                    .await?;
                }
                Some(apt) => {
                    let detail = format!(
                        "📅 <b>Appointment #{}</b>\n\n\
                         👤 Name: {}\n\
                         🆔 Student ID: {}\n\
                         📆 Date: {}\n\
                         🕐 Time: {}\n\
                         📝 Reason: {}\n\
                         📊 Status: {}\n\
                         🗓 Requested: {}",
                        apt.id,
                        html::escape(&apt.full_name),
                        html::escape(&apt.student_id),
                        html::escape(&apt.preferred_date),
                        html::escape(&apt.preferred_time),
                        html::escape(&apt.reason),
                        apt.status.label(),
                        apt.created_at.format("%Y-%m-%d %H:%M"),
                    );
                    gw.edit(
                        chat_id,
                        message_id,
                        Outgoing::text(detail).with_markup(keyboards::appointment_actions(apt.id)),
                    )
                    .await?;
                }
            }
        }

        CallbackAction::ConfirmAppointment(id) => {
            settle_appointment(app, gw, message_id, id, AppointmentStatus::Confirmed).await?;
        }
        CallbackAction::CancelAppointment(id) => {
            settle_appointment(app, gw, message_id, id, AppointmentStatus::Cancelled).await?;
        }
        CallbackAction::CompleteAppointment(id) => {
            settle_appointment(app, gw, message_id, id, AppointmentStatus::Completed).await?;
        }

        CallbackAction::AppointmentsPage(page) => {
            let outgoing = appointments_list(app, page).await?;
            gw.edit(chat_id, message_id, outgoing).await?;
        }
        CallbackAction::BackToAppointments => {
            let outgoing = appointments_list(app, 0).await?;
            gw.edit(chat_id, message_id, outgoing).await?;
        }
    }
    Ok(())
}

async fn arm_reply(app: &BotState, gw: &dyn Gateway, msg: &StoredMessage) -> Result<(), BotError> {
    gw.send(
        app.operator_id(),
        Outgoing::text(format!(
            "✍️ <b>Reply to Message #{}</b>\n\n\
             Type your reply below. It will be sent to the student.",
            msg.id
        )),
    )
    .await?;
    app.set_operator_state(OperatorState::ReplyingTo(msg.id))
        .await;
    Ok(())
}

async fn report_reply_outcome(
    app: &BotState,
    gw: &dyn Gateway,
    outcome: ReplyOutcome,
) -> Result<(), BotError> {
    let text = match outcome {
        ReplyOutcome::Delivered => "✅ Reply sent successfully!",
        ReplyOutcome::SavedNotDelivered => {
            "⚠️ The reply was saved but could not be delivered to the student."
        }
        ReplyOutcome::AlreadyReplied => "⚠️ This message has already been replied to.",
        ReplyOutcome::NotFound => "❌ Message not found.",
    };
    gw.send(
        app.operator_id(),
        Outgoing::text(text).with_markup(keyboards::operator_menu()),
    )
    .await?;
    Ok(())
}

async fn settle_appointment(
    app: &BotState,
    gw: &dyn Gateway,
    message_id: i64,
    appointment_id: i64,
    status: AppointmentStatus,
) -> Result<(), BotError> {
    match app
        .store
        .update_appointment_status(appointment_id, status, None)
        .await?
    {
        None => {
            // Guard tripped: already settled, or never existed.
            gw.send(
                app.operator_id(),
                Outgoing::text(
                    "⚠️ This appointment was already processed or does not exist.",
                ),
            )
            .await?;
        }
        Some(appointment) => {
            notifications::notify_status_change(app.store.as_ref(), gw, &appointment).await;
            gw.send(
                app.operator_id(),
                Outgoing::text(format!(
                    "Appointment #{} is now {}.",
                    appointment.id,
                    appointment.status.label()
                )),
            )
            .await?;
        }
    }
    let outgoing = appointments_list(app, 0).await?;
    gw.edit(app.operator_id(), message_id, outgoing).await?;
    Ok(())
}

async fn message_detail(app: &BotState, msg: &StoredMessage) -> Result<String, BotError> {
    let sender = if msg.is_anonymous {
        "🎭 Anonymous".to_string()
    } else {
        match app.store.get_user_by_id(msg.user_id).await? {
            Some(user) => format!(
                "👤 {}\n🆔 Student ID: {}\n📱 Username: @{}",
                html::escape(user.full_name.as_deref().unwrap_or("N/A")),
                html::escape(user.student_id.as_deref().unwrap_or("N/A")),
                html::escape(user.username.as_deref().unwrap_or("N/A")),
            ),
            None => "👤 Unknown".to_string(),
        }
    };
    Ok(format!(
        "📨 <b>Message #{}</b>\n\n\
         {}\n\
         🗓 Received: {}\n\n\
         💬 Message:\n{}",
        msg.id,
        sender,
        msg.created_at.format("%Y-%m-%d %H:%M"),
        html::escape(&msg.message_text),
    ))
}

async fn messages_list(app: &BotState) -> Result<Outgoing, BotError> {
    messages_list_page(app, 0).await
}

async fn messages_list_page(app: &BotState, page: usize) -> Result<Outgoing, BotError> {
    let messages = app.store.get_unreplied_messages().await?;
    if messages.is_empty() {
        return Ok(Outgoing::text("📭 No unreplied messages at the moment.")
            .with_markup(keyboards::operator_menu()));
    }
    Ok(Outgoing::text(format!(
        "📬 <b>Unreplied Messages ({})</b>\n\nSelect a message to view and reply:",
        messages.len()
    ))
    .with_markup(keyboards::messages_keyboard(&messages, page)))
}

async fn appointments_list(app: &BotState, page: usize) -> Result<Outgoing, BotError> {
    let appointments = app.store.get_all_appointments().await?;
    if appointments.is_empty() {
        return Ok(Outgoing::text("📭 No appointments yet.")
            .with_markup(keyboards::operator_menu()));
    }
    let pending = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Pending)
        .count();
    Ok(Outgoing::text(format!(
        "📅 <b>Appointments ({} total, {} pending)</b>\n\nSelect one to manage:",
        appointments.len(),
        pending
    ))
    .with_markup(keyboards::appointments_keyboard(&appointments, page)))
}

async fn statistics(app: &BotState) -> Result<Outgoing, BotError> {
    let unreplied = app.store.get_unreplied_messages().await?.len();
    let appointments = app.store.get_all_appointments().await?;
    let count = |status: AppointmentStatus| {
        appointments.iter().filter(|a| a.status == status).count()
    };
    Ok(Outgoing::text(format!(
        "📊 <b>Statistics</b>\n\n\
         📬 <b>Messages</b>\n\
         • Unreplied: {unreplied}\n\n\
         📅 <b>Appointments</b>\n\
         • Total: {}\n\
         • 🕐 Pending: {}\n\
         • ✅ Confirmed: {}\n\
         • ✔️ Completed: {}\n\
         • ❌ Cancelled: {}",
        appointments.len(),
        count(AppointmentStatus::Pending),
        count(AppointmentStatus::Confirmed),
        count(AppointmentStatus::Completed),
        count(AppointmentStatus::Cancelled),
    ))
    .with_markup(keyboards::operator_menu()))
}
