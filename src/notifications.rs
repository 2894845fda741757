//! Fire-and-forget status notifications. Failures are logged and never
//! propagated: a notification is a courtesy, not part of the transaction
//! that changed the data.

use teloxide::utils::html;

use crate::gateway::{Gateway, Outgoing};
use crate::models::{Appointment, AppointmentStatus};
use crate::store::Store;

/// Tell the psychologist about a freshly submitted appointment request.
pub async fn notify_new_appointment(
    gateway: &dyn Gateway,
    operator_id: i64,
    appointment: &Appointment,
) {
    let body = format!(
        "📅 <b>New Appointment Request</b>\n\
         Appointment ID: {}\n\n\
         👤 Name: {}\n\
         🆔 Student ID: {}\n\
         📆 Preferred Date: {}\n\
         🕐 Preferred Time: {}\n\
         📝 Reason: {}\n\n\
         Manage: /appointments",
        appointment.id,
        html::escape(&appointment.full_name),
        html::escape(&appointment.student_id),
        html::escape(&appointment.preferred_date),
        html::escape(&appointment.preferred_time),
        html::escape(&appointment.reason),
    );
    if let Err(err) = gateway.send(operator_id, Outgoing::text(body)).await {
        log::error!(
            "could not notify psychologist about appointment {}: {err}",
            appointment.id
        );
    }
}

/// Tell the owning student their appointment was confirmed or cancelled.
/// Completion is an internal bookkeeping step and sends nothing.
pub async fn notify_status_change(
    store: &dyn Store,
    gateway: &dyn Gateway,
    appointment: &Appointment,
) {
    let body = match appointment.status {
        AppointmentStatus::Confirmed => format!(
            "✅ <b>Appointment Confirmed!</b>\n\n\
             Your appointment has been confirmed:\n\
             📆 Date: {}\n\
             🕐 Time: {}\n\n\
             Please arrive on time. Looking forward to seeing you!",
            html::escape(&appointment.preferred_date),
            html::escape(&appointment.preferred_time),
        ),
        AppointmentStatus::Cancelled => format!(
            "❌ <b>Appointment Cancelled</b>\n\n\
             Unfortunately, your appointment for {} at {} has been cancelled.\n\n\
             Please feel free to book another appointment or send a message \
             if you need assistance.",
            html::escape(&appointment.preferred_date),
            html::escape(&appointment.preferred_time),
        ),
        AppointmentStatus::Pending | AppointmentStatus::Completed => return,
    };

    let user = match store.get_user_by_id(appointment.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            log::error!("appointment {} has no owning user", appointment.id);
            return;
        }
        Err(err) => {
            log::error!("looking up owner of appointment {} failed: {err}", appointment.id);
            return;
        }
    };

    if let Err(err) = gateway.send(user.telegram_id, Outgoing::text(body)).await {
        log::error!(
            "could not notify user {} about appointment {}: {err}",
            user.telegram_id,
            appointment.id
        );
    }
}
