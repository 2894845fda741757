//! Keyboard builders and the button labels the state machine matches on.

use crate::events::CallbackAction;
use crate::gateway::Markup;
use crate::models::{Appointment, StoredMessage};

pub const BTN_BOOK: &str = "📅 Book Appointment";
pub const BTN_CHAT: &str = "💬 Online Chat";
pub const BTN_ABOUT: &str = "ℹ️ About";
pub const BTN_ANONYMOUS: &str = "🎭 Anonymous Chat";
pub const BTN_IDENTIFIED: &str = "👤 Share My Information";
pub const BTN_USE_SAVED: &str = "✅ Use Saved Details";
pub const BTN_ENTER_NEW: &str = "✏️ Enter New Details";
pub const BTN_BACK_TO_MENU: &str = "🔙 Back to Menu";
pub const BTN_CANCEL: &str = "❌ Cancel";

pub const BTN_VIEW_MESSAGES: &str = "📬 View Messages";
pub const BTN_MANAGE_APPOINTMENTS: &str = "📅 Manage Appointments";
pub const BTN_STATISTICS: &str = "📊 Statistics";

pub const PAGE_SIZE: usize = 6;

fn rows(labels: &[&[&str]]) -> Markup {
    Markup::Buttons(
        labels
            .iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect(),
    )
}

/// Main menu for students.
pub fn main_menu() -> Markup {
    rows(&[&[BTN_BOOK], &[BTN_CHAT], &[BTN_ABOUT]])
}

/// Anonymous or identified chat.
pub fn chat_type_menu() -> Markup {
    rows(&[&[BTN_ANONYMOUS], &[BTN_IDENTIFIED], &[BTN_BACK_TO_MENU]])
}

/// Reuse stored credentials or enter new ones.
pub fn credentials_menu() -> Markup {
    rows(&[&[BTN_USE_SAVED], &[BTN_ENTER_NEW], &[BTN_CANCEL]])
}

pub fn cancel_menu() -> Markup {
    rows(&[&[BTN_CANCEL]])
}

/// Shown while a chat session is open.
pub fn chat_session_menu() -> Markup {
    rows(&[&[BTN_BACK_TO_MENU]])
}

/// Main menu for the psychologist.
pub fn operator_menu() -> Markup {
    rows(&[
        &[BTN_VIEW_MESSAGES],
        &[BTN_MANAGE_APPOINTMENTS],
        &[BTN_STATISTICS],
    ])
}

/// Fixed-size page over a snapshot. Returns the items of `page` (clamped to
/// the last page) together with (resolved_page, total_pages); `total_pages`
/// is at least 1 so callers can always render a position indicator.
pub fn page_slice<T>(items: &[T], page: usize) -> (&[T], usize, usize) {
    let total_pages = items.len().div_ceil(PAGE_SIZE).max(1);
    let page = page.min(total_pages - 1);
    let start = page * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(items.len());
    (&items[start..end], page, total_pages)
}

fn pager_row(page: usize, total_pages: usize, to_action: fn(usize) -> CallbackAction) -> Option<Vec<(String, String)>> {
    if total_pages <= 1 {
        return None;
    }
    let mut row = Vec::new();
    if page > 0 {
        row.push(("⬅️".to_string(), to_action(page - 1).encode()));
    }
    row.push((
        format!("{}/{}", page + 1, total_pages),
        CallbackAction::Noop.encode(),
    ));
    if page + 1 < total_pages {
        row.push(("➡️".to_string(), to_action(page + 1).encode()));
    }
    Some(row)
}

/// One page of unreplied messages.
pub fn messages_keyboard(messages: &[StoredMessage], page: usize) -> Markup {
    let (slice, page, total_pages) = page_slice(messages, page);
    let mut keyboard: Vec<Vec<(String, String)>> = slice
        .iter()
        .map(|msg| {
            let sender = if msg.is_anonymous {
                "Anonymous".to_string()
            } else {
                format!("ID: {}", msg.id)
            };
            vec![(
                format!("{} - {}", sender, msg.preview(30)),
                CallbackAction::ShowMessage(msg.id).encode(),
            )]
        })
        .collect();
    if let Some(row) = pager_row(page, total_pages, CallbackAction::MessagesPage) {
        keyboard.push(row);
    }
    Markup::Inline(keyboard)
}

/// Reply / back actions under a message detail view.
pub fn message_actions(message_id: i64) -> Markup {
    Markup::Inline(vec![
        vec![(
            "✍️ Reply".to_string(),
            CallbackAction::StartReply(message_id).encode(),
        )],
        vec![(
            "🔙 Back".to_string(),
            CallbackAction::BackToMessages.encode(),
        )],
    ])
}

/// One page of appointments.
pub fn appointments_keyboard(appointments: &[Appointment], page: usize) -> Markup {
    let (slice, page, total_pages) = page_slice(appointments, page);
    let mut keyboard: Vec<Vec<(String, String)>> = slice
        .iter()
        .map(|apt| {
            vec![(
                format!(
                    "{} {} - {}",
                    apt.status.label().chars().next().unwrap_or('❓'),
                    apt.full_name,
                    apt.preferred_date
                ),
                CallbackAction::ShowAppointment(apt.id).encode(),
            )]
        })
        .collect();
    if let Some(row) = pager_row(page, total_pages, CallbackAction::AppointmentsPage) {
        keyboard.push(row);
    }
    Markup::Inline(keyboard)
}

/// Status actions under an appointment detail view.
pub fn appointment_actions(appointment_id: i64) -> Markup {
    Markup::Inline(vec![
        vec![(
            "✅ Confirm".to_string(),
            CallbackAction::ConfirmAppointment(appointment_id).encode(),
        )],
        vec![(
            "❌ Cancel".to_string(),
            CallbackAction::CancelAppointment(appointment_id).encode(),
        )],
        vec![(
            "✔️ Complete".to_string(),
            CallbackAction::CompleteAppointment(appointment_id).encode(),
        )],
        vec![(
            "🔙 Back".to_string(),
            CallbackAction::BackToAppointments.encode(),
        )],
    ])
}
