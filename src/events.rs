//! Inline-keyboard callback payloads.
//!
//! Callback data arrives as strings like `msg_12` or `apt_page_3`. They are
//! decoded exactly once, at the update boundary, into this tagged union so
//! the flows can match exhaustively instead of sprinkling prefix checks.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    ShowMessage(i64),
    StartReply(i64),
    MessagesPage(usize),
    BackToMessages,
    ShowAppointment(i64),
    ConfirmAppointment(i64),
    CancelAppointment(i64),
    CompleteAppointment(i64),
    AppointmentsPage(usize),
    BackToAppointments,
    /// Inert buttons (page indicators and the like).
    Noop,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "back_to_messages" => return Some(CallbackAction::BackToMessages),
            "back_to_appointments" => return Some(CallbackAction::BackToAppointments),
            "noop" => return Some(CallbackAction::Noop),
            _ => {}
        }

        // Longer prefixes first: `msg_page_` would otherwise be eaten by `msg_`.
        if let Some(rest) = data.strip_prefix("msg_page_") {
            return rest.parse().ok().map(CallbackAction::MessagesPage);
        }
        if let Some(rest) = data.strip_prefix("apt_page_") {
            return rest.parse().ok().map(CallbackAction::AppointmentsPage);
        }
        if let Some(rest) = data.strip_prefix("msg_") {
            return rest.parse().ok().map(CallbackAction::ShowMessage);
        }
        if let Some(rest) = data.strip_prefix("reply_") {
            return rest.parse().ok().map(CallbackAction::StartReply);
        }
        if let Some(rest) = data.strip_prefix("apt_") {
            return rest.parse().ok().map(CallbackAction::ShowAppointment);
        }
        if let Some(rest) = data.strip_prefix("confirm_") {
            return rest.parse().ok().map(CallbackAction::ConfirmAppointment);
        }
        if let Some(rest) = data.strip_prefix("cancel_") {
            return rest.parse().ok().map(CallbackAction::CancelAppointment);
        }
        if let Some(rest) = data.strip_prefix("complete_") {
            return rest.parse().ok().map(CallbackAction::CompleteAppointment);
        }

        None
    }

    pub fn encode(&self) -> String {
        match self {
            CallbackAction::ShowMessage(id) => format!("msg_{id}"),
            CallbackAction::StartReply(id) => format!("reply_{id}"),
            CallbackAction::MessagesPage(page) => format!("msg_page_{page}"),
            CallbackAction::BackToMessages => "back_to_messages".to_string(),
            CallbackAction::ShowAppointment(id) => format!("apt_{id}"),
            CallbackAction::ConfirmAppointment(id) => format!("confirm_{id}"),
            CallbackAction::CancelAppointment(id) => format!("cancel_{id}"),
            CallbackAction::CompleteAppointment(id) => format!("complete_{id}"),
            CallbackAction::AppointmentsPage(page) => format!("apt_page_{page}"),
            CallbackAction::BackToAppointments => "back_to_appointments".to_string(),
            CallbackAction::Noop => "noop".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_round_trips() {
        let actions = [
            CallbackAction::ShowMessage(12),
            CallbackAction::StartReply(12),
            CallbackAction::MessagesPage(3),
            CallbackAction::BackToMessages,
            CallbackAction::ShowAppointment(7),
            CallbackAction::ConfirmAppointment(7),
            CallbackAction::CancelAppointment(7),
            CallbackAction::CompleteAppointment(7),
            CallbackAction::AppointmentsPage(0),
            CallbackAction::BackToAppointments,
            CallbackAction::Noop,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.encode()), Some(action));
        }
    }

    #[test]
    fn page_prefixes_are_not_shadowed_by_id_prefixes() {
        assert_eq!(
            CallbackAction::parse("msg_page_2"),
            Some(CallbackAction::MessagesPage(2))
        );
        assert_eq!(
            CallbackAction::parse("apt_page_0"),
            Some(CallbackAction::AppointmentsPage(0))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        for bad in ["", "msg_", "msg_abc", "apt_page_x", "unknown_5"] {
            assert_eq!(CallbackAction::parse(bad), None, "{bad:?}");
        }
    }
}
