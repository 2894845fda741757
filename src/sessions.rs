//! Volatile per-user conversation state.
//!
//! Each chat owns at most one `Session`; it lives only for the duration of a
//! dialog and is lost on restart. The map is cloned freely (Arc inside) and
//! only ever mutated by events from the owning chat, so a plain RwLock is
//! enough.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Steps of the student dialog graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentState {
    ChoosingService,
    ChoosingChatType,
    ChoosingCredentials,
    EnteringFullName,
    EnteringStudentId,
    /// Continuous chat: every message is relayed, the state does not change
    /// until the student leaves via the menu.
    InChatSession,
    EnteringAppointmentFullName,
    EnteringAppointmentStudentId,
    EnteringPreferredDate,
    EnteringPreferredTime,
    EnteringReason,
}

/// Steps of the psychologist dialog graph. Shallow: each entry point returns
/// to `Idle` when done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorState {
    #[default]
    Idle,
    ViewingMessages,
    ManagingAppointments,
    /// Free-typing a reply to the message with this store id.
    ReplyingTo(i64),
}

/// Partially collected form fields. Cleared wholesale on cancel so an
/// aborted flow can never leak values into the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub is_anonymous: Option<bool>,
    pub full_name: Option<String>,
    pub student_id: Option<String>,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: StudentState,
    pub draft: Draft,
}

impl Session {
    pub fn new(state: StudentState) -> Self {
        Session {
            state,
            draft: Draft::default(),
        }
    }
}

#[derive(Clone, Default)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<i64, Session>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, chat_id: i64) -> Option<Session> {
        self.inner.read().await.get(&chat_id).cloned()
    }

    pub async fn set(&self, chat_id: i64, session: Session) {
        log::debug!("session for {chat_id} -> {:?}", session.state);
        self.inner.write().await.insert(chat_id, session);
    }

    /// Discard the session and any accumulated draft.
    pub async fn clear(&self, chat_id: i64) {
        self.inner.write().await.remove(&chat_id);
    }

    /// Reset to a fresh session at the given step, dropping the draft.
    pub async fn reset_to(&self, chat_id: i64, state: StudentState) {
        self.set(chat_id, Session::new(state)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reset_discards_the_draft() {
        let sessions = Sessions::new();
        let mut session = Session::new(StudentState::EnteringStudentId);
        session.draft.full_name = Some("Jane Doe".to_string());
        sessions.set(7, session).await;

        sessions.reset_to(7, StudentState::ChoosingService).await;
        let fresh = sessions.get(7).await.unwrap();
        assert_eq!(fresh.state, StudentState::ChoosingService);
        assert_eq!(fresh.draft, Draft::default());
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_chat() {
        let sessions = Sessions::new();
        sessions
            .set(1, Session::new(StudentState::InChatSession))
            .await;
        assert_eq!(sessions.get(2).await, None);
        sessions.clear(1).await;
        assert_eq!(sessions.get(1).await, None);
    }
}
