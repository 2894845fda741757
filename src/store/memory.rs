//! In-memory store: the test double behind the `Store` seam, also usable as
//! a volatile backend. Mirrors the guard semantics of `PgStore` exactly.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{Store, StoreError};
use crate::models::{Appointment, AppointmentStatus, StoredMessage, User};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    messages: Vec<StoredMessage>,
    appointments: Vec<Appointment>,
    next_user_id: i64,
    next_message_id: i64,
    next_appointment_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn user_pk(&self, telegram_id: i64) -> Result<i64, StoreError> {
        self.users
            .iter()
            .find(|u| u.telegram_id == telegram_id)
            .map(|u| u.id)
            .ok_or(StoreError::UnknownUser(telegram_id))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_or_create_user(
        &self,
        telegram_id: i64,
        username: Option<&str>,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter().find(|u| u.telegram_id == telegram_id) {
            return Ok(user.clone());
        }
        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            telegram_id,
            username: username.map(str::to_string),
            full_name: None,
            student_id: None,
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn update_user_info(
        &self,
        telegram_id: i64,
        full_name: &str,
        student_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner
            .users
            .iter_mut()
            .find(|u| u.telegram_id == telegram_id)
        {
            user.full_name = Some(full_name.to_string());
            user.student_id = student_id.map(str::to_string);
        }
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn save_message(
        &self,
        telegram_id: i64,
        message_text: &str,
        is_anonymous: bool,
        origin_message_id: i64,
    ) -> Result<StoredMessage, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let user_id = inner.user_pk(telegram_id)?;
        inner.next_message_id += 1;
        let message = StoredMessage {
            id: inner.next_message_id,
            user_id,
            message_text: message_text.to_string(),
            is_anonymous,
            created_at: Utc::now(),
            replied: false,
            operator_reply: None,
            reply_at: None,
            forwarded_message_id: None,
            origin_message_id,
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn get_unreplied_messages(&self) -> Result<Vec<StoredMessage>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .messages
            .iter()
            .filter(|m| !m.replied)
            .cloned()
            .collect())
    }

    async fn get_message_by_id(
        &self,
        message_id: i64,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn get_message_by_external_id(
        &self,
        forwarded_message_id: i64,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .messages
            .iter()
            .find(|m| m.forwarded_message_id == Some(forwarded_message_id))
            .cloned())
    }

    async fn update_external_message_id(
        &self,
        message_id: i64,
        forwarded_message_id: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.messages.iter_mut().find(|m| m.id == message_id) {
            message.forwarded_message_id = Some(forwarded_message_id);
        }
        Ok(())
    }

    async fn reply_to_message(
        &self,
        message_id: i64,
        reply_text: &str,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && !m.replied)
        {
            Some(message) => {
                message.operator_reply = Some(reply_text.to_string());
                message.replied = true;
                message.reply_at = Some(Utc::now());
                Ok(Some(message.clone()))
            }
            None => Ok(None),
        }
    }

    async fn create_appointment(
        &self,
        telegram_id: i64,
        full_name: &str,
        student_id: &str,
        preferred_date: &str,
        preferred_time: &str,
        reason: &str,
    ) -> Result<Appointment, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let user_id = inner.user_pk(telegram_id)?;
        inner.next_appointment_id += 1;
        let appointment = Appointment {
            id: inner.next_appointment_id,
            user_id,
            full_name: full_name.to_string(),
            student_id: student_id.to_string(),
            preferred_date: preferred_date.to_string(),
            preferred_time: preferred_time.to_string(),
            reason: reason.to_string(),
            status: AppointmentStatus::Pending,
            notes: None,
            created_at: Utc::now(),
        };
        inner.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn get_pending_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Pending)
            .cloned()
            .collect())
    }

    async fn get_all_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut appointments = inner.appointments.clone();
        appointments.reverse(); // newest first, like the SQL ordering
        Ok(appointments)
    }

    async fn get_appointment_by_id(
        &self,
        appointment_id: i64,
    ) -> Result<Option<Appointment>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .cloned())
    }

    async fn update_appointment_status(
        &self,
        appointment_id: i64,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id && a.status == AppointmentStatus::Pending)
        {
            Some(appointment) => {
                appointment.status = status;
                if notes.is_some() {
                    appointment.notes = notes.map(str::to_string);
                }
                Ok(Some(appointment.clone()))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reply_guard_rejects_a_second_write() {
        let store = MemoryStore::new();
        store.get_or_create_user(10, None).await.unwrap();
        let msg = store.save_message(10, "hello", true, 100).await.unwrap();

        let first = store.reply_to_message(msg.id, "first").await.unwrap();
        assert!(first.is_some());
        let second = store.reply_to_message(msg.id, "second").await.unwrap();
        assert!(second.is_none());

        let stored = store.get_message_by_id(msg.id).await.unwrap().unwrap();
        assert_eq!(stored.operator_reply.as_deref(), Some("first"));
        assert!(stored.replied && stored.reply_at.is_some());
    }

    #[tokio::test]
    async fn status_updates_only_leave_pending_once() {
        let store = MemoryStore::new();
        store.get_or_create_user(10, None).await.unwrap();
        let apt = store
            .create_appointment(10, "Jane Doe", "S1", "Monday", "10:00", "Not specified")
            .await
            .unwrap();

        let confirmed = store
            .update_appointment_status(apt.id, AppointmentStatus::Confirmed, None)
            .await
            .unwrap();
        assert_eq!(confirmed.unwrap().status, AppointmentStatus::Confirmed);

        let cancelled = store
            .update_appointment_status(apt.id, AppointmentStatus::Cancelled, None)
            .await
            .unwrap();
        assert!(cancelled.is_none(), "terminal status must not change");
    }

    #[tokio::test]
    async fn correlation_lookup_finds_the_forwarded_copy() {
        let store = MemoryStore::new();
        store.get_or_create_user(10, Some("jdoe")).await.unwrap();
        let msg = store.save_message(10, "hi", false, 555).await.unwrap();
        store.update_external_message_id(msg.id, 777).await.unwrap();

        let found = store.get_message_by_external_id(777).await.unwrap();
        assert_eq!(found.map(|m| m.id), Some(msg.id));
        assert!(store.get_message_by_external_id(778).await.unwrap().is_none());
    }
}
