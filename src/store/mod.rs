//! Record store contract.
//!
//! The flows depend on this trait only; `PgStore` is the production backend
//! and `MemoryStore` a drop-in double for tests (or a volatile deployment).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Appointment, AppointmentStatus, StoredMessage, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unknown user with telegram id {0}")]
    UnknownUser(i64),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_or_create_user(
        &self,
        telegram_id: i64,
        username: Option<&str>,
    ) -> Result<User, StoreError>;

    async fn update_user_info(
        &self,
        telegram_id: i64,
        full_name: &str,
        student_id: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    /// Persist a student message together with the Telegram id of the
    /// message the student sent (for reply threading back to them).
    async fn save_message(
        &self,
        telegram_id: i64,
        message_text: &str,
        is_anonymous: bool,
        origin_message_id: i64,
    ) -> Result<StoredMessage, StoreError>;

    async fn get_unreplied_messages(&self) -> Result<Vec<StoredMessage>, StoreError>;

    async fn get_message_by_id(&self, message_id: i64) -> Result<Option<StoredMessage>, StoreError>;

    /// Correlation lookup: find the message whose forwarded (operator-side)
    /// copy has the given Telegram id.
    async fn get_message_by_external_id(
        &self,
        forwarded_message_id: i64,
    ) -> Result<Option<StoredMessage>, StoreError>;

    /// Record the Telegram id assigned to the forwarded copy.
    async fn update_external_message_id(
        &self,
        message_id: i64,
        forwarded_message_id: i64,
    ) -> Result<(), StoreError>;

    /// Write the reply fields. Guarded: returns `None` when the message does
    /// not exist or was already replied to, so the one-reply invariant holds
    /// even under concurrent attempts.
    async fn reply_to_message(
        &self,
        message_id: i64,
        reply_text: &str,
    ) -> Result<Option<StoredMessage>, StoreError>;

    async fn create_appointment(
        &self,
        telegram_id: i64,
        full_name: &str,
        student_id: &str,
        preferred_date: &str,
        preferred_time: &str,
        reason: &str,
    ) -> Result<Appointment, StoreError>;

    async fn get_pending_appointments(&self) -> Result<Vec<Appointment>, StoreError>;

    async fn get_all_appointments(&self) -> Result<Vec<Appointment>, StoreError>;

    async fn get_appointment_by_id(
        &self,
        appointment_id: i64,
    ) -> Result<Option<Appointment>, StoreError>;

    /// Move a pending appointment to a terminal status. Guarded: returns
    /// `None` when the appointment does not exist or already left `pending`.
    async fn update_appointment_status(
        &self,
        appointment_id: i64,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> Result<Option<Appointment>, StoreError>;
}
