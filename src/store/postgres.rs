//! Postgres-backed store. Owns the pool and creates the schema on startup.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{Store, StoreError};
use crate::models::{Appointment, AppointmentStatus, StoredMessage, User};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(PgStore { pool })
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                telegram_id BIGINT UNIQUE NOT NULL,
                username VARCHAR(255),
                full_name VARCHAR(255),
                student_id VARCHAR(100),
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                message_text TEXT NOT NULL,
                is_anonymous BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                replied BOOLEAN NOT NULL DEFAULT FALSE,
                operator_reply TEXT,
                reply_at TIMESTAMP WITH TIME ZONE,
                forwarded_message_id BIGINT,
                origin_message_id BIGINT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS appointments (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                full_name VARCHAR(255) NOT NULL,
                student_id VARCHAR(100) NOT NULL,
                preferred_date VARCHAR(255) NOT NULL,
                preferred_time VARCHAR(255) NOT NULL,
                reason TEXT NOT NULL DEFAULT 'Not specified',
                status VARCHAR(50) NOT NULL DEFAULT 'pending',
                notes TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_telegram_id ON users (telegram_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_replied ON messages (replied)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_forwarded_id ON messages (forwarded_message_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments (status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn user_pk(&self, telegram_id: i64) -> Result<i64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(id,)| id)
            .ok_or(StoreError::UnknownUser(telegram_id))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_or_create_user(
        &self,
        telegram_id: i64,
        username: Option<&str>,
    ) -> Result<User, StoreError> {
        if let Some(user) = sqlx::query_as::<_, User>("SELECT * FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(user);
        }

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (telegram_id, username) VALUES ($1, $2) RETURNING *",
        )
        .bind(telegram_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user_info(
        &self,
        telegram_id: i64,
        full_name: &str,
        student_id: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET full_name = $1, student_id = $2 WHERE telegram_id = $3")
            .bind(full_name)
            .bind(student_id)
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn save_message(
        &self,
        telegram_id: i64,
        message_text: &str,
        is_anonymous: bool,
        origin_message_id: i64,
    ) -> Result<StoredMessage, StoreError> {
        let user_id = self.user_pk(telegram_id).await?;
        let message = sqlx::query_as::<_, StoredMessage>(
            r#"
            INSERT INTO messages (user_id, message_text, is_anonymous, origin_message_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(message_text)
        .bind(is_anonymous)
        .bind(origin_message_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn get_unreplied_messages(&self) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = sqlx::query_as::<_, StoredMessage>(
            "SELECT * FROM messages WHERE replied = FALSE ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn get_message_by_id(
        &self,
        message_id: i64,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let message = sqlx::query_as::<_, StoredMessage>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(message)
    }

    async fn get_message_by_external_id(
        &self,
        forwarded_message_id: i64,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let message = sqlx::query_as::<_, StoredMessage>(
            "SELECT * FROM messages WHERE forwarded_message_id = $1",
        )
        .bind(forwarded_message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    async fn update_external_message_id(
        &self,
        message_id: i64,
        forwarded_message_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE messages SET forwarded_message_id = $1 WHERE id = $2")
            .bind(forwarded_message_id)
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reply_to_message(
        &self,
        message_id: i64,
        reply_text: &str,
    ) -> Result<Option<StoredMessage>, StoreError> {
        // `replied = FALSE` in the predicate makes the write an optimistic
        // check: a concurrent second reply loses and sees None.
        let message = sqlx::query_as::<_, StoredMessage>(
            r#"
            UPDATE messages
            SET operator_reply = $1, replied = TRUE, reply_at = NOW()
            WHERE id = $2 AND replied = FALSE
            RETURNING *
            "#,
        )
        .bind(reply_text)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
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
        let user_id = self.user_pk(telegram_id).await?;
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments
                (user_id, full_name, student_id, preferred_date, preferred_time, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(full_name)
        .bind(student_id)
        .bind(preferred_date)
        .bind(preferred_time)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;
        Ok(appointment)
    }

    async fn get_pending_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE status = 'pending' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    async fn get_all_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    async fn get_appointment_by_id(
        &self,
        appointment_id: i64,
    ) -> Result<Option<Appointment>, StoreError> {
        let appointment =
            sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
                .bind(appointment_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(appointment)
    }

    async fn update_appointment_status(
        &self,
        appointment_id: i64,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> Result<Option<Appointment>, StoreError> {
        // Only pending appointments may move; terminal rows are left intact.
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = $1, notes = COALESCE($2, notes)
            WHERE id = $3 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(notes)
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(appointment)
    }
}
