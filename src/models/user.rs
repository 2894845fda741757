use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A Telegram identity known to the bot. Created lazily on first interaction;
/// `full_name` and `student_id` stay empty until the student uses identified
/// chat. Rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub student_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the "use my saved details" shortcut can be offered.
    pub fn has_saved_details(&self) -> bool {
        self.full_name.is_some()
    }
}
