use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One student-submitted chat message.
///
/// `origin_message_id` is the Telegram id of the message the student sent;
/// `forwarded_message_id` is the id of the copy delivered to the psychologist.
/// Together they form the bidirectional link used for reply threading.
///
/// Invariant: `replied` is true iff `operator_reply` and `reply_at` are both
/// set, and the reply fields are written at most once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredMessage {
    pub id: i64,
    pub user_id: i64,
    pub message_text: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub replied: bool,
    pub operator_reply: Option<String>,
    pub reply_at: Option<DateTime<Utc>>,
    pub forwarded_message_id: Option<i64>,
    pub origin_message_id: i64,
}

impl StoredMessage {
    /// Short excerpt for list keyboards.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut out: String = self.message_text.chars().take(max_chars).collect();
        if self.message_text.chars().count() > max_chars {
            out.push_str("...");
        }
        out
    }
}
