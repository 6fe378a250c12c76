//! Database row types, mapped directly from SQLite rows. Timestamps are Unix
//! milliseconds here and become `DateTime<Utc>` on conversion to the shared
//! models.

use chrono::{DateTime, Utc};
use tracing::warn;

use nursejob_types::models::{Conversation, Message, Notification, NotificationPayload};

pub struct ConversationRow {
    pub id: String,
    pub scope_key: String,
    pub participant_a: String,
    pub participant_a_name: String,
    pub participant_b: String,
    pub participant_b_name: String,
    pub job_id: Option<String>,
    pub job_title: Option<String>,
    pub facility_name: Option<String>,
    pub last_message: String,
    pub last_message_at: i64,
    pub created_at: i64,
    pub unread_count: i64,
}

/// Fields supplied by the caller when a conversation is first opened.
pub struct NewConversationRow<'a> {
    pub participant_a: &'a str,
    pub participant_a_name: &'a str,
    pub participant_b: &'a str,
    pub participant_b_name: &'a str,
    pub job_id: Option<&'a str>,
    pub job_title: Option<&'a str>,
    pub facility_name: Option<&'a str>,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub created_at: i64,
    pub is_read: bool,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub payload: NotificationPayload,
    pub is_read: bool,
    pub created_at: i64,
}

/// Result of bumping a conversation's summary fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryUpdate {
    pub participants: [String; 2],
    pub unread_count: i64,
}

pub(crate) fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(|| {
        warn!("Timestamp out of range: {}", ms);
        DateTime::default()
    })
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            participants: [row.participant_a, row.participant_b],
            participant_names: [row.participant_a_name, row.participant_b_name],
            job_id: row.job_id,
            job_title: row.job_title,
            facility_name: row.facility_name,
            last_message: row.last_message,
            last_message_at: millis_to_utc(row.last_message_at),
            created_at: millis_to_utc(row.created_at),
            unread_count: u32::try_from(row.unread_count).unwrap_or_default(),
        }
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            sender_name: row.sender_name,
            text: row.text,
            created_at: millis_to_utc(row.created_at),
            read: row.is_read,
        }
    }
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            body: row.body,
            payload: row.payload,
            read: row.is_read,
            created_at: millis_to_utc(row.created_at),
        }
    }
}
