use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record pairing two participants and summarizing their message history.
///
/// `participants` keeps the order the conversation was opened with; lookups
/// treat the pair as unordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participants: [String; 2],
    pub participant_names: [String; 2],
    pub job_id: Option<String>,
    pub job_title: Option<String>,
    pub facility_name: Option<String>,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Shared by both participants: whoever marks the conversation read
    /// clears it for the other side as well.
    pub unread_count: u32,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

/// Messages are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationUpdate,
    MessageReceived,
    JobPosted,
    SystemAnnouncement,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationUpdate => "application_update",
            Self::MessageReceived => "message_received",
            Self::JobPosted => "job_posted",
            Self::SystemAnnouncement => "system_announcement",
        }
    }
}

/// Kind-dependent notification fields. The tag doubles as the notification kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// A nurse's application to a job changed status (accepted, rejected, ...)
    ApplicationUpdate {
        job_id: String,
        job_title: String,
        status: String,
    },

    /// Someone wrote in one of the user's conversations
    MessageReceived {
        conversation_id: String,
        sender_name: String,
    },

    /// A facility published a job the user may be interested in
    JobPosted {
        job_id: String,
        job_title: String,
        facility_name: String,
    },

    SystemAnnouncement,
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::ApplicationUpdate { .. } => NotificationKind::ApplicationUpdate,
            Self::MessageReceived { .. } => NotificationKind::MessageReceived,
            Self::JobPosted { .. } => NotificationKind::JobPosted,
            Self::SystemAnnouncement => NotificationKind::SystemAnnouncement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    #[serde(flatten)]
    pub payload: NotificationPayload,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        self.payload.kind()
    }
}
