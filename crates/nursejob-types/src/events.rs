use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Conversation, Message, Notification};

/// Store-level change notifications. Every write that can alter a realtime
/// query's result publishes one of these on the change bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A conversation was created or its summary fields changed
    ConversationUpdated {
        conversation_id: String,
        participants: [String; 2],
    },

    /// A message was appended to a conversation
    MessageCreated {
        conversation_id: String,
        message_id: String,
    },

    /// Any of a user's notifications was created, changed or removed
    NotificationsChanged { user_id: String },
}

impl ChangeEvent {
    /// Whether this change can alter `user_id`'s conversation list.
    pub fn touches_conversations_of(&self, user_id: &str) -> bool {
        matches!(self, Self::ConversationUpdated { participants, .. } if participants.iter().any(|p| p == user_id))
    }

    pub fn touches_messages_of(&self, conversation_id: &str) -> bool {
        matches!(self, Self::MessageCreated { conversation_id: cid, .. } if cid == conversation_id)
    }

    pub fn touches_notifications_of(&self, user_id: &str) -> bool {
        matches!(self, Self::NotificationsChanged { user_id: uid } if uid == user_id)
    }
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: String, name: String },

    /// A subscription was opened; snapshots for it follow
    Subscribed {
        subscription_id: Uuid,
        topic: SubscriptionTopic,
    },

    /// Full ordered message list of a conversation (oldest first)
    MessagesSnapshot {
        subscription_id: Uuid,
        conversation_id: String,
        messages: Vec<Message>,
    },

    /// The user's conversations, most recently active first
    ConversationsSnapshot {
        subscription_id: Uuid,
        conversations: Vec<Conversation>,
    },

    /// The user's notifications, newest first
    NotificationsSnapshot {
        subscription_id: Uuid,
        notifications: Vec<Notification>,
    },

    Unsubscribed { subscription_id: Uuid },

    /// A command could not be carried out
    Error { message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    SubscribeMessages { conversation_id: String },

    SubscribeConversations,

    SubscribeNotifications,

    Unsubscribe { subscription_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubscriptionTopic {
    Messages { conversation_id: String },
    Conversations,
    Notifications,
}
