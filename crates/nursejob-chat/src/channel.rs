use tracing::{debug, warn};

use nursejob_types::events::ChangeEvent;
use nursejob_types::models::Message;

use crate::{ChatError, ChatService, Result};

impl ChatService {
    /// Append a message and refresh the parent conversation's summary.
    ///
    /// The message is persisted first. If the parent conversation does not
    /// exist the summary step is skipped and the message stays; a failing
    /// summary update does not roll the message back.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        sender_name: &str,
        text: &str,
    ) -> Result<Message> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let cid = conversation_id.to_string();
        let sid = sender_id.to_string();
        let sname = sender_name.to_string();
        let body = text.to_string();
        let message: Message = self
            .blocking(move |db| db.insert_message(&cid, &sid, &sname, &body))
            .await?
            .into();

        self.bus.publish(ChangeEvent::MessageCreated {
            conversation_id: message.conversation_id.clone(),
            message_id: message.id.clone(),
        });

        let cid = conversation_id.to_string();
        let body = text.to_string();
        match self.blocking(move |db| db.touch_conversation_summary(&cid, &body)).await? {
            Some(update) => {
                debug!(
                    "Conversation {} summary updated, unread now {}",
                    conversation_id, update.unread_count
                );
                self.bus.publish(ChangeEvent::ConversationUpdated {
                    conversation_id: conversation_id.to_string(),
                    participants: update.participants,
                });
            }
            None => debug!(
                "Conversation {} not found, summary update skipped for message {}",
                conversation_id, message.id
            ),
        }

        Ok(message)
    }

    /// Zero the conversation's unread counter.
    ///
    /// The counter is shared by both participants, so this clears it for the
    /// other side too. Store failures are logged and swallowed.
    pub async fn mark_conversation_as_read(&self, conversation_id: &str, user_id: &str) {
        let cid = conversation_id.to_string();
        match self.blocking(move |db| db.reset_unread(&cid)).await {
            Ok(Some(participants)) => {
                debug!("{} read conversation {}", user_id, conversation_id);
                self.bus.publish(ChangeEvent::ConversationUpdated {
                    conversation_id: conversation_id.to_string(),
                    participants,
                });
            }
            Ok(None) => debug!("Conversation {} not found, nothing to mark read", conversation_id),
            Err(e) => warn!(
                "Failed to mark conversation {} read for {}: {}",
                conversation_id, user_id, e
            ),
        }
    }

    /// Sum of unread counters over every conversation the user takes part in.
    pub async fn get_unread_count(&self, user_id: &str) -> Result<u64> {
        let uid = user_id.to_string();
        self.blocking(move |db| db.sum_unread_for_user(&uid)).await
    }

    /// Every message of the conversation, oldest first.
    pub async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let cid = conversation_id.to_string();
        let rows = self.blocking(move |db| db.list_messages(&cid)).await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }
}
