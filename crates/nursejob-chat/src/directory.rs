use tracing::{debug, info};

use nursejob_db::models::NewConversationRow;
use nursejob_types::events::ChangeEvent;
use nursejob_types::models::Conversation;

use crate::{ChatError, ChatService, Result};

/// Request to open (or find) the conversation between two users.
#[derive(Debug, Clone, Default)]
pub struct NewConversation {
    pub user_id: String,
    pub user_name: String,
    pub other_user_id: String,
    pub other_user_name: String,
    /// `None` (or an empty string) opens the general conversation of the pair
    pub job_id: Option<String>,
    pub job_title: Option<String>,
    pub facility_name: Option<String>,
}

impl ChatService {
    /// Resolve the conversation for the unordered pair and job scope, creating
    /// it on first contact. Returns the conversation id.
    ///
    /// A job-scoped conversation never matches a job-less one between the same
    /// pair, nor one scoped to a different job. Lookup does not mutate an
    /// existing conversation.
    pub async fn get_or_create_conversation(&self, req: NewConversation) -> Result<String> {
        if req.user_id.is_empty() || req.other_user_id.is_empty() || req.user_id == req.other_user_id {
            return Err(ChatError::InvalidParticipants);
        }

        let job_id = req.job_id.filter(|j| !j.is_empty());
        let scoped = job_id.is_some();

        let user_id = req.user_id;
        let user_name = req.user_name;
        let other_user_id = req.other_user_id;
        let other_user_name = req.other_user_name;
        let job_title = req.job_title;
        let facility_name = req.facility_name;

        let (row, created) = self
            .blocking(move |db| {
                db.get_or_insert_conversation(&NewConversationRow {
                    participant_a: &user_id,
                    participant_a_name: &user_name,
                    participant_b: &other_user_id,
                    participant_b_name: &other_user_name,
                    job_id: job_id.as_deref(),
                    job_title: job_title.as_deref(),
                    facility_name: facility_name.as_deref(),
                })
            })
            .await?;

        if created {
            info!(
                "Conversation {} opened between {} and {} (job scoped: {})",
                row.id, row.participant_a, row.participant_b, scoped
            );
            self.bus.publish(ChangeEvent::ConversationUpdated {
                conversation_id: row.id.clone(),
                participants: [row.participant_a, row.participant_b],
            });
        } else {
            debug!("Reusing conversation {}", row.id);
        }

        Ok(row.id)
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let id = conversation_id.to_string();
        let row = self.blocking(move |db| db.get_conversation(&id)).await?;
        Ok(row.map(Conversation::from))
    }

    /// The user's conversations, most recently active first.
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let uid = user_id.to_string();
        let rows = self.blocking(move |db| db.list_conversations_for_user(&uid)).await?;
        Ok(rows.into_iter().map(Conversation::from).collect())
    }
}
