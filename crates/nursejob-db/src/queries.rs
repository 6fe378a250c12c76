use anyhow::{Result, anyhow};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use nursejob_types::models::NotificationPayload;

use crate::models::{ConversationRow, MessageRow, NewConversationRow, NotificationRow, SummaryUpdate};
use crate::{Database, scope_key};

const CONVERSATION_COLUMNS: &str = "id, scope_key, participant_a, participant_a_name, participant_b, \
     participant_b_name, job_id, job_title, facility_name, last_message, last_message_at, \
     created_at, unread_count";

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, sender_name, text, created_at, is_read";

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, body, payload, is_read, created_at";

impl Database {
    // -- Conversations --

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
            conn.query_row(&sql, [id], conversation_from_row).optional()
        })
    }

    /// Look up the conversation for the pair and job scope, inserting it if
    /// absent. Check and insert run in one transaction under the connection lock,
    /// so concurrent first contact yields a single record.
    /// Returns the row and whether it was created by this call.
    pub fn get_or_insert_conversation(
        &self,
        new: &NewConversationRow<'_>,
    ) -> Result<(ConversationRow, bool)> {
        let key = scope_key(new.participant_a, new.participant_b, new.job_id);

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            if let Some(existing) = query_conversation_by_scope(&tx, &key)? {
                tx.commit()?;
                return Ok((existing, false));
            }

            let now = self.server_timestamp_millis();
            let row = ConversationRow {
                id: Uuid::new_v4().to_string(),
                scope_key: key.clone(),
                participant_a: new.participant_a.to_string(),
                participant_a_name: new.participant_a_name.to_string(),
                participant_b: new.participant_b.to_string(),
                participant_b_name: new.participant_b_name.to_string(),
                job_id: new.job_id.map(str::to_string),
                job_title: new.job_title.map(str::to_string),
                facility_name: new.facility_name.map(str::to_string),
                last_message: String::new(),
                last_message_at: now,
                created_at: now,
                unread_count: 0,
            };

            tx.execute(
                "INSERT INTO conversations (id, scope_key, participant_a, participant_a_name,
                    participant_b, participant_b_name, job_id, job_title, facility_name,
                    last_message, last_message_at, created_at, unread_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0)",
                params![
                    row.id,
                    row.scope_key,
                    row.participant_a,
                    row.participant_a_name,
                    row.participant_b,
                    row.participant_b_name,
                    row.job_id,
                    row.job_title,
                    row.facility_name,
                    row.last_message,
                    row.last_message_at,
                    row.created_at,
                ],
            )?;
            tx.commit()?;

            Ok((row, true))
        })
    }

    /// Conversations the user takes part in, most recently active first.
    /// Ties fall back to insertion order.
    pub fn list_conversations_for_user(&self, user_id: &str) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE participant_a = ?1 OR participant_b = ?1
                 ORDER BY last_message_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], conversation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Set the last-message fields and bump the unread counter in a single
    /// statement. `None` when the conversation does not exist.
    pub fn touch_conversation_summary(&self, id: &str, text: &str) -> Result<Option<SummaryUpdate>> {
        self.with_conn(|conn| {
            let now = self.server_timestamp_millis();
            conn.query_row(
                "UPDATE conversations
                 SET last_message = ?2, last_message_at = ?3, unread_count = unread_count + 1
                 WHERE id = ?1
                 RETURNING participant_a, participant_b, unread_count",
                params![id, text, now],
                |row| {
                    Ok(SummaryUpdate {
                        participants: [row.get(0)?, row.get(1)?],
                        unread_count: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Zero the shared unread counter. Returns the participants, or `None`
    /// when the conversation does not exist.
    pub fn reset_unread(&self, id: &str) -> Result<Option<[String; 2]>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE conversations SET unread_count = 0 WHERE id = ?1
                 RETURNING participant_a, participant_b",
                [id],
                |row| Ok([row.get(0)?, row.get(1)?]),
            )
            .optional()
        })
    }

    pub fn sum_unread_for_user(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(unread_count), 0) FROM conversations
                 WHERE participant_a = ?1 OR participant_b = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(total).unwrap_or_default())
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        sender_name: &str,
        text: &str,
    ) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let row = MessageRow {
                id: Uuid::new_v4().to_string(),
                conversation_id: conversation_id.to_string(),
                sender_id: sender_id.to_string(),
                sender_name: sender_name.to_string(),
                text: text.to_string(),
                created_at: self.server_timestamp_millis(),
                is_read: false,
            };

            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, sender_name, text, created_at, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                params![
                    row.id,
                    row.conversation_id,
                    row.sender_id,
                    row.sender_name,
                    row.text,
                    row.created_at,
                ],
            )?;

            Ok(row)
        })
    }

    /// Every message of a conversation, oldest first.
    pub fn list_messages(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([conversation_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Notifications --

    pub fn insert_notification(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        payload: &NotificationPayload,
    ) -> Result<NotificationRow> {
        let payload_json = serde_json::to_string(payload)?;

        self.with_conn(|conn| {
            let row = NotificationRow {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                title: title.to_string(),
                body: body.to_string(),
                payload: payload.clone(),
                is_read: false,
                created_at: self.server_timestamp_millis(),
            };

            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, title, body, payload, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                params![
                    row.id,
                    row.user_id,
                    payload.kind().as_str(),
                    row.title,
                    row.body,
                    payload_json,
                    row.created_at,
                ],
            )?;

            Ok(row)
        })
    }

    pub fn get_notification(&self, id: &str) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
            conn.query_row(&sql, [id], notification_from_row).optional()
        })
    }

    /// A user's notifications, newest first.
    pub fn list_notifications_for_user(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns the owning user id, or `None` if no such notification exists.
    pub fn mark_notification_read(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 RETURNING user_id",
                [id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Returns how many records flipped from unread to read.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id],
            )?;
            Ok(updated)
        })
    }

    /// Returns the owning user id, or `None` if no such notification exists.
    pub fn delete_notification(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "DELETE FROM notifications WHERE id = ?1 RETURNING user_id",
                [id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn count_unread_notifications(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
    }
}

fn query_conversation_by_scope(conn: &Connection, scope_key: &str) -> Result<Option<ConversationRow>> {
    let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE scope_key = ?1");
    conn.query_row(&sql, [scope_key], conversation_from_row).optional()
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        scope_key: row.get(1)?,
        participant_a: row.get(2)?,
        participant_a_name: row.get(3)?,
        participant_b: row.get(4)?,
        participant_b_name: row.get(5)?,
        job_id: row.get(6)?,
        job_title: row.get(7)?,
        facility_name: row.get(8)?,
        last_message: row.get(9)?,
        last_message_at: row.get(10)?,
        created_at: row.get(11)?,
        unread_count: row.get(12)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_name: row.get(3)?,
        text: row.get(4)?,
        created_at: row.get(5)?,
        is_read: row.get(6)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    let payload: String = row.get(4)?;
    let payload = serde_json::from_str(&payload)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        payload,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!(e)),
        }
    }
}
