use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (conversations, messages, notifications)");
        conn.execute_batch(
            "
            BEGIN;

            -- scope_key is derived from the unordered participant pair and the
            -- job scope; UNIQUE keeps one conversation per (pair, scope).
            CREATE TABLE conversations (
                id                  TEXT PRIMARY KEY,
                scope_key           TEXT NOT NULL UNIQUE,
                participant_a       TEXT NOT NULL,
                participant_a_name  TEXT NOT NULL,
                participant_b       TEXT NOT NULL,
                participant_b_name  TEXT NOT NULL,
                job_id              TEXT,
                job_title           TEXT,
                facility_name       TEXT,
                last_message        TEXT NOT NULL DEFAULT '',
                last_message_at     INTEGER NOT NULL,
                created_at          INTEGER NOT NULL,
                unread_count        INTEGER NOT NULL DEFAULT 0 CHECK (unread_count >= 0)
            );

            CREATE INDEX idx_conversations_participant_a
                ON conversations(participant_a, last_message_at);
            CREATE INDEX idx_conversations_participant_b
                ON conversations(participant_b, last_message_at);

            -- No foreign key: a message outlives a missing parent conversation.
            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                sender_id       TEXT NOT NULL,
                sender_name     TEXT NOT NULL,
                text            TEXT NOT NULL,
                created_at      INTEGER NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, created_at);

            CREATE TABLE notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                kind        TEXT NOT NULL,
                title       TEXT NOT NULL,
                body        TEXT NOT NULL,
                payload     TEXT NOT NULL,
                is_read     INTEGER NOT NULL DEFAULT 0,
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_notifications_user
                ON notifications(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
