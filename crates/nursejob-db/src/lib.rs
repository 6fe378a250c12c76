pub mod migrations;
pub mod models;
pub mod queries;
pub mod scope;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::info;

pub use scope::scope_key;

pub struct Database {
    conn: Mutex<Connection>,
    /// Highest timestamp handed out so far, in Unix milliseconds.
    last_timestamp: AtomicI64,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Self::from_conn(conn)
    }

    /// A private, empty database that disappears with the handle.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Self::from_conn(conn)
    }

    /// The clock starts from the newest stored timestamp so values keep
    /// increasing across restarts even if the wall clock stepped back.
    fn from_conn(conn: Connection) -> Result<Self> {
        let newest = latest_stored_timestamp(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            last_timestamp: AtomicI64::new(newest),
        })
    }

    /// Run `f` against the connection. Reads and writes share this one lock,
    /// which also serializes multi-statement transactions.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Server-assigned timestamp for creation and ordering fields.
    /// Never lower than any value previously returned by this handle.
    pub fn server_timestamp(&self) -> DateTime<Utc> {
        models::millis_to_utc(self.server_timestamp_millis())
    }

    pub(crate) fn server_timestamp_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self.last_timestamp.fetch_max(now, Ordering::SeqCst);
        prev.max(now)
    }
}

fn latest_stored_timestamp(conn: &Connection) -> Result<i64> {
    let newest: Option<i64> = conn.query_row(
        "SELECT MAX(ts) FROM (
            SELECT MAX(last_message_at) AS ts FROM conversations
            UNION ALL SELECT MAX(created_at) FROM conversations
            UNION ALL SELECT MAX(created_at) FROM messages
            UNION ALL SELECT MAX(created_at) FROM notifications
        )",
        [],
        |r| r.get(0),
    )?;
    Ok(newest.unwrap_or(0))
}
