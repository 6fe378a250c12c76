use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use nursejob_db::Database;
use nursejob_types::events::ChangeEvent;
use nursejob_types::models::{Conversation, Message};

use crate::{ChatService, Result, run_blocking};

/// Handle to a live query. The caller owns it and must call
/// [`Subscription::unsubscribe`] to release the listener; dropping the handle
/// leaves the listener running for as long as the change bus lives.
///
/// Snapshots are delivered on the listener task. A refresh that already
/// passed its active check when `unsubscribe` is called still reaches the
/// callback, so one snapshot may arrive after `unsubscribe` returns. No
/// refresh starts after that. Callbacks may call `unsubscribe` themselves.
pub struct Subscription {
    id: Uuid,
    active: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop delivering snapshots. Safe to call any number of times, including
    /// from inside the callback. Does not wait for an in-flight delivery.
    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::Release);

        let handle = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(handle) = handle {
            handle.abort();
            debug!("Subscription {} released", self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl ChatService {
    /// Live view of a conversation's messages, oldest first. `callback`
    /// receives the full list immediately and again after every new message.
    pub async fn subscribe_to_messages<F>(&self, conversation_id: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(Vec<Message>) + Send + Sync + 'static,
    {
        let cid = conversation_id.to_string();
        let watched = cid.clone();

        self.listen(
            format!("messages of {}", conversation_id),
            move |event| event.touches_messages_of(&watched),
            move |db| Ok(db.list_messages(&cid)?.into_iter().map(Message::from).collect()),
            callback,
        )
        .await
    }

    /// Live view of the user's conversations, most recently active first.
    /// `callback` receives the full list immediately and again whenever one of
    /// those conversations is created or its summary changes.
    pub async fn subscribe_to_conversations<F>(&self, user_id: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(Vec<Conversation>) + Send + Sync + 'static,
    {
        let uid = user_id.to_string();
        let watched = uid.clone();

        self.listen(
            format!("conversations of {}", user_id),
            move |event| event.touches_conversations_of(&watched),
            move |db| {
                Ok(db
                    .list_conversations_for_user(&uid)?
                    .into_iter()
                    .map(Conversation::from)
                    .collect())
            },
            callback,
        )
        .await
    }

    /// Attach a bus listener, deliver the initial snapshot, then re-run
    /// `query` and deliver its result on every change accepted by `matches`.
    ///
    /// The listener is attached before the initial read, so a change landing
    /// in between still triggers a refresh. A failing initial read is returned
    /// to the caller; later failures are logged and the listener keeps going.
    pub(crate) async fn listen<T, M, Q, F>(
        &self,
        label: String,
        matches: M,
        query: Q,
        callback: F,
    ) -> Result<Subscription>
    where
        T: Send + 'static,
        M: Fn(&ChangeEvent) -> bool + Send + 'static,
        Q: Fn(&Database) -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        let mut rx = self.bus.subscribe();
        let query = Arc::new(query);

        let initial = {
            let query = query.clone();
            self.blocking(move |db| query(db)).await?
        };
        callback(initial);

        let id = Uuid::new_v4();
        let active = Arc::new(AtomicBool::new(true));
        let db = self.db.clone();
        let still_active = active.clone();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if matches(&event) => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Subscription {} ({}) lagged by {} changes, resyncing", id, label, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }

                let query = query.clone();
                match run_blocking(db.clone(), move |db| query(db)).await {
                    Ok(snapshot) => {
                        if !still_active.load(Ordering::Acquire) {
                            break;
                        }
                        callback(snapshot);
                    }
                    Err(e) => warn!("Subscription {} ({}) refresh failed: {}", id, label, e),
                }
            }

            still_active.store(false, Ordering::Release);
            debug!("Subscription {} ({}) listener stopped", id, label);
        });

        debug!("Subscription {} attached", id);

        Ok(Subscription {
            id,
            active,
            task: Mutex::new(Some(task)),
        })
    }
}
