//! Conversation, message and notification services for the nurse job
//! marketplace, with realtime snapshot subscriptions.

pub mod bus;
pub mod channel;
pub mod directory;
pub mod error;
pub mod notifications;
pub mod subscription;

use std::sync::Arc;

use nursejob_db::Database;

pub use bus::ChangeBus;
pub use directory::NewConversation;
pub use error::{ChatError, Result};
pub use notifications::NewNotification;
pub use subscription::Subscription;

/// Entry point for every messaging operation. Cheap to clone; all clones
/// share the same store and change bus.
#[derive(Clone)]
pub struct ChatService {
    db: Arc<Database>,
    bus: ChangeBus,
}

impl ChatService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            bus: ChangeBus::new(),
        }
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// Run a store call off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(self.db.clone(), f).await
    }
}

pub(crate) async fn run_blocking<F, T>(db: Arc<Database>, f: F) -> Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let value = tokio::task::spawn_blocking(move || f(&db)).await??;
    Ok(value)
}
