use tokio::sync::broadcast;
use tracing::trace;

use nursejob_types::events::ChangeEvent;

const BUS_CAPACITY: usize = 1024;

/// In-process fan-out of store changes to realtime listeners.
#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publish a change. Having no listeners is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        trace!("Publishing {:?}", event);
        let _ = self.tx.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
