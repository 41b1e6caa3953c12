use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use nutrisaur_types::events::CommunityEvent;

const CHANNEL_CAPACITY: usize = 1024;

/// Fans community events out to every open dashboard stream.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// All streams receive all events; barangay scoping happens per stream
    broadcast_tx: broadcast::Sender<CommunityEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to community events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<CommunityEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all open streams. Returns how many received it.
    pub fn broadcast(&self, event: CommunityEvent) -> usize {
        let kind = event.kind();
        // Sending with no subscribers is not an error for us
        let delivered = self.inner.broadcast_tx.send(event).unwrap_or(0);
        trace!("Broadcast {} to {} streams", kind, delivered);
        delivered
    }

    pub fn stream_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
