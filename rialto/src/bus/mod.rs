//! One-way notification channel for alert mutations. Delivery is fire-and-forget
//! with at-most-once semantics: lagging receivers drop events, so consumers should
//! re-fetch on notify rather than trust the payload as the full state.
use tokio::sync::broadcast;

use crate::alert::Alert;

#[derive(Clone, Debug)]
pub enum AlertEvent {
    Created(Alert),
    Deleted { id: String },
}

#[derive(Clone, Debug)]
pub struct AlertBus {
    tx: broadcast::Sender<AlertEvent>,
}

impl AlertBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes after the mutation has been applied. A send error only means no
    /// listener is currently subscribed, which is not a failure.
    pub fn publish(&self, event: AlertEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("alert event dropped, no live subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.tx.subscribe()
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new(64)
    }
}
