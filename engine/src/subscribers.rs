//! Subscriber registry for broadcasting analysis results
//!
//! Each subscriber holds a bounded mpsc receiver keyed by a UUID
//! handle. Broadcast walks a snapshot of the handle set, so
//! subscribing or unsubscribing mid-broadcast never deadlocks the
//! registry. A subscriber whose channel is closed or full is dropped.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::result::AnalysisResult;

/// Default per-subscriber channel depth
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

/// An active subscription to engine broadcasts
pub struct Subscription {
    /// Handle for later unsubscription
    pub id: Uuid,
    /// Stream of analysis results
    pub receiver: mpsc::Receiver<Arc<AnalysisResult>>,
}

/// Registry of broadcast subscribers
#[derive(Default)]
pub struct SubscriberRegistry {
    channels: DashMap<Uuid, mpsc::Sender<Arc<AnalysisResult>>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber with the given channel depth
    pub fn subscribe(&self, buffer: usize) -> Subscription {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let id = Uuid::new_v4();
        self.channels.insert(id, tx);
        info!("subscriber {} connected, total: {}", id, self.channels.len());
        Subscription { id, receiver: rx }
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unsubscribe(&self, id: &Uuid) -> bool {
        let removed = self.channels.remove(id).is_some();
        if removed {
            info!("subscriber {} disconnected, total: {}", id, self.channels.len());
        }
        removed
    }

    /// Number of active subscribers
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether any subscribers are registered
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Send a result to every subscriber, returning the delivery count.
    ///
    /// Subscribers that fail to accept the message are removed.
    pub fn broadcast(&self, result: Arc<AnalysisResult>) -> usize {
        if self.channels.is_empty() {
            return 0;
        }

        let handles: Vec<(Uuid, mpsc::Sender<Arc<AnalysisResult>>)> = self
            .channels
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (id, tx) in handles {
            match tx.try_send(Arc::clone(&result)) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    debug!("dropping unresponsive subscriber {}", id);
                    self.channels.remove(&id);
                }
            }
        }
        delivered
    }
}
