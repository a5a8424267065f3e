//! In-memory change feed for tests/dev.

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::feed::{ChangeFeed, FeedSubscription};

#[derive(Debug, thiserror::Error)]
pub enum InMemoryFeedError {
    /// Publish failed due to internal lock poisoning.
    #[error("change feed lock poisoned")]
    Poisoned,
}

/// In-memory fan-out feed.
///
/// - Unbounded per-subscriber queues (publishing never blocks)
/// - Dead subscribers are pruned on publish
#[derive(Debug)]
pub struct InMemoryChangeFeed<M> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<M>>>,
}

impl<M> InMemoryChangeFeed<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subs| subs.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl<M> Default for InMemoryChangeFeed<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> ChangeFeed<M> for InMemoryChangeFeed<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryFeedError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryFeedError::Poisoned)?;

        subs.retain(|tx| tx.send(message.clone()).is_ok());
        tracing::trace!(subscribers = subs.len(), "change published");

        Ok(())
    }

    fn subscribe(&self) -> FeedSubscription<M> {
        let (tx, rx) = mpsc::unbounded_channel();

        // A poisoned lock still yields a subscription; it just never receives.
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => tracing::error!("change feed lock poisoned; subscription will stay idle"),
        }

        FeedSubscription::new(rx)
    }
}
