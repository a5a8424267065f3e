//! Change-feed subscription abstraction (mechanics only).
//!
//! A change feed is a push-based stream of row-level events from the job store.
//! Consumers use it to decide *when* to refresh their view; the store stays the
//! source of truth for *what* the current state is.
//!
//! ## Delivery guarantees
//!
//! - **At-least-once**: an event may be delivered more than once.
//! - **Per-publisher ordering** only.
//! - **No persistence**: events published while nobody is subscribed are gone.
//!
//! Consumers must therefore be idempotent and must never try to rebuild set
//! membership from the deltas alone.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

/// A live subscription to a change feed.
///
/// Dropping the subscription unsubscribes: the publisher notices the closed
/// channel on its next publish and forgets the subscriber.
#[derive(Debug)]
pub struct FeedSubscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> FeedSubscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. `None` means the feed was closed.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Stop accepting new events; already queued events can still be drained.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

/// Source of job-table change events.
///
/// The trait requires `Send + Sync` so one feed can be shared by the store
/// (publisher side) and any number of monitors (subscriber side).
pub trait ChangeFeed<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> FeedSubscription<M>;
}

impl<M, F> ChangeFeed<M> for Arc<F>
where
    F: ChangeFeed<M> + ?Sized,
{
    type Error = F::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> FeedSubscription<M> {
        (**self).subscribe()
    }
}
