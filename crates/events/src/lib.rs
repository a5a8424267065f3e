//! Job-table change feed: the push side of the job store.
//!
//! The feed only says *that* a row changed (with before/after images); consumers
//! decide what to re-query.

pub mod change;
pub mod feed;
pub mod in_memory_feed;

pub use change::{ChangeKind, JobChange};
pub use feed::{ChangeFeed, FeedSubscription};
pub use in_memory_feed::{InMemoryChangeFeed, InMemoryFeedError};
