//! Read side of the external job store.

pub mod in_memory;
pub mod store;

pub use in_memory::InMemoryJobStore;
pub use store::{ActiveJobQuery, JobStore, JobStoreError};
