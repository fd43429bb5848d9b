//! Durable retry queue for documents that failed past relocation.
//!
//! The queue is the single source of truth for "documents not yet
//! successfully recorded". It is persisted as a human-inspectable JSON
//! array and rewritten wholesale on every mutation.

mod store;
mod types;

pub use store::RetryQueue;
pub use types::PendingRetry;
pub(crate) use types::format_created_time;
