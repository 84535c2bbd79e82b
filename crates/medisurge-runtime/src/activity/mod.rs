//! Append-only activity log.
//!
//! [`ActivityLog`] is the facade the loop and fan-out write through;
//! [`ActivityStore`] backends persist entries.

mod log;
mod query;
mod store;

pub use log::ActivityLog;
pub use query::ActivityQuery;
pub use store::{open_store, ActivityStore, FileActivityStore, MemoryActivityStore};
