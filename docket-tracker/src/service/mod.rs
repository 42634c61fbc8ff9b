//! Service layer
//!
//! Trackers own the client-side view of remote state. Each one exclusively
//! owns its map, folds every remote response into it, and exposes the
//! commands that may change it.

mod batches;
mod config_cache;
mod executions;
mod store;

pub use batches::BatchTracker;
pub use config_cache::{CacheState, ConfigCache, LoadStatus};
pub use executions::ExecutionTracker;
