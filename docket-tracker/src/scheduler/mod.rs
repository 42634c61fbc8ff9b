//! Polling scheduler
//!
//! Subscriptions poll a tracker until the tracked id reaches a terminal
//! state, then report the outcome exactly once.

mod monitor;
mod registry;

pub use monitor::{PollOutcome, PollingMonitor, StatusSource, Subscription};
pub use registry::PollRegistry;
