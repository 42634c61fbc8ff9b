//! Core domain types
//!
//! These types represent the client's view of remote state. They are shared
//! between the HTTP client (which decodes them) and the trackers (which fold
//! them into their maps).

pub mod batch;
pub mod execution;
pub mod pipeline;

pub use batch::{Batch, BatchDocument, BatchProgress, TrackedBatch};
pub use execution::{Execution, ExecutionStatus, Fold};
pub use pipeline::{PipelineConfig, PipelineStep};

/// Anything whose lifecycle ends in a terminal state.
pub trait Terminal {
    fn is_terminal(&self) -> bool;
}
