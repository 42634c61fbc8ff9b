//! Repository layer
//!
//! Repositories are stateless seams over the remote pipeline service. The
//! trackers depend only on these traits; [`PipelineClient`] implements all
//! of them over HTTP.
//!
//! [`PipelineClient`]: docket_client::PipelineClient

mod batches;
mod configs;
mod executions;

pub use batches::BatchRepository;
pub use configs::ConfigRepository;
pub use executions::ExecutionRepository;
