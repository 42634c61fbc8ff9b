//! Docket Tracker
//!
//! Client-side bookkeeping for remote pipeline work: the pipeline config
//! cache, execution and batch trackers, and the polling monitor that keeps
//! them current until each job is terminal.
//!
//! # Example
//!
//! ```no_run
//! use docket_client::{PipelineClient, SessionHandle};
//! use docket_tracker::{ExecutionTracker, PollingMonitor, TracingNotifier, TrackerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TrackerConfig::from_env()?;
//!     let session = Arc::new(SessionHandle::authenticated("token"));
//!     let client = Arc::new(PipelineClient::new(&config.api_url, session));
//!
//!     let tracker = Arc::new(ExecutionTracker::new(client, Arc::new(TracingNotifier), &config));
//!     let execution = tracker.process_pipeline("doc-1", "pipe-A", true, None).await?;
//!
//!     let monitor = PollingMonitor::new(Arc::clone(&tracker), &config);
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     let _sub = monitor.subscribe(&execution.id, config.poll_interval, move |outcome| {
//!         let _ = tx.send(outcome);
//!     });
//!     println!("{:?}", rx.await?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod notify;
pub mod repository;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod fakes;

pub use config::TrackerConfig;
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier, report_error};
pub use scheduler::{PollOutcome, PollRegistry, PollingMonitor, StatusSource, Subscription};
pub use service::{BatchTracker, CacheState, ConfigCache, ExecutionTracker, LoadStatus};
