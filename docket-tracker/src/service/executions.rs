//! Execution tracker
//!
//! Owns the map of execution id to the latest accepted snapshot. Polls and
//! cancel responses are folded under the terminality rule, so a stale
//! response can never revive a finished job. A retry supersedes whatever is
//! stored, because it is an explicit request to run the job again.

use async_trait::async_trait;
use docket_client::{ClientError, Result};
use docket_core::domain::Execution;
use docket_core::dto::execution::SubmitExecution;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::store::{ErrorSlot, Folded, ProcessingFlag, SnapshotStore};
use crate::config::TrackerConfig;
use crate::notify::{Notice, Notifier, report_error};
use crate::repository::ExecutionRepository;
use crate::scheduler::{PollRegistry, StatusSource};

pub struct ExecutionTracker {
    repository: Arc<dyn ExecutionRepository>,
    notifier: Arc<dyn Notifier>,
    executions: SnapshotStore<Execution>,
    polls: PollRegistry,
    processing: ProcessingFlag,
    last_error: ErrorSlot,
    redirect_delay: Duration,
}

impl ExecutionTracker {
    pub fn new(
        repository: Arc<dyn ExecutionRepository>,
        notifier: Arc<dyn Notifier>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            repository,
            notifier,
            executions: SnapshotStore::new(),
            polls: PollRegistry::default(),
            processing: ProcessingFlag::default(),
            last_error: ErrorSlot::default(),
            redirect_delay: config.login_redirect_delay,
        }
    }

    /// Submit `document_id` to `pipeline_id` and start tracking the result
    ///
    /// Missing input is rejected before any request is made.
    pub async fn process_pipeline(
        &self,
        document_id: &str,
        pipeline_id: &str,
        run_async: bool,
        parameters: Option<HashMap<String, JsonValue>>,
    ) -> Result<Arc<Execution>> {
        let _processing = self.processing.begin();
        self.last_error.clear();

        let result = self
            .try_process(document_id, pipeline_id, run_async, parameters)
            .await;

        let stored = self.settle(result)?;
        self.notifier
            .notify(Notice::success("Document submitted for processing"));
        Ok(stored)
    }

    /// Fetch the remote status of `execution_id` and fold it into the map
    ///
    /// Returns the stored snapshot, which is the previous terminal state when
    /// the response was stale.
    pub async fn get_execution_status(&self, execution_id: &str) -> Result<Arc<Execution>> {
        let _processing = self.processing.begin();
        self.last_error.clear();

        let result = self.poll(execution_id).await;
        self.settle(result)
    }

    /// Cancel `execution_id` and clear polling for it
    pub async fn cancel_execution(&self, execution_id: &str) -> Result<Arc<Execution>> {
        let _processing = self.processing.begin();
        self.last_error.clear();

        let result = self.repository.cancel(execution_id).await;
        let stored = self.settle(result.map(|execution| self.fold(execution)))?;

        let cleared = self.polls.clear(execution_id);
        info!(execution_id, status = %stored.status, cleared, "Execution cancel requested");
        self.notifier.notify(Notice::info("Execution canceled"));
        Ok(stored)
    }

    /// Retry `execution_id`; the response replaces the stored snapshot
    pub async fn retry_execution(&self, execution_id: &str) -> Result<Arc<Execution>> {
        let _processing = self.processing.begin();
        self.last_error.clear();

        let result = self.repository.retry(execution_id).await;
        let stored = self.settle(result.map(|execution| self.supersede(execution)))?;

        let cleared = self.polls.clear(execution_id);
        info!(execution_id, status = %stored.status, cleared, "Execution retry requested");
        self.notifier.notify(Notice::info("Execution restarted"));
        Ok(stored)
    }

    /// Stored snapshot for `execution_id`, without network access
    pub fn get(&self, execution_id: &str) -> Option<Arc<Execution>> {
        self.executions.get(execution_id)
    }

    pub fn executions(&self) -> Vec<Arc<Execution>> {
        self.executions.all()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.get()
    }

    pub fn last_error(&self) -> Option<ClientError> {
        self.last_error.get()
    }

    pub fn polls(&self) -> &PollRegistry {
        &self.polls
    }

    async fn try_process(
        &self,
        document_id: &str,
        pipeline_id: &str,
        run_async: bool,
        parameters: Option<HashMap<String, JsonValue>>,
    ) -> Result<Arc<Execution>> {
        if pipeline_id.trim().is_empty() {
            return Err(ClientError::validation("select a pipeline first"));
        }
        if document_id.trim().is_empty() {
            return Err(ClientError::validation("select a document first"));
        }

        let req = SubmitExecution {
            document_id: document_id.to_string(),
            pipeline_id: pipeline_id.to_string(),
            run_async,
            parameters,
        };
        let execution = self.repository.submit(&req).await?;

        info!(
            execution_id = %execution.id,
            document_id,
            pipeline_id,
            "Submitted document for processing"
        );
        Ok(self.supersede(execution))
    }

    /// Fetch and fold, recording but not announcing failures
    async fn poll(&self, execution_id: &str) -> Result<Arc<Execution>> {
        match self.repository.fetch(execution_id).await {
            Ok(execution) => Ok(self.fold(execution)),
            Err(err) => {
                self.last_error.set(&err);
                Err(err)
            }
        }
    }

    fn supersede(&self, execution: Execution) -> Arc<Execution> {
        let id = execution.id.clone();
        self.executions.replace(&id, execution)
    }

    fn fold(&self, incoming: Execution) -> Arc<Execution> {
        let id = incoming.id.clone();
        let reported = incoming.status;

        match self.executions.fold(&id, incoming, |e| e, |current, incoming| {
            Execution::fold(Some(current), incoming)
        }) {
            Folded::Stored(stored) => {
                debug!(execution_id = %id, status = %stored.status, progress = stored.progress, "Folded execution status");
                stored
            }
            Folded::Discarded(kept) => {
                warn!(
                    execution_id = %id,
                    stored = %kept.status,
                    reported = %reported,
                    "Discarding stale status for terminal execution"
                );
                kept
            }
        }
    }

    /// Record and announce a failed call; the error is still returned
    fn settle<T>(&self, result: Result<T>) -> Result<T> {
        result.inspect_err(|err| {
            self.last_error.set(err);
            report_error(&self.notifier, err, self.redirect_delay);
        })
    }
}

#[async_trait]
impl StatusSource for ExecutionTracker {
    type Snapshot = Execution;

    async fn refresh(&self, id: &str) -> Result<Arc<Execution>> {
        self.poll(id).await
    }

    fn cached(&self, id: &str) -> Option<Arc<Execution>> {
        self.get(id)
    }

    fn polls(&self) -> &PollRegistry {
        &self.polls
    }
}
