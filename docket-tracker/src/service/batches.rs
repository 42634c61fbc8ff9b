//! Batch tracker
//!
//! Mirrors the execution tracker at batch granularity. Every fold rebuilds
//! the success/failed/in-progress partitions from the reported snapshot.

use async_trait::async_trait;
use docket_client::{ClientError, Result};
use docket_core::domain::{Batch, BatchProgress, TrackedBatch};
use docket_core::dto::batch::SubmitBatch;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::store::{ErrorSlot, Folded, ProcessingFlag, SnapshotStore};
use crate::config::TrackerConfig;
use crate::notify::{Notice, Notifier, report_error};
use crate::repository::BatchRepository;
use crate::scheduler::{PollRegistry, StatusSource};

pub struct BatchTracker {
    repository: Arc<dyn BatchRepository>,
    notifier: Arc<dyn Notifier>,
    batches: SnapshotStore<TrackedBatch>,
    polls: PollRegistry,
    processing: ProcessingFlag,
    last_error: ErrorSlot,
    redirect_delay: Duration,
}

impl BatchTracker {
    pub fn new(
        repository: Arc<dyn BatchRepository>,
        notifier: Arc<dyn Notifier>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            repository,
            notifier,
            batches: SnapshotStore::new(),
            polls: PollRegistry::default(),
            processing: ProcessingFlag::default(),
            last_error: ErrorSlot::default(),
            redirect_delay: config.login_redirect_delay,
        }
    }

    /// Submit `document_ids` to `pipeline_id` as one batch
    ///
    /// An empty selection is rejected before any request is made.
    pub async fn process_batch(
        &self,
        pipeline_id: &str,
        document_ids: &[String],
    ) -> Result<Arc<TrackedBatch>> {
        let _processing = self.processing.begin();
        self.last_error.clear();

        let result = self.try_process(pipeline_id, document_ids).await;
        let stored = self.settle(result)?;

        self.notifier.notify(Notice::success(format!(
            "Batch of {} documents submitted",
            stored.batch.total_documents
        )));
        Ok(stored)
    }

    /// Fetch the remote status of `batch_id` and fold it into the map
    pub async fn get_batch_status(&self, batch_id: &str) -> Result<Arc<TrackedBatch>> {
        let _processing = self.processing.begin();
        self.last_error.clear();

        let result = self.poll(batch_id).await;
        self.settle(result)
    }

    /// Cancel `batch_id` and clear polling for it
    pub async fn cancel_batch(&self, batch_id: &str) -> Result<Arc<TrackedBatch>> {
        let _processing = self.processing.begin();
        self.last_error.clear();

        let result = self.repository.cancel(batch_id).await;
        let stored = self.settle(result.map(|batch| self.fold(batch)))?;

        let cleared = self.polls.clear(batch_id);
        info!(batch_id, status = %stored.batch.status, cleared, "Batch cancel requested");
        self.notifier.notify(Notice::info("Batch canceled"));
        Ok(stored)
    }

    pub fn get(&self, batch_id: &str) -> Option<Arc<TrackedBatch>> {
        self.batches.get(batch_id)
    }

    /// Derived document partitions of the stored batch
    pub fn progress(&self, batch_id: &str) -> Option<BatchProgress> {
        self.get(batch_id).map(|tracked| tracked.progress.clone())
    }

    pub fn batches(&self) -> Vec<Arc<TrackedBatch>> {
        self.batches.all()
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
        pipeline_id: &str,
        document_ids: &[String],
    ) -> Result<Arc<TrackedBatch>> {
        if pipeline_id.trim().is_empty() {
            return Err(ClientError::validation("select a pipeline first"));
        }
        if document_ids.is_empty() {
            return Err(ClientError::validation("select at least one document"));
        }
        if document_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ClientError::validation("document ids cannot be blank"));
        }

        let req = SubmitBatch {
            document_ids: document_ids.to_vec(),
            pipeline_id: pipeline_id.to_string(),
        };
        let batch = self.repository.submit(&req).await?;

        info!(
            batch_id = %batch.id,
            pipeline_id,
            documents = document_ids.len(),
            "Submitted batch for processing"
        );
        let id = batch.id.clone();
        Ok(self.batches.replace(&id, TrackedBatch::new(batch)))
    }

    async fn poll(&self, batch_id: &str) -> Result<Arc<TrackedBatch>> {
        match self.repository.fetch(batch_id).await {
            Ok(batch) => Ok(self.fold(batch)),
            Err(err) => {
                self.last_error.set(&err);
                Err(err)
            }
        }
    }

    fn fold(&self, incoming: Batch) -> Arc<TrackedBatch> {
        let id = incoming.id.clone();
        let reported = incoming.status;

        match self.batches.fold(&id, incoming, TrackedBatch::new, |current, incoming| {
            TrackedBatch::fold(Some(current), incoming)
        }) {
            Folded::Stored(stored) => {
                debug!(
                    batch_id = %id,
                    status = %stored.batch.status,
                    success = stored.progress.success.len(),
                    failed = stored.progress.failed.len(),
                    in_progress = stored.progress.in_progress.len(),
                    "Folded batch status"
                );
                stored
            }
            Folded::Discarded(kept) => {
                warn!(
                    batch_id = %id,
                    stored = %kept.batch.status,
                    reported = %reported,
                    "Discarding stale status for terminal batch"
                );
                kept
            }
        }
    }

    fn settle<T>(&self, result: Result<T>) -> Result<T> {
        result.inspect_err(|err| {
            self.last_error.set(err);
            report_error(&self.notifier, err, self.redirect_delay);
        })
    }
}

#[async_trait]
impl StatusSource for BatchTracker {
    type Snapshot = TrackedBatch;

    async fn refresh(&self, id: &str) -> Result<Arc<TrackedBatch>> {
        self.poll(id).await
    }

    fn cached(&self, id: &str) -> Option<Arc<TrackedBatch>> {
        self.get(id)
    }

    fn polls(&self) -> &PollRegistry {
        &self.polls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeBatches, RecordingNotifier, batch};
    use docket_core::domain::ExecutionStatus::*;

    fn tracker(fake: &Arc<FakeBatches>) -> BatchTracker {
        BatchTracker::new(
            fake.clone(),
            Arc::new(RecordingNotifier::default()),
            &TrackerConfig::default(),
        )
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected_locally() {
        let fake = Arc::new(FakeBatches::default());
        let tracker = tracker(&fake);

        let err = tracker.process_batch("pipe-A", &[]).await.unwrap_err();

        assert_eq!(err, ClientError::validation("select at least one document"));
        assert_eq!(fake.submit.calls(), 0);
        assert_eq!(tracker.last_error(), Some(err));
    }

    #[tokio::test]
    async fn test_missing_pipeline_is_rejected_locally() {
        let fake = Arc::new(FakeBatches::default());
        let tracker = tracker(&fake);

        let err = tracker.process_batch("", &ids(&["a"])).await.unwrap_err();

        assert_eq!(err, ClientError::validation("select a pipeline first"));
        assert_eq!(fake.submit.calls(), 0);
    }

    #[tokio::test]
    async fn test_process_batch_tracks_partitions() {
        let fake = Arc::new(FakeBatches::default());
        fake.submit
            .ok(batch("batch-1", Pending, &[("a", Pending), ("b", Pending)]));
        fake.fetch
            .ok(batch("batch-1", Processing, &[("a", Completed), ("b", Running)]));
        let tracker = tracker(&fake);

        let submitted = tracker.process_batch("pipe-A", &ids(&["a", "b"])).await.unwrap();
        assert_eq!(submitted.progress.in_progress, vec!["a", "b"]);

        tracker.get_batch_status("batch-1").await.unwrap();
        let progress = tracker.progress("batch-1").unwrap();
        assert_eq!(progress.success, vec!["a"]);
        assert_eq!(progress.in_progress, vec!["b"]);
        assert!(progress.counted() <= 2);
    }

    #[tokio::test]
    async fn test_partitions_stay_within_total_after_every_fold() {
        let fake = Arc::new(FakeBatches::default());
        let mut oversized = batch("batch-1", Processing, &[("a", Completed), ("b", Failed), ("c", Running)]);
        oversized.total_documents = 2;
        fake.fetch.ok(oversized);
        fake.fetch
            .ok(batch("batch-1", Processing, &[("a", Completed), ("b", Failed)]));
        let tracker = tracker(&fake);

        for _ in 0..2 {
            let stored = tracker.get_batch_status("batch-1").await.unwrap();
            assert!(stored.progress.counted() <= stored.batch.total_documents);
        }
    }

    #[tokio::test]
    async fn test_terminal_batch_is_not_revived() {
        let fake = Arc::new(FakeBatches::default());
        fake.fetch
            .ok(batch("batch-1", Completed, &[("a", Completed)]));
        fake.fetch.ok(batch("batch-1", Processing, &[("a", Running)]));
        let tracker = tracker(&fake);

        tracker.get_batch_status("batch-1").await.unwrap();
        let stored = tracker.get_batch_status("batch-1").await.unwrap();

        assert_eq!(stored.batch.status, Completed);
        assert_eq!(stored.progress.success, vec!["a"]);
    }

    #[tokio::test]
    async fn test_cancel_batch_folds_response() {
        let fake = Arc::new(FakeBatches::default());
        fake.cancel
            .ok(batch("batch-1", Canceled, &[("a", Completed), ("b", Canceled)]));
        let tracker = tracker(&fake);

        let stored = tracker.cancel_batch("batch-1").await.unwrap();

        assert_eq!(stored.batch.status, Canceled);
        assert_eq!(stored.progress.failed, vec!["b"]);
        assert!(!tracker.is_processing());
    }
}
